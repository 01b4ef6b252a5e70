//! Background task that drives a [`ClockEngine`].
//!
//! The task owns the engine outright. The consumer talks to it only through
//! the command channel and reads [`ClockEvent`]s from the event channel, so
//! rendering or persistence work on the consumer side can never starve the
//! schedule.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Duration, Instant, Interval, MissedTickBehavior};
use tracing::{debug, warn};

use super::engine::ClockEngine;
use super::source::{SystemClock, TimeSource};
use crate::events::{ClockCommand, ClockEvent};

/// Nominal period of the countdown schedule.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Sending half of a running clock task.
///
/// Dropping the handle closes the command channel and aborts the task.
#[derive(Debug)]
pub struct ClockHandle {
    commands: mpsc::UnboundedSender<ClockCommand>,
    task: Option<JoinHandle<()>>,
}

/// Spawn a clock task on the current tokio runtime, reading the host's wall
/// clock.
///
/// Returns the command handle and the receiver for emitted events.
pub fn spawn_clock(tick_interval: Duration) -> (ClockHandle, mpsc::UnboundedReceiver<ClockEvent>) {
    spawn_clock_with(tick_interval, SystemClock)
}

/// Like [`spawn_clock`], with the countdown anchored on `source`.
pub fn spawn_clock_with<T: TimeSource>(
    tick_interval: Duration,
    source: T,
) -> (ClockHandle, mpsc::UnboundedReceiver<ClockEvent>) {
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let period = if tick_interval.is_zero() {
        DEFAULT_TICK_INTERVAL
    } else {
        tick_interval
    };

    let task = tokio::spawn(run_clock(ClockEngine::new(), source, period, cmd_rx, event_tx));

    (
        ClockHandle {
            commands: cmd_tx,
            task: Some(task),
        },
        event_rx,
    )
}

impl ClockHandle {
    /// Queue a command. Returns `false` when the task is gone.
    pub fn send(&self, cmd: ClockCommand) -> bool {
        match self.commands.send(cmd) {
            Ok(()) => true,
            Err(e) => {
                warn!(command = ?e.0, "clock task is not running; command dropped");
                false
            }
        }
    }

    /// Queue a JSON-encoded command envelope. Malformed input is ignored.
    pub fn send_raw(&self, raw: &str) -> bool {
        ClockCommand::parse(raw).is_some_and(|cmd| self.send(cmd))
    }

    pub fn start(&self, time_left_seconds: u64, generation: u64) -> bool {
        self.send(ClockCommand::start(time_left_seconds, generation))
    }

    pub fn resume(&self, time_left_seconds: u64, generation: u64) -> bool {
        self.send(ClockCommand::resume(time_left_seconds, generation))
    }

    pub fn pause(&self) -> bool {
        self.send(ClockCommand::Pause)
    }

    pub fn stop(&self) -> bool {
        self.send(ClockCommand::Stop)
    }

    /// Ask for an immediate `SYNC_RESPONSE`, e.g. when the host returns to
    /// the foreground.
    pub fn sync(&self) -> bool {
        self.send(ClockCommand::Sync)
    }

    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }

    /// Cancel the schedule and wait for the task to finish.
    pub async fn shutdown(mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            if let Err(e) = task.await {
                if !e.is_cancelled() {
                    warn!(error = %e, "clock task ended abnormally");
                }
            }
        }
    }
}

impl Drop for ClockHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn run_clock<T: TimeSource>(
    mut engine: ClockEngine,
    source: T,
    period: Duration,
    mut commands: mpsc::UnboundedReceiver<ClockCommand>,
    events: mpsc::UnboundedSender<ClockEvent>,
) {
    let mut schedule: Option<Interval> = None;

    loop {
        tokio::select! {
            cmd = commands.recv() => {
                let Some(cmd) = cmd else {
                    debug!("clock command channel closed");
                    break;
                };
                let immediate = engine.handle(cmd, source.now());
                match cmd {
                    ClockCommand::Start { .. } | ClockCommand::Resume { .. } => {
                        schedule = Some(new_schedule(Instant::now(), period));
                    }
                    ClockCommand::Pause | ClockCommand::Stop => schedule = None,
                    ClockCommand::Sync => {}
                }
                if let Some(event) = immediate {
                    if events.send(event).is_err() {
                        debug!("clock event receiver dropped");
                        break;
                    }
                }
            }
            () = next_firing(&mut schedule) => {
                let mut closed = false;
                for event in engine.on_interval(source.now()) {
                    if events.send(event).is_err() {
                        closed = true;
                    }
                }
                if closed {
                    debug!("clock event receiver dropped");
                    break;
                }
                if !engine.is_running() {
                    schedule = None;
                }
            }
        }
    }
}

fn new_schedule(now: Instant, period: Duration) -> Interval {
    let mut interval = time::interval_at(now + period, period);
    // After a suspension fire once and move on; the engine recomputes from
    // the anchor, so replaying missed firings would only repeat ticks.
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval
}

async fn next_firing(schedule: &mut Option<Interval>) {
    match schedule {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}
