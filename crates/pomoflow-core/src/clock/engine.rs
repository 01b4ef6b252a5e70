//! Drift-free countdown core.
//!
//! The engine never decrements a counter. `start` anchors a wall-clock
//! deadline and every later query derives the remaining seconds from that
//! anchor, so any number of missed interval firings is corrected by the next
//! one. Time spent with the host asleep counts against the countdown.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running -> (Paused | Idle)
//! ```
//!
//! Time is injected by the caller, which keeps this type free of any
//! scheduling concerns. [`super::spawn_clock`] drives it from a tokio task.

use chrono::{DateTime, TimeDelta, Utc};

use crate::events::{ClockCommand, ClockEvent};

/// Upper bound for a single countdown (one year).
const MAX_COUNTDOWN_SECS: u64 = 365 * 24 * 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClockStatus {
    #[default]
    Idle,
    Running,
    Paused,
}

#[derive(Debug, Clone, Default)]
pub struct ClockEngine {
    status: ClockStatus,
    target_at: Option<DateTime<Utc>>,
    generation: u64,
}

impl ClockEngine {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn status(&self) -> ClockStatus {
        self.status
    }

    pub fn is_running(&self) -> bool {
        self.status == ClockStatus::Running
    }

    /// Generation of the current (or last) run.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whole seconds left at `now`, rounded up. `None` unless running.
    pub fn remaining_seconds(&self, now: DateTime<Utc>) -> Option<u64> {
        if !self.is_running() {
            return None;
        }
        let target = self.target_at?;
        let millis = u64::try_from((target - now).num_milliseconds()).unwrap_or(0);
        Some(millis.div_ceil(1000))
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Apply a command. Returns the event to emit immediately, if any.
    pub fn handle(&mut self, cmd: ClockCommand, now: DateTime<Utc>) -> Option<ClockEvent> {
        match cmd {
            ClockCommand::Start {
                time_left_seconds,
                generation,
            }
            | ClockCommand::Resume {
                time_left_seconds,
                generation,
            } => {
                let secs = u64::try_from(time_left_seconds).unwrap_or(0);
                Some(self.start(secs, generation, now))
            }
            ClockCommand::Pause => {
                self.pause();
                None
            }
            ClockCommand::Stop => {
                self.stop();
                None
            }
            ClockCommand::Sync => self.sync(now),
        }
    }

    /// Anchor a new countdown. Any previous run is discarded.
    pub fn start(
        &mut self,
        time_left_seconds: u64,
        generation: u64,
        now: DateTime<Utc>,
    ) -> ClockEvent {
        let secs = time_left_seconds.min(MAX_COUNTDOWN_SECS);
        let span = TimeDelta::try_seconds(i64::try_from(secs).unwrap_or(i64::MAX))
            .unwrap_or(TimeDelta::MAX);
        self.status = ClockStatus::Running;
        self.generation = generation;
        self.target_at = Some(
            now.checked_add_signed(span)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        );
        ClockEvent::Tick {
            time_left_seconds: secs,
            generation,
        }
    }

    pub fn pause(&mut self) {
        if self.is_running() {
            self.status = ClockStatus::Paused;
        }
        self.target_at = None;
    }

    pub fn stop(&mut self) {
        self.status = ClockStatus::Idle;
        self.target_at = None;
    }

    /// On-demand recomputation, used after the host resumes from suspension.
    pub fn sync(&self, now: DateTime<Utc>) -> Option<ClockEvent> {
        self.remaining_seconds(now)
            .map(|time_left_seconds| ClockEvent::SyncResponse {
                time_left_seconds,
                generation: self.generation,
            })
    }

    /// One firing of the periodic schedule. Emits a tick, plus `Complete`
    /// (after which the engine is idle) once the countdown hits zero.
    pub fn on_interval(&mut self, now: DateTime<Utc>) -> Vec<ClockEvent> {
        let Some(time_left_seconds) = self.remaining_seconds(now) else {
            return Vec::new();
        };
        let generation = self.generation;
        let mut events = vec![ClockEvent::Tick {
            time_left_seconds,
            generation,
        }];
        if time_left_seconds == 0 {
            events.push(ClockEvent::Complete { generation });
            self.stop();
        }
        events
    }
}
