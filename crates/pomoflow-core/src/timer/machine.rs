//! Phase state machine.
//!
//! Owns [`TimerState`] and decides what happens when a phase ends. It never
//! talks to the clock directly: every operation that affects timing returns
//! the [`ClockCommand`] the host must forward, which keeps the machine
//! synchronous and free of I/O.
//!
//! ## Phase Transitions
//!
//! ```text
//! Work -> Break -> Work -> ... -> Work -> LongBreak -> Work
//! ```
//!
//! Every start/resume opens a new run generation. Clock events tagged with
//! any other generation are dropped, so a completion that was already in
//! flight when the user reset or switched modes cannot advance the phase.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::mode::{Mode, ModeConfigs, Phase};
use crate::events::{ClockCommand, ClockEvent};

/// Task name adopted when a work run starts without one.
pub const DEFAULT_TASK_LABEL: &str = "Focus Session";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerState {
    pub mode: Mode,
    pub phase: Phase,
    pub time_left_seconds: u64,
    /// Never persisted; a restored timer always starts stopped.
    #[serde(skip)]
    pub is_running: bool,
    pub completed_sessions: u32,
    #[serde(default)]
    pub current_task_name: String,
    #[serde(default)]
    pub task_input_draft: String,
}

impl TimerState {
    fn fresh(mode: Mode, configs: &ModeConfigs) -> Self {
        Self {
            mode,
            phase: Phase::Work,
            time_left_seconds: configs.get(mode).work_seconds,
            is_running: false,
            completed_sessions: 0,
            current_task_name: String::new(),
            task_input_draft: String::new(),
        }
    }
}

/// Snapshot taken when leaving a mode mid-work-phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedSession {
    pub phase: Phase,
    pub time_left_seconds: u64,
    pub completed_sessions: u32,
    pub current_task_name: String,
    pub timestamp: DateTime<Utc>,
}

/// Outcome of an accepted phase completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseCompletion {
    pub mode: Mode,
    /// Phase that just finished.
    pub phase: Phase,
    /// Configured duration of the finished phase.
    pub duration_seconds: u64,
    pub task_name: String,
    pub completed_sessions: u32,
    pub next_phase: Phase,
    pub next_time_left_seconds: u64,
}

/// Preview of the phase that follows the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NextPhase {
    pub phase: Phase,
    pub duration_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseMachine {
    state: TimerState,
    #[serde(default)]
    saved_sessions: BTreeMap<Mode, SavedSession>,
    #[serde(skip)]
    generation: u64,
    /// Set while a run is paused so the next toggle resumes instead of starting.
    #[serde(skip)]
    paused: bool,
    #[serde(skip, default = "default_task_label")]
    task_label: String,
}

fn default_task_label() -> String {
    DEFAULT_TASK_LABEL.to_string()
}

impl PhaseMachine {
    /// Fresh work phase in `mode`, not running.
    pub fn new(mode: Mode, configs: &ModeConfigs) -> Self {
        Self {
            state: TimerState::fresh(mode, configs),
            saved_sessions: BTreeMap::new(),
            generation: 0,
            paused: false,
            task_label: default_task_label(),
        }
    }

    /// Rebuild from persisted parts. The timer is always restored stopped.
    pub fn restore(mut state: TimerState, saved_sessions: BTreeMap<Mode, SavedSession>) -> Self {
        state.is_running = false;
        Self {
            state,
            saved_sessions,
            generation: 0,
            paused: false,
            task_label: default_task_label(),
        }
    }

    /// Label adopted when a work run starts with an empty draft.
    pub fn with_task_label(mut self, label: impl Into<String>) -> Self {
        let label = label.into();
        if !label.trim().is_empty() {
            self.task_label = label;
        }
        self
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> &TimerState {
        &self.state
    }

    pub fn mode(&self) -> Mode {
        self.state.mode
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running
    }

    pub fn time_left_seconds(&self) -> u64 {
        self.state.time_left_seconds
    }

    pub fn completed_sessions(&self) -> u32 {
        self.state.completed_sessions
    }

    /// Generation of the most recent run.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn saved_session(&self, mode: Mode) -> Option<&SavedSession> {
        self.saved_sessions.get(&mode)
    }

    pub fn saved_sessions(&self) -> &BTreeMap<Mode, SavedSession> {
        &self.saved_sessions
    }

    pub fn phase_total_seconds(&self, configs: &ModeConfigs) -> u64 {
        configs.get(self.state.mode).duration_for(self.state.phase)
    }

    /// 0.0 .. 100.0 progress within the current phase.
    pub fn progress_percent(&self, configs: &ModeConfigs) -> f64 {
        let total = self.phase_total_seconds(configs);
        if total == 0 {
            return 100.0;
        }
        let elapsed = total.saturating_sub(self.state.time_left_seconds);
        (elapsed as f64 / total as f64) * 100.0
    }

    pub fn next_phase(&self, configs: &ModeConfigs) -> NextPhase {
        let config = configs.get(self.state.mode);
        let phase = match self.state.phase {
            Phase::Work => config.break_after(self.state.completed_sessions.saturating_add(1)),
            Phase::Break | Phase::LongBreak => Phase::Work,
        };
        NextPhase {
            phase,
            duration_seconds: config.duration_for(phase),
        }
    }

    /// Time left with either finished work sessions or a named task.
    pub fn has_progress(&self) -> bool {
        self.state.time_left_seconds > 0
            && (self.state.completed_sessions > 0 || !self.state.current_task_name.is_empty())
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start, pause or resume. Returns the command for the clock.
    pub fn toggle_run(&mut self) -> ClockCommand {
        if self.state.is_running {
            self.state.is_running = false;
            self.paused = true;
            return ClockCommand::Pause;
        }

        if self.state.phase == Phase::Work && self.state.current_task_name.is_empty() {
            let draft = self.state.task_input_draft.trim();
            self.state.current_task_name = if draft.is_empty() {
                self.task_label.clone()
            } else {
                draft.to_string()
            };
        }

        self.state.is_running = true;
        self.generation += 1;
        let time_left = self.state.time_left_seconds;
        if std::mem::take(&mut self.paused) {
            ClockCommand::resume(time_left, self.generation)
        } else {
            ClockCommand::start(time_left, self.generation)
        }
    }

    /// Apply a `Tick` or `SyncResponse`. Returns whether it was accepted.
    pub fn apply_tick(&mut self, event: &ClockEvent) -> bool {
        let Some(secs) = event.time_left_seconds() else {
            return false;
        };
        if !self.state.is_running || event.generation() != self.generation {
            debug!(
                event_generation = event.generation(),
                current = self.generation,
                "dropping stale tick"
            );
            return false;
        }
        self.state.time_left_seconds = secs;
        true
    }

    /// Handle the clock's `Complete` for `generation`.
    ///
    /// Returns `None` when the completion belongs to a superseded run.
    pub fn on_complete(&mut self, generation: u64, configs: &ModeConfigs) -> Option<PhaseCompletion> {
        if generation != self.generation || generation == 0 {
            debug!(
                event_generation = generation,
                current = self.generation,
                "dropping stale completion"
            );
            return None;
        }
        // Close this generation so a duplicate completion is stale too.
        self.generation += 1;
        self.state.is_running = false;
        self.paused = false;

        let config = configs.get(self.state.mode);
        let finished = self.state.phase;
        let task_name = self.state.current_task_name.clone();

        match finished {
            Phase::Work => {
                self.state.completed_sessions = self.state.completed_sessions.saturating_add(1);
                self.state.phase = config.break_after(self.state.completed_sessions);
            }
            Phase::Break | Phase::LongBreak => {
                self.state.phase = Phase::Work;
                self.state.current_task_name.clear();
            }
        }
        self.state.time_left_seconds = config.duration_for(self.state.phase);

        Some(PhaseCompletion {
            mode: self.state.mode,
            phase: finished,
            duration_seconds: config.duration_for(finished),
            task_name,
            completed_sessions: self.state.completed_sessions,
            next_phase: self.state.phase,
            next_time_left_seconds: self.state.time_left_seconds,
        })
    }

    /// Back to a fresh work phase of the current mode.
    pub fn reset(&mut self, configs: &ModeConfigs) -> ClockCommand {
        self.invalidate_run();
        self.state = TimerState::fresh(self.state.mode, configs);
        ClockCommand::Stop
    }

    /// Leave the current mode, snapshotting it if a work phase is underway.
    pub fn switch_mode(&mut self, new_mode: Mode, configs: &ModeConfigs) -> ClockCommand {
        self.invalidate_run();

        if self.state.phase == Phase::Work && self.state.time_left_seconds > 0 {
            self.saved_sessions.insert(
                self.state.mode,
                SavedSession {
                    phase: self.state.phase,
                    time_left_seconds: self.state.time_left_seconds,
                    completed_sessions: self.state.completed_sessions,
                    current_task_name: self.state.current_task_name.clone(),
                    timestamp: Utc::now(),
                },
            );
        }

        self.saved_sessions.remove(&new_mode);
        self.state = TimerState::fresh(new_mode, configs);
        ClockCommand::Stop
    }

    /// Restore the snapshot saved for `mode`, consuming it.
    ///
    /// Returns the command that silences the clock, or `None` if nothing
    /// was saved for `mode`.
    pub fn resume_saved_session(&mut self, mode: Mode) -> Option<ClockCommand> {
        let saved = self.saved_sessions.remove(&mode)?;
        self.invalidate_run();
        self.state = TimerState {
            mode,
            phase: saved.phase,
            time_left_seconds: saved.time_left_seconds,
            is_running: false,
            completed_sessions: saved.completed_sessions,
            task_input_draft: saved.current_task_name.clone(),
            current_task_name: saved.current_task_name,
        };
        Some(ClockCommand::Stop)
    }

    pub fn set_task_input(&mut self, value: impl Into<String>) {
        self.state.task_input_draft = value.into();
    }

    pub fn set_current_task(&mut self, value: impl Into<String>) {
        self.state.current_task_name = value.into();
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn invalidate_run(&mut self) {
        self.state.is_running = false;
        self.paused = false;
        self.generation += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::mode::TimerConfig;
    use proptest::prelude::*;

    fn configs() -> ModeConfigs {
        ModeConfigs::default()
    }

    fn configs_with_cadence(n: u32) -> ModeConfigs {
        let mut configs = ModeConfigs::default();
        configs.pomodoro.sessions_before_long_break = n;
        configs
    }

    /// Run the current phase to completion through the public API.
    fn finish_phase(machine: &mut PhaseMachine, configs: &ModeConfigs) -> PhaseCompletion {
        if !machine.is_running() {
            machine.toggle_run();
        }
        let generation = machine.generation();
        machine.on_complete(generation, configs).unwrap()
    }

    #[test]
    fn initial_state() {
        let machine = PhaseMachine::new(Mode::Pomodoro, &configs());
        assert_eq!(machine.phase(), Phase::Work);
        assert_eq!(machine.time_left_seconds(), 1500);
        assert_eq!(machine.completed_sessions(), 0);
        assert!(!machine.is_running());
    }

    #[test]
    fn classic_pomodoro_sequence() {
        let configs = configs();
        let mut machine = PhaseMachine::new(Mode::Pomodoro, &configs);
        let mut phases = Vec::new();
        let mut counts = Vec::new();

        for _ in 0..4 {
            let done = finish_phase(&mut machine, &configs);
            assert_eq!(done.phase, Phase::Work);
            phases.push(machine.phase());
            counts.push(machine.completed_sessions());
            // Run the break so the next work phase starts.
            finish_phase(&mut machine, &configs);
        }

        assert_eq!(
            phases,
            vec![Phase::Break, Phase::Break, Phase::Break, Phase::LongBreak]
        );
        assert_eq!(counts, vec![1, 2, 3, 4]);
    }

    #[test]
    fn completion_sets_next_duration() {
        let configs = configs();
        let mut machine = PhaseMachine::new(Mode::Pomodoro, &configs);
        let done = finish_phase(&mut machine, &configs);
        assert_eq!(done.duration_seconds, 1500);
        assert_eq!(done.next_phase, Phase::Break);
        assert_eq!(machine.time_left_seconds(), 300);
        assert!(!machine.is_running());
    }

    #[test]
    fn break_completion_does_not_count_sessions() {
        let configs = configs();
        let mut machine = PhaseMachine::new(Mode::Pomodoro, &configs);
        finish_phase(&mut machine, &configs);
        assert_eq!(machine.completed_sessions(), 1);
        let done = finish_phase(&mut machine, &configs);
        assert_eq!(done.phase, Phase::Break);
        assert_eq!(machine.completed_sessions(), 1);
        assert_eq!(machine.phase(), Phase::Work);
    }

    #[test]
    fn toggle_adopts_draft_then_default_label() {
        let configs = configs();
        let mut machine = PhaseMachine::new(Mode::Pomodoro, &configs);
        machine.set_task_input("  write report ");
        let cmd = machine.toggle_run();
        assert_eq!(cmd, ClockCommand::start(1500, 1));
        assert_eq!(machine.state().current_task_name, "write report");

        let mut other = PhaseMachine::new(Mode::Pomodoro, &configs);
        other.toggle_run();
        assert_eq!(other.state().current_task_name, DEFAULT_TASK_LABEL);
    }

    #[test]
    fn toggle_pauses_then_resumes_with_new_generation() {
        let configs = configs();
        let mut machine = PhaseMachine::new(Mode::Pomodoro, &configs);
        machine.toggle_run();
        assert!(machine.apply_tick(&ClockEvent::Tick {
            time_left_seconds: 1400,
            generation: 1
        }));
        assert_eq!(machine.toggle_run(), ClockCommand::Pause);
        assert!(!machine.is_running());
        assert_eq!(machine.toggle_run(), ClockCommand::resume(1400, 2));
    }

    #[test]
    fn task_kept_through_work_and_cleared_after_break() {
        let configs = configs();
        let mut machine = PhaseMachine::new(Mode::Pomodoro, &configs);
        machine.set_task_input("essay");
        let done = finish_phase(&mut machine, &configs);
        assert_eq!(done.task_name, "essay");
        assert_eq!(machine.state().current_task_name, "essay");
        finish_phase(&mut machine, &configs);
        assert_eq!(machine.state().current_task_name, "");
    }

    #[test]
    fn duplicate_completion_is_ignored() {
        let configs = configs();
        let mut machine = PhaseMachine::new(Mode::Pomodoro, &configs);
        machine.toggle_run();
        let generation = machine.generation();
        assert!(machine.on_complete(generation, &configs).is_some());
        assert!(machine.on_complete(generation, &configs).is_none());
        assert_eq!(machine.completed_sessions(), 1);
    }

    #[test]
    fn stale_completion_after_reset_is_dropped() {
        let configs = configs();
        let mut machine = PhaseMachine::new(Mode::Pomodoro, &configs);
        machine.toggle_run();
        let old = machine.generation();
        assert_eq!(machine.reset(&configs), ClockCommand::Stop);
        assert!(machine.on_complete(old, &configs).is_none());
        assert!(!machine.apply_tick(&ClockEvent::Tick {
            time_left_seconds: 3,
            generation: old
        }));
        assert_eq!(machine.phase(), Phase::Work);
        assert_eq!(machine.time_left_seconds(), 1500);
    }

    #[test]
    fn completion_without_any_run_is_dropped() {
        let configs = configs();
        let mut machine = PhaseMachine::new(Mode::Pomodoro, &configs);
        assert!(machine.on_complete(0, &configs).is_none());
    }

    #[test]
    fn reset_while_running() {
        let configs = configs();
        let mut machine = PhaseMachine::new(Mode::Pomodoro, &configs);
        finish_phase(&mut machine, &configs);
        finish_phase(&mut machine, &configs);
        machine.toggle_run();
        machine.reset(&configs);
        let state = machine.state();
        assert!(!state.is_running);
        assert_eq!(state.phase, Phase::Work);
        assert_eq!(state.completed_sessions, 0);
        assert_eq!(state.time_left_seconds, 1500);
        assert!(state.current_task_name.is_empty());
        assert!(state.task_input_draft.is_empty());
    }

    #[test]
    fn switch_mode_snapshots_work_in_progress() {
        let configs = configs();
        let mut machine = PhaseMachine::restore(
            TimerState {
                mode: Mode::Pomodoro,
                phase: Phase::Work,
                time_left_seconds: 900,
                is_running: false,
                completed_sessions: 2,
                current_task_name: "deep work".into(),
                task_input_draft: String::new(),
            },
            BTreeMap::new(),
        );

        machine.switch_mode(Mode::Custom, &configs);

        let saved = machine.saved_session(Mode::Pomodoro).unwrap();
        assert_eq!(saved.time_left_seconds, 900);
        assert_eq!(saved.completed_sessions, 2);
        assert_eq!(saved.current_task_name, "deep work");
        assert_eq!(machine.mode(), Mode::Custom);
        assert_eq!(machine.phase(), Phase::Work);
        assert_eq!(machine.completed_sessions(), 0);
        assert_eq!(machine.time_left_seconds(), 1500);
        assert!(machine.saved_session(Mode::Custom).is_none());
    }

    #[test]
    fn switch_mode_during_break_saves_nothing() {
        let configs = configs();
        let mut machine = PhaseMachine::new(Mode::Pomodoro, &configs);
        finish_phase(&mut machine, &configs);
        machine.switch_mode(Mode::Animedoro, &configs);
        assert!(machine.saved_sessions().is_empty());
        assert_eq!(machine.time_left_seconds(), 2400);
    }

    #[test]
    fn switch_mode_invalidates_running_clock() {
        let configs = configs();
        let mut machine = PhaseMachine::new(Mode::Pomodoro, &configs);
        machine.toggle_run();
        let old = machine.generation();
        machine.switch_mode(Mode::Animedoro, &configs);
        assert!(!machine.is_running());
        assert!(machine.on_complete(old, &configs).is_none());
        assert_eq!(machine.completed_sessions(), 0);
    }

    #[test]
    fn resume_saved_session_restores_and_consumes() {
        let configs = configs();
        let mut machine = PhaseMachine::new(Mode::Pomodoro, &configs);
        machine.set_task_input("review");
        machine.toggle_run();
        machine.apply_tick(&ClockEvent::Tick {
            time_left_seconds: 700,
            generation: machine.generation(),
        });
        machine.switch_mode(Mode::Custom, &configs);

        assert!(machine.resume_saved_session(Mode::Pomodoro).is_some());
        let state = machine.state();
        assert_eq!(state.mode, Mode::Pomodoro);
        assert_eq!(state.time_left_seconds, 700);
        assert_eq!(state.current_task_name, "review");
        assert_eq!(state.task_input_draft, "review");
        assert!(!state.is_running);
        assert!(machine.resume_saved_session(Mode::Pomodoro).is_none());
    }

    #[test]
    fn progress_percent() {
        let configs = configs();
        let mut machine = PhaseMachine::new(Mode::Pomodoro, &configs);
        assert_eq!(machine.progress_percent(&configs), 0.0);
        machine.toggle_run();
        machine.apply_tick(&ClockEvent::SyncResponse {
            time_left_seconds: 375,
            generation: 1,
        });
        assert!((machine.progress_percent(&configs) - 75.0).abs() < f64::EPSILON);
    }

    #[test]
    fn progress_with_zero_length_phase_is_complete() {
        let mut configs = configs();
        configs.pomodoro = TimerConfig {
            work_seconds: 0,
            ..TimerConfig::POMODORO
        };
        let machine = PhaseMachine::new(Mode::Pomodoro, &configs);
        assert_eq!(machine.progress_percent(&configs), 100.0);
    }

    #[test]
    fn next_phase_preview() {
        let configs = configs();
        let mut machine = PhaseMachine::new(Mode::Pomodoro, &configs);
        assert_eq!(
            machine.next_phase(&configs),
            NextPhase {
                phase: Phase::Break,
                duration_seconds: 300
            }
        );
        for _ in 0..3 {
            finish_phase(&mut machine, &configs);
            finish_phase(&mut machine, &configs);
        }
        assert_eq!(machine.next_phase(&configs).phase, Phase::LongBreak);
        finish_phase(&mut machine, &configs);
        assert_eq!(machine.next_phase(&configs).phase, Phase::Work);
    }

    #[test]
    fn has_progress_requires_sessions_or_task() {
        let configs = configs();
        let mut machine = PhaseMachine::new(Mode::Pomodoro, &configs);
        assert!(!machine.has_progress());
        machine.set_current_task("x");
        assert!(machine.has_progress());
    }

    #[test]
    fn persisted_form_omits_running_flag() {
        let configs = configs();
        let mut machine = PhaseMachine::new(Mode::Pomodoro, &configs);
        machine.toggle_run();
        let json = serde_json::to_value(&machine).unwrap();
        assert!(json["state"].get("isRunning").is_none());
        let restored: PhaseMachine = serde_json::from_value(json).unwrap();
        assert!(!restored.is_running());
        assert_eq!(restored.state().current_task_name, DEFAULT_TASK_LABEL);
    }

    proptest! {
        #[test]
        fn long_break_exactly_on_multiples(cadence in prop::sample::select(vec![1_u32, 2, 4]), rounds in 1_u32..20) {
            let configs = configs_with_cadence(cadence);
            let mut machine = PhaseMachine::new(Mode::Pomodoro, &configs);
            for n in 1..=rounds {
                finish_phase(&mut machine, &configs);
                prop_assert_eq!(machine.completed_sessions(), n);
                let expected = if n % cadence == 0 { Phase::LongBreak } else { Phase::Break };
                prop_assert_eq!(machine.phase(), expected);
                finish_phase(&mut machine, &configs);
                prop_assert_eq!(machine.phase(), Phase::Work);
            }
        }

        #[test]
        fn generations_only_grow(ops in prop::collection::vec(0_u8..4, 1..40)) {
            let configs = configs();
            let mut machine = PhaseMachine::new(Mode::Pomodoro, &configs);
            let mut last = machine.generation();
            for op in ops {
                match op {
                    0 => { machine.toggle_run(); }
                    1 => { machine.reset(&configs); }
                    2 => { machine.switch_mode(Mode::Custom, &configs); }
                    _ => { machine.on_complete(machine.generation(), &configs); }
                }
                prop_assert!(machine.generation() >= last);
                last = machine.generation();
            }
        }
    }
}
