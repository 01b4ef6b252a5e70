//! Application state container.
//!
//! [`FocusApp`] owns one of everything: the phase machine, the session
//! recorder, tasks, settings, UI flags, a running clock task and the store
//! they are flushed to. Hosts call its operations from user input and feed
//! it every event from [`FocusApp::next_clock_event`].
//!
//! Must be created inside a tokio runtime; the clock task is spawned on it.

use std::path::Path;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::clock::{spawn_clock_with, ClockHandle, SystemClock, TimeSource};
use crate::error::{StorageError, ValidationError};
use crate::events::ClockEvent;
use crate::stats::{DailyStats, SessionRecorder, StatsTotals};
use crate::storage::{data_dir, Config, Database, PersistedState, StateStore};
use crate::tasks::{TaskItem, TaskList, TaskStats};
use crate::timer::{
    CustomSettings, Mode, ModeConfigs, NextPhase, PhaseCompletion, PhaseMachine, TimerState,
};
use crate::ui::UiFlags;

pub struct FocusApp<S: StateStore> {
    config: Config,
    settings: CustomSettings,
    configs: ModeConfigs,
    machine: PhaseMachine,
    recorder: SessionRecorder,
    tasks: TaskList,
    ui: UiFlags,
    store: S,
    clock: ClockHandle,
    events: mpsc::UnboundedReceiver<ClockEvent>,
}

impl<S: StateStore> FocusApp<S> {
    /// Restore from `store` (or start fresh) and spawn the clock.
    ///
    /// The restored timer is always stopped and the celebration flag is
    /// always down. History older than `history.retention_days` is trimmed.
    pub fn open(config: Config, store: S) -> Self {
        Self::open_with_clock(config, store, SystemClock)
    }

    /// Like [`FocusApp::open`], with the countdown read from `source`.
    pub fn open_with_clock<T: TimeSource>(config: Config, store: S, source: T) -> Self {
        let persisted = PersistedState::load(&store)
            .unwrap_or_else(|| PersistedState::fresh(config.timer.default_mode));

        let PersistedState {
            timer,
            saved_sessions,
            settings,
            tasks,
            stats: mut recorder,
            mut ui,
            ..
        } = persisted;

        let machine = PhaseMachine::restore(timer, saved_sessions)
            .with_task_label(config.timer.default_task_label.clone());
        ui.hide_celebration();

        let retention = config.history.retention_days;
        if retention > 0 {
            let removed = recorder.trim_history(retention);
            if removed > 0 {
                info!(removed, retention_days = retention, "trimmed session history");
            }
        }

        let (clock, events) = spawn_clock_with(config.tick_interval(), source);

        let app = Self {
            configs: ModeConfigs::from_custom(&settings),
            config,
            settings,
            machine,
            recorder,
            tasks,
            ui,
            store,
            clock,
            events,
        };
        app.persist();
        app
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn timer(&self) -> &TimerState {
        self.machine.state()
    }

    pub fn machine(&self) -> &PhaseMachine {
        &self.machine
    }

    pub fn mode_configs(&self) -> &ModeConfigs {
        &self.configs
    }

    pub fn custom_settings(&self) -> &CustomSettings {
        &self.settings
    }

    pub fn recorder(&self) -> &SessionRecorder {
        &self.recorder
    }

    pub fn tasks(&self) -> &TaskList {
        &self.tasks
    }

    pub fn ui(&self) -> &UiFlags {
        &self.ui
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn progress_percent(&self) -> f64 {
        self.machine.progress_percent(&self.configs)
    }

    pub fn next_phase(&self) -> NextPhase {
        self.machine.next_phase(&self.configs)
    }

    pub fn has_progress(&self) -> bool {
        self.machine.has_progress()
    }

    pub fn weekly_stats(&self) -> StatsTotals {
        self.recorder.weekly_stats()
    }

    pub fn total_stats(&self) -> StatsTotals {
        self.recorder.total_stats()
    }

    pub fn today_stats(&self) -> DailyStats {
        self.recorder.today_stats()
    }

    pub fn task_stats(&self, task_id: &str) -> Option<TaskStats> {
        self.tasks.task_stats(task_id)
    }

    // ── Timer ────────────────────────────────────────────────────────

    /// Start, pause or resume. Returns whether the timer is now running.
    pub fn toggle_run(&mut self) -> bool {
        let cmd = self.machine.toggle_run();
        self.clock.send(cmd);
        self.persist();
        self.machine.is_running()
    }

    pub fn reset(&mut self) {
        let cmd = self.machine.reset(&self.configs);
        self.clock.send(cmd);
        self.persist();
    }

    pub fn switch_mode(&mut self, mode: Mode) {
        let cmd = self.machine.switch_mode(mode, &self.configs);
        self.clock.send(cmd);
        self.persist();
    }

    /// Returns `false` if nothing was saved for `mode`.
    pub fn resume_saved_session(&mut self, mode: Mode) -> bool {
        let Some(cmd) = self.machine.resume_saved_session(mode) else {
            return false;
        };
        self.clock.send(cmd);
        self.persist();
        true
    }

    /// Ask the clock for a fresh reading, e.g. after the host regains focus.
    pub fn sync(&self) {
        self.clock.sync();
    }

    pub fn set_task_input(&mut self, value: impl Into<String>) {
        self.machine.set_task_input(value);
        self.persist();
    }

    pub fn set_current_task(&mut self, value: impl Into<String>) {
        self.machine.set_current_task(value);
        self.persist();
    }

    /// Wait for the next clock event. Returns `None` once the clock is gone.
    pub async fn next_clock_event(&mut self) -> Option<ClockEvent> {
        self.events.recv().await
    }

    /// Apply one clock event. Returns the completion when the event closed
    /// the current phase.
    ///
    /// Accepted ticks are flushed, so a crash loses at most one tick.
    pub fn handle_clock_event(&mut self, event: &ClockEvent) -> Option<PhaseCompletion> {
        match event {
            ClockEvent::Tick { .. } | ClockEvent::SyncResponse { .. } => {
                if self.machine.apply_tick(event) {
                    self.persist();
                }
                None
            }
            ClockEvent::Complete { generation } => self.complete_phase(*generation),
        }
    }

    fn complete_phase(&mut self, generation: u64) -> Option<PhaseCompletion> {
        let completion = self.machine.on_complete(generation, &self.configs)?;

        self.recorder.record_completion(
            completion.duration_seconds,
            completion.mode,
            completion.phase,
            &completion.task_name,
        );

        if !completion.phase.is_break() {
            if let Some(task_id) = self.tasks.active_task_id().map(str::to_owned) {
                if let Err(e) = self
                    .tasks
                    .update_task_stats(&task_id, completion.duration_seconds)
                {
                    warn!(error = %e, "active task vanished before completion");
                }
            }
            self.ui.trigger_celebration();
        }

        info!(
            mode = %completion.mode,
            phase = completion.phase.label(),
            next = completion.next_phase.label(),
            completed_sessions = completion.completed_sessions,
            "phase completed"
        );
        self.persist();
        Some(completion)
    }

    // ── Settings ─────────────────────────────────────────────────────

    /// # Errors
    /// Returns an error if `minutes` is zero.
    pub fn update_custom_work(&mut self, minutes: u32) -> Result<(), ValidationError> {
        self.settings.set_work(minutes)?;
        self.settings_changed();
        Ok(())
    }

    /// # Errors
    /// Returns an error if `minutes` is zero.
    pub fn update_custom_break(&mut self, minutes: u32) -> Result<(), ValidationError> {
        self.settings.set_break(minutes)?;
        self.settings_changed();
        Ok(())
    }

    /// # Errors
    /// Returns an error if `minutes` is zero.
    pub fn update_custom_long_break(&mut self, minutes: u32) -> Result<(), ValidationError> {
        self.settings.set_long_break(minutes)?;
        self.settings_changed();
        Ok(())
    }

    pub fn reset_settings(&mut self) {
        self.settings = CustomSettings::default();
        self.settings_changed();
    }

    /// New durations apply from the next phase or reset; the running
    /// countdown is left alone.
    fn settings_changed(&mut self) {
        self.configs = ModeConfigs::from_custom(&self.settings);
        self.persist();
    }

    // ── Tasks ────────────────────────────────────────────────────────

    pub fn add_task(&mut self, name: &str) -> TaskItem {
        let task = self.tasks.add_task(name).clone();
        self.persist();
        task
    }

    /// # Errors
    /// Returns an error if `task_id` does not name a known task.
    pub fn select_task(&mut self, task_id: Option<&str>) -> Result<(), ValidationError> {
        self.tasks.select_task(task_id)?;
        self.persist();
        Ok(())
    }

    pub fn delete_task(&mut self, task_id: &str) -> bool {
        let removed = self.tasks.delete_task(task_id);
        if removed {
            self.persist();
        }
        removed
    }

    // ── UI ───────────────────────────────────────────────────────────

    pub fn toggle_sidebar(&mut self) {
        self.ui.toggle_sidebar();
        self.persist();
    }

    pub fn toggle_settings(&mut self) {
        self.ui.toggle_settings();
        self.persist();
    }

    pub fn toggle_focus_mode(&mut self) {
        self.ui.toggle_focus_mode();
        self.persist();
    }

    pub fn hide_celebration(&mut self) {
        self.ui.hide_celebration();
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Write the current state to the store.
    ///
    /// # Errors
    /// Returns an error if the state cannot be encoded or written.
    pub fn flush(&self) -> Result<(), StorageError> {
        PersistedState::capture(
            &self.machine,
            &self.settings,
            &self.tasks,
            &self.recorder,
            &self.ui,
        )
        .save(&self.store)
    }

    /// Flush, stop the clock task and hand back the store.
    ///
    /// # Errors
    /// Returns an error if the final flush fails; the clock is stopped
    /// regardless.
    pub async fn shutdown(self) -> Result<S, StorageError> {
        let flushed = self.flush();
        let Self { clock, store, .. } = self;
        clock.shutdown().await;
        debug!("focus app shut down");
        flushed.map(|()| store)
    }

    fn persist(&self) {
        if let Err(e) = self.flush() {
            warn!(error = %e, "failed to persist state");
        }
    }
}

impl FocusApp<Database> {
    /// Open with `config.toml` and `pomoflow.db` under `dir`.
    ///
    /// # Errors
    /// Returns an error if the config cannot be parsed or written, or the
    /// database cannot be opened.
    pub fn open_in(dir: &Path) -> crate::error::Result<Self> {
        let config = Config::load_from(&dir.join("config.toml"))?;
        let db = Database::open_at(&dir.join("pomoflow.db"))?;
        Ok(Self::open(config, db))
    }

    /// Open from the default data directory (`~/.config/pomoflow`).
    ///
    /// # Errors
    /// Returns an error if the data directory, config or database is
    /// unusable.
    pub fn open_default() -> crate::error::Result<Self> {
        Self::open_in(&data_dir()?)
    }
}
