use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::migrations::{self, STATE_VERSION};
use super::StateStore;
use crate::error::StorageError;
use crate::stats::SessionRecorder;
use crate::tasks::TaskList;
use crate::timer::{CustomSettings, Mode, ModeConfigs, PhaseMachine, SavedSession, TimerState};
use crate::ui::UiFlags;

/// Everything that survives a restart.
///
/// Transient fields (`is_running`, `show_celebration`) are skipped by their
/// own types, so a decoded document always comes back stopped and quiet.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedState {
    pub version: u32,
    #[serde(default = "default_timer")]
    pub timer: TimerState,
    #[serde(default)]
    pub saved_sessions: BTreeMap<Mode, SavedSession>,
    #[serde(default)]
    pub settings: CustomSettings,
    #[serde(default)]
    pub tasks: TaskList,
    #[serde(default)]
    pub stats: SessionRecorder,
    #[serde(default)]
    pub ui: UiFlags,
}

fn default_timer() -> TimerState {
    fresh_timer(Mode::default())
}

fn fresh_timer(mode: Mode) -> TimerState {
    PhaseMachine::new(mode, &ModeConfigs::default())
        .state()
        .clone()
}

impl Default for PersistedState {
    fn default() -> Self {
        Self::fresh(Mode::default())
    }
}

impl PersistedState {
    /// First-run state with the timer parked on a work phase of `mode`.
    pub fn fresh(mode: Mode) -> Self {
        Self {
            version: STATE_VERSION,
            timer: fresh_timer(mode),
            saved_sessions: BTreeMap::new(),
            settings: CustomSettings::default(),
            tasks: TaskList::default(),
            stats: SessionRecorder::default(),
            ui: UiFlags::default(),
        }
    }

    pub fn capture(
        machine: &PhaseMachine,
        settings: &CustomSettings,
        tasks: &TaskList,
        stats: &SessionRecorder,
        ui: &UiFlags,
    ) -> Self {
        Self {
            version: STATE_VERSION,
            timer: machine.state().clone(),
            saved_sessions: machine.saved_sessions().clone(),
            settings: *settings,
            tasks: tasks.clone(),
            stats: stats.clone(),
            ui: *ui,
        }
    }

    /// # Errors
    /// Returns an error if serialization fails.
    pub fn encode(&self) -> Result<String, StorageError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse and migrate a stored document.
    ///
    /// # Errors
    /// Returns an error if the document is not JSON, cannot be migrated, or
    /// does not match the current shape.
    pub fn decode(raw: &str) -> Result<Self, StorageError> {
        let document: serde_json::Value = serde_json::from_str(raw)?;
        let migrated = migrations::migrate_state(document)?;
        Ok(serde_json::from_value(migrated)?)
    }

    /// Load from `store`. Returns `None` when nothing usable is stored;
    /// unreadable documents are logged and treated as absent.
    pub fn load(store: &impl StateStore) -> Option<Self> {
        match store.load_raw() {
            Ok(Some(raw)) => match Self::decode(&raw) {
                Ok(state) => Some(state),
                Err(e) => {
                    warn!(error = %e, "persisted state unreadable; starting fresh");
                    None
                }
            },
            Ok(None) => {
                debug!("no persisted state; starting fresh");
                None
            }
            Err(e) => {
                warn!(error = %e, "state store unavailable; starting fresh");
                None
            }
        }
    }

    /// # Errors
    /// Returns an error if the document cannot be encoded or written.
    pub fn save(&self, store: &impl StateStore) -> Result<(), StorageError> {
        store.save_raw(&self.encode()?)
    }
}
