mod config;
pub mod database;
pub mod migrations;
mod state;
mod store;

pub use config::{Config, HistorySection, LoggingSection, TimerSection};
pub use database::Database;
pub use state::PersistedState;
pub use store::{MemoryStore, StateStore};

use std::path::PathBuf;

use crate::error::StorageError;

/// Returns `~/.config/pomoflow[-dev]/` based on POMOFLOW_ENV.
///
/// Set POMOFLOW_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, StorageError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("POMOFLOW_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("pomoflow-dev")
    } else {
        base_dir.join("pomoflow")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
