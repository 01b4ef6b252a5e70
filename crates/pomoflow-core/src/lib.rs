//! # Pomoflow Core Library
//!
//! Core logic for the Pomoflow focus timer. Hosts (desktop shells, TUIs,
//! tests) drive everything through [`FocusApp`] or use the pieces directly.
//!
//! ## Architecture
//!
//! - **Clock**: a background tokio task that counts down against a wall-clock
//!   deadline and talks only through [`ClockCommand`] / [`ClockEvent`]
//!   messages, so a busy consumer never skews the remaining time
//! - **Timer**: the synchronous [`PhaseMachine`] deciding work/break/long
//!   break transitions and dropping stale completions by run generation
//! - **Stats**: the [`SessionRecorder`] holding history and per-day aggregates
//! - **Storage**: TOML [`Config`] plus a versioned JSON state document kept
//!   in SQLite ([`Database`]) or memory ([`MemoryStore`])
//!
//! ## Key Components
//!
//! - [`FocusApp`]: State container wiring all of the above
//! - [`ClockHandle`]: Command side of a running clock
//! - [`PhaseMachine`]: Phase state machine
//! - [`SessionRecorder`]: Session history and statistics

pub mod app;
pub mod clock;
pub mod error;
pub mod events;
pub mod logging;
pub mod stats;
pub mod storage;
pub mod tasks;
pub mod timer;
pub mod ui;

pub use app::FocusApp;
pub use clock::{
    spawn_clock, spawn_clock_with, ClockEngine, ClockHandle, ClockStatus, MonotonicClock,
    SystemClock, TimeSource,
};
pub use error::{ConfigError, CoreError, StorageError, ValidationError};
pub use events::{ClockCommand, ClockEvent};
pub use stats::{DailyStats, SessionHistoryItem, SessionRecorder, StatsTotals};
pub use storage::{Config, Database, MemoryStore, PersistedState, StateStore};
pub use tasks::{TaskItem, TaskList, TaskStats};
pub use timer::{
    CustomSettings, Mode, ModeConfigs, NextPhase, Phase, PhaseCompletion, PhaseMachine,
    SavedSession, TimerConfig, TimerState,
};
pub use ui::UiFlags;
