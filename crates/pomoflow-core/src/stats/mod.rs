//! Session history and statistics.
//!
//! The [`SessionRecorder`] keeps every finished phase and the per-day
//! aggregates derived from them; all read operations are pure.

mod recorder;

pub use recorder::{date_key, DailyStats, SessionHistoryItem, SessionRecorder, StatsTotals};
