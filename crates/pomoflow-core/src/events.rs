//! Message contract between the clock engine and its consumer.
//!
//! Both directions use a `{ "kind": ..., "payload": { ... } }` envelope;
//! `PAUSE`, `STOP` and `SYNC` carry no payload.
//! Every message carries the run `generation` it belongs to so the
//! consumer can drop events from a superseded run.

use serde::{Deserialize, Serialize};

/// Commands accepted by the clock engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "kind",
    content = "payload",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum ClockCommand {
    /// Anchor a new countdown at "now". Negative values are clamped to zero.
    Start {
        time_left_seconds: i64,
        #[serde(default)]
        generation: u64,
    },
    Pause,
    /// Same as `Start`; kept distinct for readability at the call site.
    Resume {
        time_left_seconds: i64,
        #[serde(default)]
        generation: u64,
    },
    Stop,
    Sync,
}

impl ClockCommand {
    pub fn start(time_left_seconds: u64, generation: u64) -> Self {
        Self::Start {
            time_left_seconds: clamp_to_i64(time_left_seconds),
            generation,
        }
    }

    pub fn resume(time_left_seconds: u64, generation: u64) -> Self {
        Self::Resume {
            time_left_seconds: clamp_to_i64(time_left_seconds),
            generation,
        }
    }

    /// Parse a JSON envelope. Returns `None` for anything malformed.
    pub fn parse(raw: &str) -> Option<Self> {
        match serde_json::from_str(raw) {
            Ok(cmd) => Some(cmd),
            Err(e) => {
                tracing::warn!(error = %e, "ignoring malformed clock command");
                None
            }
        }
    }
}

/// Events emitted by the clock engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "kind",
    content = "payload",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum ClockEvent {
    Tick { time_left_seconds: u64, generation: u64 },
    Complete { generation: u64 },
    SyncResponse { time_left_seconds: u64, generation: u64 },
}

impl ClockEvent {
    pub fn generation(&self) -> u64 {
        match *self {
            ClockEvent::Tick { generation, .. }
            | ClockEvent::Complete { generation }
            | ClockEvent::SyncResponse { generation, .. } => generation,
        }
    }

    /// Seconds remaining carried by the event, if any.
    pub fn time_left_seconds(&self) -> Option<u64> {
        match *self {
            ClockEvent::Tick {
                time_left_seconds, ..
            }
            | ClockEvent::SyncResponse {
                time_left_seconds, ..
            } => Some(time_left_seconds),
            ClockEvent::Complete { .. } => None,
        }
    }
}

fn clamp_to_i64(secs: u64) -> i64 {
    i64::try_from(secs).unwrap_or(i64::MAX)
}
