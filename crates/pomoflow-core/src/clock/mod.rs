mod engine;
mod source;
mod worker;

pub use engine::{ClockEngine, ClockStatus};
pub use source::{MonotonicClock, SystemClock, TimeSource};
pub use worker::{spawn_clock, spawn_clock_with, ClockHandle, DEFAULT_TICK_INTERVAL};
