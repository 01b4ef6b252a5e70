use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Timing preset.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Pomodoro,
    Animedoro,
    Custom,
}

impl Mode {
    pub const ALL: [Mode; 3] = [Mode::Pomodoro, Mode::Animedoro, Mode::Custom];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Pomodoro => "pomodoro",
            Mode::Animedoro => "animedoro",
            Mode::Custom => "custom",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    #[default]
    Work,
    Break,
    LongBreak,
}

impl Phase {
    pub fn is_break(&self) -> bool {
        !matches!(self, Phase::Work)
    }

    /// Human-readable name used by hosts for previews and notifications.
    pub fn label(&self) -> &'static str {
        match self {
            Phase::Work => "Work Session",
            Phase::Break => "Short Break",
            Phase::LongBreak => "Long Break",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::Work => "work",
            Phase::Break => "break",
            Phase::LongBreak => "longBreak",
        })
    }
}

/// Durations (seconds) and long-break cadence for one mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerConfig {
    pub work_seconds: u64,
    pub break_seconds: u64,
    pub long_break_seconds: u64,
    pub sessions_before_long_break: u32,
}

impl TimerConfig {
    /// Classic 25 / 5 / 15, long break every 4th session.
    pub const POMODORO: Self = Self {
        work_seconds: 25 * 60,
        break_seconds: 5 * 60,
        long_break_seconds: 15 * 60,
        sessions_before_long_break: 4,
    };

    /// 40 / 20 / 20, long break every 2nd session.
    pub const ANIMEDORO: Self = Self {
        work_seconds: 40 * 60,
        break_seconds: 20 * 60,
        long_break_seconds: 20 * 60,
        sessions_before_long_break: 2,
    };

    /// # Errors
    /// Returns an error if any value is zero.
    pub fn new(
        work_seconds: u64,
        break_seconds: u64,
        long_break_seconds: u64,
        sessions_before_long_break: u32,
    ) -> Result<Self, ValidationError> {
        let config = Self {
            work_seconds,
            break_seconds,
            long_break_seconds,
            sessions_before_long_break,
        };
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    /// Returns the first field that is zero.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.work_seconds == 0 {
            return Err(ValidationError::NotPositive {
                field: "work_seconds",
            });
        }
        if self.break_seconds == 0 {
            return Err(ValidationError::NotPositive {
                field: "break_seconds",
            });
        }
        if self.long_break_seconds == 0 {
            return Err(ValidationError::NotPositive {
                field: "long_break_seconds",
            });
        }
        if self.sessions_before_long_break == 0 {
            return Err(ValidationError::NotPositive {
                field: "sessions_before_long_break",
            });
        }
        Ok(())
    }

    pub fn duration_for(&self, phase: Phase) -> u64 {
        match phase {
            Phase::Work => self.work_seconds,
            Phase::Break => self.break_seconds,
            Phase::LongBreak => self.long_break_seconds,
        }
    }

    /// Break that follows the work session which brought the count to
    /// `completed_sessions`.
    pub fn break_after(&self, completed_sessions: u32) -> Phase {
        let cadence = self.sessions_before_long_break.max(1);
        if completed_sessions > 0 && completed_sessions % cadence == 0 {
            Phase::LongBreak
        } else {
            Phase::Break
        }
    }
}

/// User-editable durations (minutes) backing the `custom` mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomSettings {
    #[serde(default = "default_work_minutes")]
    pub work_minutes: u32,
    #[serde(default = "default_break_minutes")]
    pub break_minutes: u32,
    #[serde(default = "default_long_break_minutes")]
    pub long_break_minutes: u32,
}

fn default_work_minutes() -> u32 {
    25
}
fn default_break_minutes() -> u32 {
    5
}
fn default_long_break_minutes() -> u32 {
    15
}

/// Long-break cadence of the `custom` mode; not user-editable.
const CUSTOM_SESSIONS_BEFORE_LONG_BREAK: u32 = 4;

impl Default for CustomSettings {
    fn default() -> Self {
        Self {
            work_minutes: default_work_minutes(),
            break_minutes: default_break_minutes(),
            long_break_minutes: default_long_break_minutes(),
        }
    }
}

impl CustomSettings {
    /// # Errors
    /// Returns an error if `minutes` is zero.
    pub fn set_work(&mut self, minutes: u32) -> Result<(), ValidationError> {
        self.work_minutes = positive(minutes, "work_minutes")?;
        Ok(())
    }

    /// # Errors
    /// Returns an error if `minutes` is zero.
    pub fn set_break(&mut self, minutes: u32) -> Result<(), ValidationError> {
        self.break_minutes = positive(minutes, "break_minutes")?;
        Ok(())
    }

    /// # Errors
    /// Returns an error if `minutes` is zero.
    pub fn set_long_break(&mut self, minutes: u32) -> Result<(), ValidationError> {
        self.long_break_minutes = positive(minutes, "long_break_minutes")?;
        Ok(())
    }

    pub fn to_timer_config(&self) -> TimerConfig {
        TimerConfig {
            work_seconds: u64::from(self.work_minutes) * 60,
            break_seconds: u64::from(self.break_minutes) * 60,
            long_break_seconds: u64::from(self.long_break_minutes) * 60,
            sessions_before_long_break: CUSTOM_SESSIONS_BEFORE_LONG_BREAK,
        }
    }
}

fn positive(value: u32, field: &'static str) -> Result<u32, ValidationError> {
    if value == 0 {
        Err(ValidationError::NotPositive { field })
    } else {
        Ok(value)
    }
}

/// Resolved configuration for every mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeConfigs {
    pub pomodoro: TimerConfig,
    pub animedoro: TimerConfig,
    pub custom: TimerConfig,
}

impl ModeConfigs {
    pub fn from_custom(custom: &CustomSettings) -> Self {
        Self {
            pomodoro: TimerConfig::POMODORO,
            animedoro: TimerConfig::ANIMEDORO,
            custom: custom.to_timer_config(),
        }
    }

    pub fn get(&self, mode: Mode) -> &TimerConfig {
        match mode {
            Mode::Pomodoro => &self.pomodoro,
            Mode::Animedoro => &self.animedoro,
            Mode::Custom => &self.custom,
        }
    }
}

impl Default for ModeConfigs {
    fn default() -> Self {
        Self::from_custom(&CustomSettings::default())
    }
}
