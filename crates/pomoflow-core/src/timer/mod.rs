mod machine;
mod mode;

pub use machine::{
    NextPhase, PhaseCompletion, PhaseMachine, SavedSession, TimerState, DEFAULT_TASK_LABEL,
};
pub use mode::{CustomSettings, Mode, ModeConfigs, Phase, TimerConfig};
