//! Mode-switch state machine
//!
//! Gates each activation on connectivity, the command cooldown and the
//! modifier-key guard before dispatching the voice command and persisting
//! the toggle state.

mod machine;

pub use machine::{
    cooldown_remaining, Clock, FailureReason, Interruptible, ModeSwitchOrchestrator,
    OrchestrationAttempt, OrchestratorSettings, Outcome, Phase, SwitchError, SystemClock,
    MIN_COMMAND_INTERVAL,
};
