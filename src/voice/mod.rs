//! Voice-command channel
//!
//! Turns a noise-control mode into an action by dictating a fixed prompt to
//! the voice assistant.

mod siri;

use async_trait::async_trait;

pub use siri::{Desktop, FrontmostApp, OsaDesktop, SiriChannel, DISMISS_DELAY, STABILIZATION_DELAY};

/// Errors raised by the voice-command channel
#[derive(Debug, thiserror::Error)]
pub enum VoiceError {
    #[error("Siri already open. Please close Siri and try again.")]
    AssistantBusy,

    #[error("Siri not open. Please try again.")]
    AssistantNotOpen,

    #[error("automation failed: {0}")]
    Script(String),

    #[error("failed to run automation command: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Sends a text prompt to the voice assistant
#[async_trait]
pub trait VoiceChannel: Send + Sync {
    async fn activate(&self, prompt: &str) -> Result<(), VoiceError>;
}
