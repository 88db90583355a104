//! Signal handling for cancelling a running command
//!
//! Mode switches have no internal cancellation point; the caller races the
//! whole run against [`ShutdownSignal::wait`], see
//! `ModeSwitchOrchestrator::until_shutdown`.

use tokio::signal::unix::{signal, SignalKind};
use tracing::debug;

/// Signal that interrupted a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interruption {
    /// SIGINT, usually Ctrl-C
    Interrupt,
    /// SIGTERM
    Terminate,
}

impl Interruption {
    /// Shell convention: 128 + signal number
    pub fn exit_code(self) -> u8 {
        match self {
            Interruption::Interrupt => 130,
            Interruption::Terminate => 143,
        }
    }
}

/// Listens for SIGINT and SIGTERM
#[derive(Debug, Default)]
pub struct ShutdownSignal;

impl ShutdownSignal {
    pub fn new() -> Self {
        Self
    }

    /// Resolve on the first SIGINT or SIGTERM
    pub async fn wait(&self) -> std::io::Result<Interruption> {
        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;

        let received = tokio::select! {
            _ = sigterm.recv() => Interruption::Terminate,
            _ = sigint.recv() => Interruption::Interrupt,
        };
        debug!(?received, "shutdown signal received");
        Ok(received)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(Interruption::Interrupt.exit_code(), 130);
        assert_eq!(Interruption::Terminate.exit_code(), 143);
    }
}
