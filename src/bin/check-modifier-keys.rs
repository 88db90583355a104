//! check-modifier-keys: wait until no modifier key is held
//!
//! Usage: `check-modifier-keys [timeoutMs] [pollIntervalMs]` (defaults 2000
//! and 50). Exit codes: 0 released, 1 timeout, 2 unexpected error.

use std::process::ExitCode;
use std::time::Duration;

use podswitch::hotkey::{ModifierState, EXIT_ERROR, EXIT_RELEASED, EXIT_TIMEOUT};

fn millis_arg(args: &[String], index: usize, default: Duration) -> Duration {
    args.get(index)
        .and_then(|raw| raw.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(default)
}

#[cfg(target_os = "macos")]
fn read_modifiers() -> Option<ModifierState> {
    ModifierState::current()
}

#[cfg(not(target_os = "macos"))]
fn read_modifiers() -> Option<ModifierState> {
    None
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();
    let timeout = millis_arg(&args, 1, podswitch::hotkey::DEFAULT_TIMEOUT);
    let poll_interval = millis_arg(&args, 2, podswitch::hotkey::DEFAULT_POLL_INTERVAL);

    let code = match podswitch::hotkey::poll_until_released(read_modifiers, timeout, poll_interval).await {
        Ok(true) => EXIT_RELEASED,
        Ok(false) => EXIT_TIMEOUT,
        Err(e) => {
            eprintln!("check-modifier-keys: {e}");
            EXIT_ERROR
        }
    };
    ExitCode::from(code as u8)
}
