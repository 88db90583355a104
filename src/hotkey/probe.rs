//! Blocking wait for modifier key release
//!
//! The orchestrator must not type into Siri while the shortcut that
//! triggered it is still held. Key state is a point-in-time query, so the
//! wait is a poll loop with a bounded timeout.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::keys::ModifierState;

/// Helper exit code: every modifier key was released
pub const EXIT_RELEASED: i32 = 0;
/// Helper exit code: keys were still held when the timeout elapsed
pub const EXIT_TIMEOUT: i32 = 1;
/// Helper exit code: the key state could not be read
pub const EXIT_ERROR: i32 = 2;

/// Default time to wait for the keys to be released
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(2000);
/// Default pause between two samples
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Errors that can occur while probing the keyboard
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("failed to run key probe {program}: {source}")]
    Spawn {
        program: PathBuf,
        source: std::io::Error,
    },

    #[error("key probe failed with exit code {0}")]
    Failed(i32),

    #[error("key probe was terminated by a signal")]
    Terminated,

    #[error("modifier key state is unavailable")]
    Unavailable,
}

/// Waits until no modifier key is held, or the timeout elapses
#[async_trait]
pub trait KeyProbe: Send + Sync {
    /// `Ok(true)` once released, `Ok(false)` if still held at timeout
    async fn wait_for_release(&self, timeout: Duration, poll_interval: Duration) -> Result<bool, ProbeError>;
}

/// Map a helper exit code onto the probe result
pub fn released_from_exit_code(code: Option<i32>) -> Result<bool, ProbeError> {
    match code {
        Some(EXIT_RELEASED) => Ok(true),
        Some(EXIT_TIMEOUT) => Ok(false),
        Some(code) => Err(ProbeError::Failed(code)),
        None => Err(ProbeError::Terminated),
    }
}

/// Sample `read` every `poll_interval` until it reports no held modifiers
pub async fn poll_until_released<F>(mut read: F, timeout: Duration, poll_interval: Duration) -> Result<bool, ProbeError>
where
    F: FnMut() -> Option<ModifierState> + Send,
{
    let started = Instant::now();

    while started.elapsed() < timeout {
        let state = read().ok_or(ProbeError::Unavailable)?;
        if state.is_empty() {
            debug!(waited_ms = started.elapsed().as_millis() as u64, "modifier keys released");
            return Ok(true);
        }
        tokio::time::sleep(poll_interval).await;
    }

    warn!(timeout_ms = timeout.as_millis() as u64, "modifier keys still held");
    Ok(false)
}

/// Probe backed by the standalone `check-modifier-keys` executable
#[derive(Debug, Clone)]
pub struct HelperProbe {
    program: PathBuf,
    args: Vec<String>,
}

impl HelperProbe {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Arguments passed before the timeout and interval
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }
}

#[async_trait]
impl KeyProbe for HelperProbe {
    async fn wait_for_release(&self, timeout: Duration, poll_interval: Duration) -> Result<bool, ProbeError> {
        let status = Command::new(&self.program)
            .args(&self.args)
            .arg(timeout.as_millis().to_string())
            .arg(poll_interval.as_millis().to_string())
            .kill_on_drop(true)
            .status()
            .await
            .map_err(|source| ProbeError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        debug!(?status, "key probe finished");
        released_from_exit_code(status.code())
    }
}

/// In-process probe reading the session's modifier flags directly
#[cfg(target_os = "macos")]
#[derive(Debug, Clone, Default)]
pub struct SessionProbe;

#[cfg(target_os = "macos")]
#[async_trait]
impl KeyProbe for SessionProbe {
    async fn wait_for_release(&self, timeout: Duration, poll_interval: Duration) -> Result<bool, ProbeError> {
        poll_until_released(ModifierState::current, timeout, poll_interval).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_mapping() {
        assert!(released_from_exit_code(Some(0)).unwrap());
        assert!(!released_from_exit_code(Some(1)).unwrap());
        assert!(matches!(released_from_exit_code(Some(2)), Err(ProbeError::Failed(2))));
        assert!(matches!(released_from_exit_code(None), Err(ProbeError::Terminated)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_returns_once_released() {
        let mut samples = 0;
        let started = Instant::now();
        let released = poll_until_released(
            || {
                samples += 1;
                Some(ModifierState {
                    control: samples < 4,
                    ..Default::default()
                })
            },
            DEFAULT_TIMEOUT,
            DEFAULT_POLL_INTERVAL,
        )
        .await
        .unwrap();

        assert!(released);
        assert_eq!(samples, 4);
        assert!(started.elapsed() >= DEFAULT_POLL_INTERVAL * 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_times_out_while_held() {
        let held = ModifierState {
            command: true,
            ..Default::default()
        };
        let started = Instant::now();
        let released = poll_until_released(|| Some(held), Duration::from_millis(200), DEFAULT_POLL_INTERVAL)
            .await
            .unwrap();

        assert!(!released);
        assert!(started.elapsed() >= Duration::from_millis(200));
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_unavailable_state() {
        let result = poll_until_released(|| None, DEFAULT_TIMEOUT, DEFAULT_POLL_INTERVAL).await;
        assert!(matches!(result, Err(ProbeError::Unavailable)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_helper_exit_codes() {
        let released = HelperProbe::new("sh").with_args(["-c", "exit 0", "probe"]);
        assert!(released.wait_for_release(DEFAULT_TIMEOUT, DEFAULT_POLL_INTERVAL).await.unwrap());

        let held = HelperProbe::new("sh").with_args(["-c", "exit 1", "probe"]);
        assert!(!held.wait_for_release(DEFAULT_TIMEOUT, DEFAULT_POLL_INTERVAL).await.unwrap());

        let broken = HelperProbe::new("sh").with_args(["-c", "exit 2", "probe"]);
        assert!(matches!(
            broken.wait_for_release(DEFAULT_TIMEOUT, DEFAULT_POLL_INTERVAL).await,
            Err(ProbeError::Failed(2))
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_helper_receives_timing_arguments() {
        let probe = HelperProbe::new("sh").with_args([
            "-c",
            r#"[ "$1" = "1500" ] && [ "$2" = "25" ]"#,
            "probe",
        ]);
        let released = probe
            .wait_for_release(Duration::from_millis(1500), Duration::from_millis(25))
            .await
            .unwrap();
        assert!(released);
    }

    #[tokio::test]
    async fn test_missing_helper() {
        let probe = HelperProbe::new("/nonexistent/check-modifier-keys");
        let result = probe.wait_for_release(DEFAULT_TIMEOUT, DEFAULT_POLL_INTERVAL).await;
        assert!(matches!(result, Err(ProbeError::Spawn { .. })));
    }
}
