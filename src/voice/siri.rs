//! Siri text-input driver
//!
//! Opens Siri, types a fixed prompt and submits it, then dismisses Siri and
//! brings the previously focused application back.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::{VoiceChannel, VoiceError};

const SIRI_APP_NAME: &str = "Siri";
const SIRI_APP_PATH: &str = "/System/Applications/Siri.app";

/// Pause after opening Siri before checking it took focus
pub const STABILIZATION_DELAY: Duration = Duration::from_millis(100);
/// Pause after submitting so Siri can act before being dismissed
pub const DISMISS_DELAY: Duration = Duration::from_millis(1000);

const PRESS_ESCAPE_SCRIPT: &str = r#"tell application "System Events"
  key code 53
end tell"#;

const FRONTMOST_APP_SCRIPT: &str = r#"tell application "System Events"
  set frontApp to first application process whose frontmost is true
  return (name of frontApp) & linefeed & (POSIX path of (application file of frontApp))
end tell"#;

/// Application that had focus
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontmostApp {
    pub name: String,
    pub path: PathBuf,
}

/// The desktop primitives Siri automation is built from
#[async_trait]
pub trait Desktop: Send + Sync {
    async fn frontmost_app(&self) -> Result<Option<FrontmostApp>, VoiceError>;
    async fn open(&self, path: &Path) -> Result<(), VoiceError>;
    async fn run_script(&self, script: &str) -> Result<String, VoiceError>;
}

/// Desktop driven through `osascript` and `open`
#[derive(Debug, Clone, Default)]
pub struct OsaDesktop;

#[async_trait]
impl Desktop for OsaDesktop {
    async fn frontmost_app(&self) -> Result<Option<FrontmostApp>, VoiceError> {
        let output = self.run_script(FRONTMOST_APP_SCRIPT).await?;
        let mut lines = output.lines();
        let app = match (lines.next(), lines.next()) {
            (Some(name), Some(path)) if !name.is_empty() => Some(FrontmostApp {
                name: name.to_string(),
                path: PathBuf::from(path),
            }),
            _ => None,
        };
        Ok(app)
    }

    async fn open(&self, path: &Path) -> Result<(), VoiceError> {
        let output = Command::new("open").arg(path).output().await?;
        if !output.status.success() {
            return Err(VoiceError::Script(format!(
                "open {} failed: {}",
                path.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(())
    }

    async fn run_script(&self, script: &str) -> Result<String, VoiceError> {
        let output = Command::new("osascript").arg("-e").arg(script).output().await?;
        if !output.status.success() {
            return Err(VoiceError::Script(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

/// Escape text for use inside an AppleScript string literal
fn applescript_quote(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Script that clears Siri's text field, types `prompt` and submits it
fn type_prompt_script(prompt: &str) -> String {
    format!(
        r#"tell application "System Events"
  set textToType to "{}"
  keystroke "a" using {{command down}}
  delay 0.1
  key code 51
  delay 0.1
  keystroke textToType
  key code 36
end tell"#,
        applescript_quote(prompt)
    )
}

/// Voice-command channel that types prompts into Siri
pub struct SiriChannel<D> {
    desktop: D,
    siri_path: PathBuf,
    stabilization_delay: Duration,
    dismiss_delay: Duration,
}

impl<D: Desktop> SiriChannel<D> {
    pub fn new(desktop: D) -> Self {
        Self {
            desktop,
            siri_path: PathBuf::from(SIRI_APP_PATH),
            stabilization_delay: STABILIZATION_DELAY,
            dismiss_delay: DISMISS_DELAY,
        }
    }

    async fn is_siri_frontmost(&self) -> Result<bool, VoiceError> {
        Ok(self
            .desktop
            .frontmost_app()
            .await?
            .is_some_and(|app| app.name == SIRI_APP_NAME))
    }

    async fn type_prompt(&self, prompt: &str) -> Result<(), VoiceError> {
        self.desktop.open(&self.siri_path).await?;
        tokio::time::sleep(self.stabilization_delay).await;

        if !self.is_siri_frontmost().await? {
            return Err(VoiceError::AssistantNotOpen);
        }

        self.desktop.run_script(&type_prompt_script(prompt)).await?;
        info!(prompt, "prompt submitted to Siri");
        Ok(())
    }

    /// Dismiss Siri and refocus the previous app; failures are only logged
    async fn restore(&self, previous: Option<&FrontmostApp>) {
        tokio::time::sleep(self.dismiss_delay).await;

        if let Err(e) = self.desktop.run_script(PRESS_ESCAPE_SCRIPT).await {
            warn!(?e, "failed to dismiss Siri");
        }

        if let Some(app) = previous {
            debug!(app = %app.name, "restoring frontmost application");
            if let Err(e) = self.desktop.open(&app.path).await {
                warn!(?e, app = %app.name, "failed to restore frontmost application");
            }
        }
    }
}

#[async_trait]
impl<D: Desktop> VoiceChannel for SiriChannel<D> {
    async fn activate(&self, prompt: &str) -> Result<(), VoiceError> {
        let previous = self.desktop.frontmost_app().await?;
        if previous.as_ref().is_some_and(|app| app.name == SIRI_APP_NAME) {
            return Err(VoiceError::AssistantBusy);
        }

        let result = self.type_prompt(prompt).await;
        self.restore(previous.as_ref()).await;
        result
    }
}
