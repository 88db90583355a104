//! Configuration loading and management
//!
//! Everything is resolved once into a [`Config`] value that callers pass
//! around explicitly.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::debug;

use crate::hotkey::{DEFAULT_POLL_INTERVAL, DEFAULT_TIMEOUT};
use crate::mode::{Mode, ModePair};

const PREFERENCES_FILE: &str = "preferences.json";
const STATE_FILE: &str = "state.json";
const ENV_FILE: &str = ".env";
const HELPER_BINARY: &str = "check-modifier-keys";

/// Development flag in the `.env` file
pub const MOCK_DATA_KEY: &str = "USE_MOCK_DATA";
/// Process environment override of the development flag
pub const MOCK_DATA_ENV: &str = "PODSWITCH_USE_MOCK_DATA";

/// User preferences stored in `preferences.json`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct Preferences {
    mode_one: Option<Mode>,
    mode_two: Option<Mode>,
    key_probe_helper: Option<PathBuf>,
}

/// Runtime configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding preferences, state and the `.env` file
    pub data_dir: PathBuf,

    /// Durable key/value state file
    pub state_path: PathBuf,

    /// The two modes the toggle cycles between
    pub mode_pair: ModePair,

    /// Serve the bundled device fixture instead of querying the system
    pub use_mock_data: bool,

    /// Standalone modifier-key probe executable
    pub key_probe_helper: PathBuf,

    pub key_release_timeout: Duration,
    pub key_poll_interval: Duration,
}

impl Config {
    /// Load configuration from the default data directory and environment
    pub fn load() -> Result<Self> {
        let home = std::env::var("HOME").context("HOME is not set")?;
        let data_dir = PathBuf::from(&home)
            .join(".local")
            .join("share")
            .join("podswitch");

        let mut config = Self::from_dir(&data_dir)?;
        if let Ok(value) = std::env::var(MOCK_DATA_ENV) {
            config.use_mock_data = is_truthy(&value);
        }
        Ok(config)
    }

    /// Load configuration rooted at `data_dir`, without consulting the
    /// process environment
    pub fn from_dir(data_dir: &Path) -> Result<Self> {
        let preferences = read_preferences(&data_dir.join(PREFERENCES_FILE))?;
        let env = read_env_file(&data_dir.join(ENV_FILE))?;

        let defaults = ModePair::default();
        let mode_pair = ModePair::new(
            preferences.mode_one.unwrap_or(defaults.mode_one),
            preferences.mode_two.unwrap_or(defaults.mode_two),
        );

        let use_mock_data = env.get(MOCK_DATA_KEY).is_some_and(|v| is_truthy(v));
        let key_probe_helper = preferences
            .key_probe_helper
            .unwrap_or_else(default_helper_path);

        let config = Self {
            data_dir: data_dir.to_path_buf(),
            state_path: data_dir.join(STATE_FILE),
            mode_pair,
            use_mock_data,
            key_probe_helper,
            key_release_timeout: DEFAULT_TIMEOUT,
            key_poll_interval: DEFAULT_POLL_INTERVAL,
        };
        debug!(?config, "configuration resolved");
        Ok(config)
    }

    /// Ensure data directory exists
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)
            .with_context(|| format!("failed to create {}", self.data_dir.display()))?;
        Ok(())
    }
}

fn read_preferences(path: &Path) -> Result<Preferences> {
    if !path.exists() {
        return Ok(Preferences::default());
    }
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read preferences from {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("invalid preferences in {}", path.display()))
}

fn read_env_file(path: &Path) -> Result<HashMap<String, String>> {
    if !path.exists() {
        return Ok(HashMap::new());
    }
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    Ok(parse_env_file(&contents))
}

/// Parse `KEY=VALUE` lines; blank lines and `#` comments are skipped and
/// matching surrounding quotes are stripped
pub fn parse_env_file(contents: &str) -> HashMap<String, String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let line = line.strip_prefix("export ").unwrap_or(line);
            let (key, value) = line.split_once('=')?;
            let value = value.trim();
            let value = ['"', '\'']
                .iter()
                .find_map(|q| value.strip_prefix(*q).and_then(|v| v.strip_suffix(*q)))
                .unwrap_or(value);
            Some((key.trim().to_string(), value.to_string()))
        })
        .collect()
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// The helper binary installed next to the running executable
fn default_helper_path() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(HELPER_BINARY)))
        .unwrap_or_else(|| PathBuf::from(HELPER_BINARY))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_without_files() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::from_dir(temp_dir.path()).unwrap();

        assert_eq!(config.mode_pair, ModePair::default());
        assert!(!config.use_mock_data);
        assert_eq!(config.state_path, temp_dir.path().join("state.json"));
        assert!(config.key_probe_helper.ends_with("check-modifier-keys"));
        assert_eq!(config.key_release_timeout, Duration::from_millis(2000));
        assert_eq!(config.key_poll_interval, Duration::from_millis(50));
    }

    #[test]
    fn test_preferences_and_env_file() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(
            temp_dir.path().join("preferences.json"),
            r#"{"modeOne": "adaptive", "modeTwo": "anc", "keyProbeHelper": "/opt/probe"}"#,
        )
        .unwrap();
        std::fs::write(temp_dir.path().join(".env"), "# dev\nUSE_MOCK_DATA=\"true\"\n").unwrap();

        let config = Config::from_dir(temp_dir.path()).unwrap();
        assert_eq!(config.mode_pair, ModePair::new(Mode::Adaptive, Mode::NoiseCancellation));
        assert!(config.use_mock_data);
        assert_eq!(config.key_probe_helper, PathBuf::from("/opt/probe"));
    }

    #[test]
    fn test_invalid_preferences_are_an_error() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("preferences.json"), r#"{"modeOne": "loud"}"#).unwrap();
        assert!(Config::from_dir(temp_dir.path()).is_err());
    }

    #[test]
    fn test_parse_env_file() {
        let env = parse_env_file(
            "USE_MOCK_DATA=1\n\n# comment\nexport NAME='pods'\nBROKEN LINE\n SPACED = value \n",
        );
        assert_eq!(env.get("USE_MOCK_DATA").map(String::as_str), Some("1"));
        assert_eq!(env.get("NAME").map(String::as_str), Some("pods"));
        assert_eq!(env.get("SPACED").map(String::as_str), Some("value"));
        assert_eq!(env.len(), 3);
    }

    #[test]
    fn test_truthy_values() {
        assert!(is_truthy("TRUE"));
        assert!(is_truthy("on"));
        assert!(!is_truthy("false"));
        assert!(!is_truthy(""));
    }
}
