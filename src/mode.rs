//! Noise-control modes and the user's two-mode toggle pair

use serde::{Deserialize, Serialize};

/// The three noise-control states an AirPods accessory supports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Mode {
    /// Active noise cancellation
    #[serde(alias = "anc")]
    NoiseCancellation,
    /// Transparency (ambient passthrough)
    Transparency,
    /// Adaptive audio
    Adaptive,
}

impl Mode {
    /// Human readable label used in status messages
    pub fn label(self) -> &'static str {
        match self {
            Mode::NoiseCancellation => "Noise Cancellation",
            Mode::Transparency => "Transparency",
            Mode::Adaptive => "Adaptive",
        }
    }

    /// Fixed phrase typed into Siri to activate this mode
    pub fn prompt(self) -> &'static str {
        match self {
            Mode::NoiseCancellation => "AirPods ANC ON",
            Mode::Transparency => "AirPods Transparency ON",
            Mode::Adaptive => "AirPods Adaptive ON",
        }
    }

    /// Key used when persisting the mode
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::NoiseCancellation => "noiseCancellation",
            Mode::Transparency => "transparency",
            Mode::Adaptive => "adaptive",
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a mode name cannot be parsed
#[derive(Debug, thiserror::Error)]
#[error("unknown mode '{0}' (expected noiseCancellation, transparency or adaptive)")]
pub struct ParseModeError(String);

impl std::str::FromStr for Mode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "noisecancellation" | "noise-cancellation" | "anc" => Ok(Mode::NoiseCancellation),
            "transparency" => Ok(Mode::Transparency),
            "adaptive" => Ok(Mode::Adaptive),
            _ => Err(ParseModeError(s.to_string())),
        }
    }
}

/// Ordered pair of modes the toggle cycles between
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModePair {
    pub mode_one: Mode,
    pub mode_two: Mode,
}

impl ModePair {
    pub fn new(mode_one: Mode, mode_two: Mode) -> Self {
        Self { mode_one, mode_two }
    }

    /// The pair element that is not `mode`, or `None` when `mode` is not
    /// part of the pair
    pub fn other(&self, mode: Mode) -> Option<Mode> {
        if mode == self.mode_one {
            Some(self.mode_two)
        } else if mode == self.mode_two {
            Some(self.mode_one)
        } else {
            None
        }
    }
}

impl Default for ModePair {
    fn default() -> Self {
        Self::new(Mode::NoiseCancellation, Mode::Transparency)
    }
}
