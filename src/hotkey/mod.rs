//! Modifier key state and the release probe
//!
//! Reads macOS modifier flags through CoreGraphics, either in-process or
//! via the `check-modifier-keys` helper executable.

mod keys;
mod probe;

pub use keys::ModifierState;
#[cfg(target_os = "macos")]
pub use probe::SessionProbe;
pub use probe::{
    poll_until_released, released_from_exit_code, HelperProbe, KeyProbe, ProbeError,
    DEFAULT_POLL_INTERVAL, DEFAULT_TIMEOUT, EXIT_ERROR, EXIT_RELEASED, EXIT_TIMEOUT,
};
