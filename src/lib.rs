//! podswitch: toggle AirPods noise-control modes through Siri
//!
//! Provides:
//! - Bluetooth inventory parsing into canonical battery records
//! - Persisted toggle state and command cooldown
//! - A mode-switch state machine gated on connectivity and key release
//! - Siri automation and a standalone modifier-key probe

pub mod bluetooth;
pub mod config;
pub mod hotkey;
pub mod lifecycle;
pub mod mode;
pub mod notify;
pub mod report;
pub mod state;
pub mod storage;
pub mod voice;

pub use mode::{Mode, ModePair};
