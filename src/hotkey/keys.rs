//! Modifier key definitions and state tracking
//!
//! Tracks which of the modifier keys that could corrupt a typed Siri prompt
//! (Command, Option, Control, Shift) are currently held.

/// Modifier key flag masks from macOS CGEventFlags
#[cfg(target_os = "macos")]
pub mod flags {
    use core_graphics::event::CGEventFlags;

    /// Command key modifier flag
    pub const COMMAND: CGEventFlags = CGEventFlags::CGEventFlagCommand;
    /// Option/Alt key modifier flag
    pub const OPTION: CGEventFlags = CGEventFlags::CGEventFlagAlternate;
    /// Control key modifier flag
    pub const CONTROL: CGEventFlags = CGEventFlags::CGEventFlagControl;
    /// Shift key modifier flag
    pub const SHIFT: CGEventFlags = CGEventFlags::CGEventFlagShift;
}

/// Tracks which modifier keys are currently pressed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModifierState {
    /// Command key is held
    pub command: bool,
    /// Option/Alt key is held
    pub option: bool,
    /// Control key is held
    pub control: bool,
    /// Shift key is held
    pub shift: bool,
}

impl ModifierState {
    /// Create a new ModifierState from CGEventFlags
    #[cfg(target_os = "macos")]
    pub fn from_flags(event_flags: core_graphics::event::CGEventFlags) -> Self {
        Self {
            command: event_flags.contains(flags::COMMAND),
            option: event_flags.contains(flags::OPTION),
            control: event_flags.contains(flags::CONTROL),
            shift: event_flags.contains(flags::SHIFT),
        }
    }

    /// Read the modifier state of the current login session
    ///
    /// Creates a blank event from the combined session source; its flags
    /// mirror the keys held right now.
    #[cfg(target_os = "macos")]
    pub fn current() -> Option<Self> {
        use core_graphics::event::CGEvent;
        use core_graphics::event_source::{CGEventSource, CGEventSourceStateID};

        let source = CGEventSource::new(CGEventSourceStateID::CombinedSessionState).ok()?;
        let event = CGEvent::new(source).ok()?;
        Some(Self::from_flags(event.get_flags()))
    }

    /// Check if all modifiers are released
    pub fn is_empty(&self) -> bool {
        !self.command && !self.option && !self.control && !self.shift
    }
}
