//! Core Board trait and related types.

use std::fmt;

use crate::features::{HasDeviceSettings, HasLighting};

/// Static information about a board type for detection and CLI
#[derive(Debug, Clone, Copy)]
pub struct BoardInfo {
    pub name: &'static str,
    pub cli_name: &'static str,
    pub vendor_id: u16,
    pub product_id: u16,
    pub usage_page: Option<u16>,
    pub usage: Option<u16>,
    /// Number of addressable keys in the per-key lighting table
    pub key_capacity: usize,
}

/// Connection state of a board session.
///
/// Selection and opening happen while locating the device; a board handle
/// only exists once its transport is open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SessionState {
    #[default]
    Disconnected,
    Selected,
    Opened,
    Initialized,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Disconnected => "disconnected",
            Self::Selected => "selected",
            Self::Opened => "opened",
            Self::Initialized => "initialized",
        })
    }
}

/// Core board trait - object-safe for `dyn Board`
///
/// Boards should provide a static `INFO` constant and `open()` method separately.
pub trait Board: Send {
    /// Get board info (instance method for object safety)
    fn info(&self) -> &'static BoardInfo;

    /// Current session state
    fn state(&self) -> SessionState;

    /// Feature opt-in methods - override to return `Some(self)` if feature is supported
    fn as_lighting(&mut self) -> Option<&mut dyn HasLighting> {
        None
    }
    fn as_settings(&mut self) -> Option<&mut dyn HasDeviceSettings> {
        None
    }
}
