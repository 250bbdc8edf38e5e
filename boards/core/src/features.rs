//! Feature traits for board capabilities.
//!
//! Boards opt-in to features by implementing these traits and returning
//! `Some(self)` from the corresponding `as_*()` method in the Board trait.

use crate::{Frame, Result};

/// Per-key lighting capability
pub trait HasLighting {
    /// Number of keys in a full frame
    fn key_capacity(&self) -> usize;

    /// Run the bring-up sequence and push `initial` as the first frame
    fn initialize(&mut self, initial: Option<&Frame>) -> Result<()>;

    /// Send only what changed since the last frame, falling back to a full
    /// write when that is cheaper. `accuracy` is within 0.0-1.0.
    fn write_frame(&mut self, frame: &Frame, accuracy: f32) -> Result<()>;

    /// Send every key in `frame`
    fn write_full_frame(&mut self, frame: &Frame) -> Result<()>;

    /// Colors last written to the device
    fn shadow(&self) -> &Frame;
}

/// Device-wide settings
pub trait HasDeviceSettings {
    /// Select an onboard profile slot (1-3)
    fn set_profile(&mut self, profile: u8) -> Result<()>;
    /// Select a lighting mode
    fn set_mode(&mut self, mode: u8) -> Result<()>;
    /// USB polling rate in hz
    fn set_polling_rate(&mut self, hz: u16) -> Result<()>;
    /// Input delay in milliseconds
    fn set_delay(&mut self, delay: u8) -> Result<()>;
}
