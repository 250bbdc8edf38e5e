//! Errors that can occur during board operations.
//!
//! Every failure falls in one of three buckets: the transport refused a
//! report, the caller handed in something invalid (rejected before any I/O),
//! or the session is not in a state that allows the request. Nothing is
//! retried automatically.

use crate::SessionState;

/// Failures at the report transport boundary
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// HID communication error
    #[error("hid error: {0}")]
    Hid(#[from] hidapi::HidError),

    /// The channel accepted fewer bytes than the report holds
    #[error("short write: {written} of {expected} bytes")]
    ShortWrite { written: usize, expected: usize },

    /// The channel is closed
    #[error("transport closed")]
    Closed,
}

/// Caller input rejected before any report is sent
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("frame has {actual} keys, expected {expected}")]
    FrameLength { expected: usize, actual: usize },

    #[error("key index {index} out of range (capacity {capacity})")]
    KeyOutOfRange { index: usize, capacity: usize },

    #[error("invalid profile {0}, must be 1-3")]
    InvalidProfile(u8),

    #[error("invalid accuracy {0}, must be within 0.0-1.0")]
    InvalidAccuracy(f32),

    #[error("invalid polling rate {0}hz, must be 125, 250, 500 or 1000")]
    InvalidPollingRate(u16),

    #[error("invalid hex color: {0}")]
    InvalidColor(String),
}

/// Errors that can occur during board operations
#[derive(Debug, thiserror::Error)]
pub enum BoardError {
    /// Device was not found
    #[error("device not found")]
    DeviceNotFound,

    /// A report could not be written
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Invalid caller input
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Frame update requested before the session finished initializing
    #[error("session is {0}, initialize the board first")]
    NotInitialized(SessionState),
}

impl From<hidapi::HidError> for BoardError {
    fn from(e: hidapi::HidError) -> Self {
        Self::Transport(TransportError::Hid(e))
    }
}

pub type Result<T> = std::result::Result<T, BoardError>;
