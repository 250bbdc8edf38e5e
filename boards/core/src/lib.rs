//! Core traits and types for the gmmk-rgb board abstraction.
//!
//! This crate provides:
//! - Feature traits (`HasLighting`, `HasDeviceSettings`) that boards can implement
//! - The `Board` trait with `as_*()` methods for feature discovery
//! - Common types like `BoardInfo`, `Color`, `Frame` and `SessionState`
//! - The `Transport` boundary and the shared error taxonomy

mod board;
mod color;
mod error;
mod features;
mod transport;

pub use board::{Board, BoardInfo, SessionState};
pub use color::{Color, Frame};
pub use error::{BoardError, Result, TransportError, ValidationError};
pub use features::{HasDeviceSettings, HasLighting};
pub use transport::Transport;
