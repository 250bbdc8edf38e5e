//! Board detection and selection logic.

use std::str::FromStr;

use bpaf::Bpaf;
use gmmk::{Gmmk, INFO as GMMK_INFO};
use gmmk_rgb_core::{Board, BoardError, BoardInfo};
use hidapi::HidApi;
use tracing::debug;

use crate::config::Config;

/// Supported board types
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Bpaf)]
#[bpaf(fallback(BoardKind::Auto), group_help("Board selection:"))]
pub enum BoardKind {
    /// Auto-detect connected board (default)
    #[default]
    Auto,
    /// GMMK full size
    Gmmk,
}

impl FromStr for BoardKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "gmmk" => Ok(Self::Gmmk),
            _ => Err(format!("unknown board: {s}. Available: auto, gmmk")),
        }
    }
}

impl std::fmt::Display for BoardKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Gmmk => write!(f, "gmmk"),
        }
    }
}

/// Check if a HID device matches the board info
fn matches(device: &hidapi::DeviceInfo, info: &BoardInfo) -> bool {
    device.vendor_id() == info.vendor_id
        && device.product_id() == info.product_id
        && info.usage_page.is_none_or(|up| device.usage_page() == up)
        && info.usage.is_none_or(|u| device.usage() == u)
}

/// Open a GMMK with the settings from `config`
fn open_gmmk(config: &Config) -> Result<Box<dyn Board>, BoardError> {
    let board = Gmmk::open()?
        .with_options(config.init_options()?)
        .with_metric(config.diff.metric.into());
    Ok(Box::new(board))
}

impl BoardKind {
    /// Open the specified board, or auto-detect if Auto
    pub fn as_board(&self, config: &Config) -> Result<Box<dyn Board>, BoardError> {
        match self {
            BoardKind::Auto => {
                // Single HID iteration, check each board's INFO
                let api = HidApi::new()?;
                for device in api.device_list() {
                    if matches(device, &GMMK_INFO) {
                        debug!(board = GMMK_INFO.name, "auto-detected board");
                        return open_gmmk(config);
                    }
                }
                Err(BoardError::DeviceNotFound)
            },
            BoardKind::Gmmk => open_gmmk(config),
        }
    }
}
