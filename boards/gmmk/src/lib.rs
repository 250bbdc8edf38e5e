//! High level hidapi abstraction for driving the GMMK per-key rgb backlight
//!
//! The keyboard accepts write-only 64 byte output reports. Every operation is
//! wrapped in a start/end command bracket, and every report carries a 16 bit
//! byte-sum checksum. Frames are pushed either whole, chunked 18 keys per
//! report, or as a handful of partial reports covering only what changed
//! since the last write.
//!
//! A missing device is always an error: [`Gmmk::open`] fails with
//! `DeviceNotFound`, and a handle always owns an open transport, so a write
//! can never be silently dropped.

use gmmk_rgb_core::{
    Board, BoardError, BoardInfo, Color, Frame, HasDeviceSettings, HasLighting, Result,
    SessionState, Transport, ValidationError,
};
use hidapi::{HidApi, HidDevice};
use tracing::{debug, trace, warn};
use types::{InitOptions, PollingRate, Profile, ProtocolLimits};

pub mod abi;
pub mod checksum;
pub mod diff;
pub mod types;

#[cfg(test)]
mod mock;
#[cfg(test)]
mod tests;

use abi::Packet;
use diff::DeltaMetric;

pub mod consts {
    pub const GMMK_VENDOR_ID: u16 = 0x0C45;
    pub const GMMK_PRODUCT_ID: u16 = 0x652F;
    pub const GMMK_USAGE_PAGE: u16 = 0xFF1C;

    pub const REPORT_ID: u8 = 0x04;
    pub const PACKET_SIZE: usize = 64;
    pub const CHECKSUM_OFFSET: usize = 1;
    pub const COMMAND_OFFSET: usize = 3;

    pub const SUBCMD_CMD_OFFSET: usize = 4;
    pub const SUBCMD_ARG_OFFSET: usize = 8;

    pub const KEYCOLORS_COUNT_OFFSET: usize = 4;
    pub const KEYCOLORS_START_OFFSET: usize = 5;
    pub const KEYCOLORS_DATA_OFFSET: usize = 8;
    /// Whole colors that fit behind the key colors header
    pub const KEYCOLORS_DATA_SIZE: usize = (PACKET_SIZE - KEYCOLORS_DATA_OFFSET) / 3 * 3;
    pub const MAX_KEYS_PER_PACKET: usize = KEYCOLORS_DATA_SIZE / 3;

    pub const MAX_KEYS: usize = 126;
    /// Keys reachable through the 16 bit byte offset of a key colors report
    pub const MAX_ADDRESSABLE_KEYS: usize = u16::MAX as usize / 3 + 1;

    /// Lighting mode that hands control of every key to the host
    pub const CUSTOM_MODE: u8 = 20;

    pub const PROFILE_INDEX_OFFSET: usize = 18;
    /// Profile selection report as captured from the vendor tool, profile byte zeroed
    #[rustfmt::skip]
    pub const PROFILE_TEMPLATE: [u8; PACKET_SIZE] = [
        0x04, 0xdd, 0x03, 0x04, 0x2c, 0x00, 0x00, 0x00, 0x55, 0xaa, 0xff, 0x02, 0x45, 0x0c, 0x2f, 0x65,
        0x00, 0x01, 0x00, 0x08, 0x00, 0x00, 0x00, 0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x08, 0x07,
        0x09, 0x0b, 0x0a, 0x0c, 0x0d, 0x0e, 0x0f, 0x10, 0x11, 0x12, 0x14, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    ];
}

/// Static board info for detection
pub static INFO: BoardInfo = BoardInfo {
    name: "GMMK Full Size",
    cli_name: "gmmk",
    vendor_id: consts::GMMK_VENDOR_ID,
    product_id: consts::GMMK_PRODUCT_ID,
    usage_page: Some(consts::GMMK_USAGE_PAGE),
    usage: None,
    key_capacity: consts::MAX_KEYS,
};

/// Color the shadow frame starts from, and the default first frame
pub const DEFAULT_COLOR: Color = Color::WHITE;

/// High level abstraction for managing a GMMK backlight.
///
/// Operations take `&mut self`, so two frame updates can never interleave
/// on one handle.
pub struct Gmmk<T: Transport = HidDevice> {
    transport: T,
    limits: ProtocolLimits,
    metric: DeltaMetric,
    options: InitOptions,
    shadow: Frame,
    state: SessionState,
}

impl Gmmk<HidDevice> {
    /// Find and open the device for modifications
    pub fn open() -> Result<Self> {
        let api = HidApi::new()?;
        let info = api
            .device_list()
            .find(|d| {
                d.vendor_id() == consts::GMMK_VENDOR_ID
                    && d.product_id() == consts::GMMK_PRODUCT_ID
                    && d.usage_page() == consts::GMMK_USAGE_PAGE
            })
            .ok_or(BoardError::DeviceNotFound)?;
        debug!(path = ?info.path(), "selected device");
        let device = info.open_device(&api)?;
        Ok(Self::new(device))
    }
}

impl<T: Transport> Gmmk<T> {
    /// Wrap an already open transport
    pub fn new(transport: T) -> Self {
        Self::with_limits(transport, ProtocolLimits::GMMK)
    }

    pub fn with_limits(transport: T, limits: ProtocolLimits) -> Self {
        let limits = limits.normalized();
        Self {
            transport,
            limits,
            metric: DeltaMetric::default(),
            options: InitOptions::default(),
            shadow: Frame::filled(DEFAULT_COLOR, limits.key_capacity),
            state: SessionState::Opened,
        }
    }

    /// Use a different per-key change metric for partial updates
    pub fn with_metric(mut self, metric: DeltaMetric) -> Self {
        self.metric = metric;
        self
    }

    /// Settings applied by [`Self::initialize`]
    pub fn with_options(mut self, options: InitOptions) -> Self {
        self.options = options;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Colors last written to the device
    pub fn shadow(&self) -> &Frame {
        &self.shadow
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Single choke point for every report
    fn write(&mut self, mut packet: Packet) -> Result<()> {
        packet.finalize();
        trace!(
            command = packet.command(),
            checksum = packet.stored_checksum(),
            "writing report"
        );
        let bytes = packet.as_bytes();
        self.transport.send_report(bytes[0], &bytes[1..])?;
        Ok(())
    }

    /// Run `op` inside a start/end bracket.
    ///
    /// No end is sent when the start fails. When `op` fails the end is still
    /// attempted and the original error is returned.
    fn bracketed(&mut self, op: impl FnOnce(&mut Self) -> Result<()>) -> Result<()> {
        self.write(abi::start())?;
        match op(self) {
            Ok(()) => self.write(abi::end()),
            Err(e) => {
                if let Err(end_err) = self.write(abi::end()) {
                    warn!("failed to close command after error: {end_err}");
                }
                Err(e)
            },
        }
    }

    #[inline(always)]
    fn command(&mut self, packet: Packet) -> Result<()> {
        self.bracketed(|this| this.write(packet))
    }

    /// Select the active onboard profile
    pub fn set_profile(&mut self, profile: Profile) -> Result<()> {
        debug!(?profile, "setting profile");
        self.command(abi::set_profile(profile))
    }

    /// Select a lighting mode
    pub fn set_mode(&mut self, mode: u8) -> Result<()> {
        debug!(mode, "setting mode");
        self.command(abi::set_mode(mode))
    }

    /// Hand per-key lighting to the host
    #[inline(always)]
    pub fn set_custom_mode(&mut self) -> Result<()> {
        self.set_mode(consts::CUSTOM_MODE)
    }

    /// Set the usb polling rate
    pub fn set_polling_rate(&mut self, rate: PollingRate) -> Result<()> {
        debug!(hz = rate.hz(), "setting polling rate");
        self.command(abi::set_polling_rate(rate))
    }

    /// Set the input delay
    pub fn set_delay(&mut self, delay: u8) -> Result<()> {
        debug!(delay, "setting delay");
        self.command(abi::set_delay(delay))
    }

    /// Run the bring-up sequence: profile, custom mode, polling rate, delay,
    /// then a full frame of `initial` (or the default color).
    ///
    /// Frame updates are rejected until this completes. A failure part way
    /// leaves the session opened but not initialized.
    pub fn initialize(&mut self, initial: Option<&Frame>) -> Result<()> {
        if let Some(frame) = initial {
            self.validate_exact(frame)?;
        }
        self.state = SessionState::Opened;

        let options = self.options;
        self.set_profile(options.profile)?;
        self.set_custom_mode()?;
        self.set_polling_rate(options.polling_rate)?;
        self.set_delay(options.delay)?;
        match initial {
            Some(frame) => self.send_full_frame(frame.as_slice())?,
            None => {
                let frame = Frame::filled(DEFAULT_COLOR, self.limits.key_capacity);
                self.send_full_frame(frame.as_slice())?
            },
        }

        self.state = SessionState::Initialized;
        debug!("board initialized");
        Ok(())
    }

    /// Write every key of `frame`. Frames shorter than the board only
    /// touch their leading keys.
    pub fn write_full_frame(&mut self, frame: &Frame) -> Result<()> {
        self.ensure_initialized()?;
        if frame.len() > self.limits.key_capacity {
            return Err(ValidationError::FrameLength {
                expected: self.limits.key_capacity,
                actual: frame.len(),
            }
            .into());
        }
        self.send_full_frame(frame.as_slice())
    }

    fn send_full_frame(&mut self, colors: &[Color]) -> Result<()> {
        let per_packet = self.limits.keys_per_packet;
        debug!(
            keys = colors.len(),
            packets = self.limits.packets_for(colors.len()),
            "writing full frame"
        );
        self.bracketed(|this| {
            for (i, chunk) in colors.chunks(per_packet).enumerate() {
                let offset = i * per_packet;
                this.write(abi::key_colors(offset, chunk)?)?;
                this.shadow.copy_from(offset, chunk)?;
            }
            Ok(())
        })
    }

    /// Write only the keys that changed since the last write.
    ///
    /// With `accuracy` 1.0 any change counts; lower values tolerate a per-key
    /// delta of up to `(1 - accuracy) * 765` before resending. When the change
    /// set needs more reports than the fallback threshold, a full frame is
    /// written instead. After a transport error the shadow reflects what was
    /// actually sent, so retrying the same frame resends only the remainder.
    pub fn write_frame(&mut self, frame: &Frame, accuracy: f32) -> Result<()> {
        self.ensure_initialized()?;
        self.validate_exact(frame)?;
        if !(0.0..=1.0).contains(&accuracy) {
            return Err(ValidationError::InvalidAccuracy(accuracy).into());
        }

        let runs = diff::compute_runs(
            self.shadow.as_slice(),
            frame.as_slice(),
            accuracy,
            self.limits.keys_per_packet,
            self.metric,
        );
        if runs.is_empty() {
            trace!("frame unchanged");
            return Ok(());
        }
        if runs.len() > self.limits.fallback_threshold {
            debug!(runs = runs.len(), "too many runs, falling back to full frame");
            return self.send_full_frame(frame.as_slice());
        }

        debug!(runs = runs.len(), "writing partial frame");
        let colors = frame.as_slice();
        self.bracketed(|this| {
            for run in &runs {
                let keys = &colors[run.range()];
                this.write(abi::key_colors(run.offset, keys)?)?;
                this.shadow.copy_from(run.offset, keys)?;
            }
            Ok(())
        })
    }

    fn ensure_initialized(&self) -> Result<()> {
        match self.state {
            SessionState::Initialized => Ok(()),
            state => Err(BoardError::NotInitialized(state)),
        }
    }

    fn validate_exact(&self, frame: &Frame) -> Result<()> {
        if frame.len() != self.limits.key_capacity {
            return Err(ValidationError::FrameLength {
                expected: self.limits.key_capacity,
                actual: frame.len(),
            }
            .into());
        }
        Ok(())
    }
}

// === Trait Implementations ===

impl<T: Transport + Send> Board for Gmmk<T> {
    fn info(&self) -> &'static BoardInfo {
        &INFO
    }

    fn state(&self) -> SessionState {
        self.state
    }

    fn as_lighting(&mut self) -> Option<&mut dyn HasLighting> {
        Some(self)
    }

    fn as_settings(&mut self) -> Option<&mut dyn HasDeviceSettings> {
        Some(self)
    }
}

impl<T: Transport> HasLighting for Gmmk<T> {
    fn key_capacity(&self) -> usize {
        self.limits.key_capacity
    }

    fn initialize(&mut self, initial: Option<&Frame>) -> Result<()> {
        Gmmk::initialize(self, initial)
    }

    fn write_frame(&mut self, frame: &Frame, accuracy: f32) -> Result<()> {
        Gmmk::write_frame(self, frame, accuracy)
    }

    fn write_full_frame(&mut self, frame: &Frame) -> Result<()> {
        Gmmk::write_full_frame(self, frame)
    }

    fn shadow(&self) -> &Frame {
        Gmmk::shadow(self)
    }
}

impl<T: Transport> HasDeviceSettings for Gmmk<T> {
    fn set_profile(&mut self, profile: u8) -> Result<()> {
        Gmmk::set_profile(self, Profile::try_from(profile)?)
    }

    fn set_mode(&mut self, mode: u8) -> Result<()> {
        Gmmk::set_mode(self, mode)
    }

    fn set_polling_rate(&mut self, hz: u16) -> Result<()> {
        Gmmk::set_polling_rate(self, PollingRate::try_from(hz)?)
    }

    fn set_delay(&mut self, delay: u8) -> Result<()> {
        Gmmk::set_delay(self, delay)
    }
}
