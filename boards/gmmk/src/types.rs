use gmmk_rgb_core::ValidationError;

use crate::abi::Arg;
use crate::consts;

/// Report command codes (byte 3)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Command {
    Start = 0x01,
    End = 0x02,
    SubCommand = 0x06,
    KeyColors = 0x11,
}

/// Onboard profile slot
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum Profile {
    #[default]
    One = 1,
    Two = 2,
    Three = 3,
}

impl Profile {
    /// Zero based slot index as the device expects it
    #[inline(always)]
    pub const fn index(self) -> u8 {
        self as u8 - 1
    }
}

impl TryFrom<u8> for Profile {
    type Error = ValidationError;
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::One),
            2 => Ok(Self::Two),
            3 => Ok(Self::Three),
            v => Err(ValidationError::InvalidProfile(v)),
        }
    }
}

/// USB polling rate
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum PollingRate {
    Hz125 = 0,
    Hz250 = 1,
    Hz500 = 2,
    #[default]
    Hz1000 = 3,
}

impl PollingRate {
    pub const fn hz(self) -> u16 {
        match self {
            Self::Hz125 => 125,
            Self::Hz250 => 250,
            Self::Hz500 => 500,
            Self::Hz1000 => 1000,
        }
    }
}

impl TryFrom<u16> for PollingRate {
    type Error = ValidationError;
    fn try_from(hz: u16) -> Result<Self, Self::Error> {
        match hz {
            125 => Ok(Self::Hz125),
            250 => Ok(Self::Hz250),
            500 => Ok(Self::Hz500),
            1000 => Ok(Self::Hz1000),
            hz => Err(ValidationError::InvalidPollingRate(hz)),
        }
    }
}

impl Arg for PollingRate {
    const SIZE: usize = 1;
    #[inline(always)]
    fn to_bytes(&self) -> Vec<u8> {
        vec![*self as u8]
    }
}

/// Settings applied by the bring-up sequence
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InitOptions {
    pub profile: Profile,
    pub polling_rate: PollingRate,
    pub delay: u8,
}

impl Default for InitOptions {
    fn default() -> Self {
        Self {
            profile: Profile::One,
            polling_rate: PollingRate::Hz1000,
            delay: 0,
        }
    }
}

/// Frame and packet sizing used by the writers and the diff engine
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProtocolLimits {
    /// Keys in a full frame
    pub key_capacity: usize,
    /// Keys carried by one key color report
    pub keys_per_packet: usize,
    /// Partial updates producing more runs than this are sent as a full frame
    pub fallback_threshold: usize,
}

impl ProtocolLimits {
    /// Limits of the full size board
    pub const GMMK: Self = Self {
        key_capacity: consts::MAX_KEYS,
        keys_per_packet: consts::MAX_KEYS_PER_PACKET,
        fallback_threshold: 6,
    };

    /// Clamp the limits to what the report format can address
    pub fn normalized(self) -> Self {
        Self {
            key_capacity: self.key_capacity.min(consts::MAX_ADDRESSABLE_KEYS),
            keys_per_packet: self.keys_per_packet.clamp(1, consts::MAX_KEYS_PER_PACKET),
            ..self
        }
    }

    /// Payload bytes per key color report
    pub const fn chunk_bytes(&self) -> usize {
        self.keys_per_packet * 3
    }

    /// Key color reports needed to send `keys` keys
    pub const fn packets_for(&self, keys: usize) -> usize {
        keys.div_ceil(self.keys_per_packet)
    }
}

impl Default for ProtocolLimits {
    fn default() -> Self {
        Self::GMMK
    }
}
