//! Report layout and packet construction.
//!
//! | Offset | Meaning                                              |
//! |--------|------------------------------------------------------|
//! | 0      | report id                                            |
//! | 1-2    | checksum, little endian                              |
//! | 3      | command                                              |
//! | 4-5    | sub-command code / key colors: payload byte count    |
//! | 5-6    | key colors: start offset in bytes, little endian     |
//! | 8      | sub-command argument / key colors: color payload     |
//!
//! Builders only lay out fields. The report id and checksum are stamped by
//! [`Packet::finalize`] right before the write.

use std::fmt;

use gmmk_rgb_core::{Color, ValidationError};

use crate::checksum::checksum;
use crate::consts::*;
use crate::types::{Command, PollingRate, Profile};

pub trait Arg {
    const SIZE: usize;
    fn to_bytes(&self) -> Vec<u8>;
}

impl Arg for u8 {
    const SIZE: usize = 1;
    fn to_bytes(&self) -> Vec<u8> {
        vec![*self]
    }
}

/// One zero filled output report
#[derive(Clone, PartialEq, Eq)]
pub struct Packet([u8; PACKET_SIZE]);

impl Packet {
    /// Empty packet carrying only a command code
    pub const fn new(command: Command) -> Self {
        let mut buf = [0u8; PACKET_SIZE];
        buf[COMMAND_OFFSET] = command as u8;
        Self(buf)
    }

    /// Stamp the report id and checksum. Must be the last mutation before sending.
    pub fn finalize(&mut self) {
        self.0[0] = REPORT_ID;
        let sum = checksum(&self.0[COMMAND_OFFSET..]);
        self.0[CHECKSUM_OFFSET..CHECKSUM_OFFSET + 2].copy_from_slice(&sum.to_le_bytes());
    }

    #[inline(always)]
    pub fn as_bytes(&self) -> &[u8; PACKET_SIZE] {
        &self.0
    }

    #[inline(always)]
    pub fn command(&self) -> u8 {
        self.0[COMMAND_OFFSET]
    }

    /// Checksum currently stored in the header
    pub fn stored_checksum(&self) -> u16 {
        u16::from_le_bytes([self.0[CHECKSUM_OFFSET], self.0[CHECKSUM_OFFSET + 1]])
    }

    /// Key colors: payload length in bytes
    pub fn color_bytes(&self) -> usize {
        self.0[KEYCOLORS_COUNT_OFFSET] as usize
    }

    /// Key colors: start offset in bytes
    pub fn color_offset(&self) -> usize {
        u16::from_le_bytes([
            self.0[KEYCOLORS_START_OFFSET],
            self.0[KEYCOLORS_START_OFFSET + 1],
        ]) as usize
    }
}

impl From<[u8; PACKET_SIZE]> for Packet {
    fn from(buf: [u8; PACKET_SIZE]) -> Self {
        Self(buf)
    }
}

impl fmt::Debug for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Packet[")?;
        for (i, byte) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{byte:02x}")?;
        }
        write!(f, "]")
    }
}

macro_rules! impl_subcommand_abi {
    [$(
        $( #[doc = $( $doc:tt )* ] )*
        fn $name:ident ( [ $( $code:expr ),* ] $(, $arg:ident: $type:tt )* );
    )+] => {
        $(
            $(#[doc = concat!("Construct a packet for ", $($doc)*)])*
            #[allow(unused_mut, unused_variables, unused_assignments)]
            pub fn $name( $( $arg: $type ),* ) -> Packet {
                let mut packet = Packet::new(Command::SubCommand);
                let mut cur = SUBCMD_CMD_OFFSET;
                $(
                    packet.0[cur] = $code;
                    cur += 1;
                )*
                let mut cur = SUBCMD_ARG_OFFSET;
                $(
                    let start = cur;
                    cur += $type::SIZE;
                    packet.0[start..cur].copy_from_slice(&$arg.to_bytes());
                )*
                packet
            }
        )*
    };
}

impl_subcommand_abi![
    /// selecting a lighting mode
    fn set_mode([0x01, 0x00], mode: u8);

    /// setting the usb polling rate
    fn set_polling_rate([0x01, 0x0f], rate: PollingRate);

    /// setting the input delay
    fn set_delay([0x01, 0x02], delay: u8);
];

/// Construct a packet for opening a command bracket
pub const fn start() -> Packet {
    Packet::new(Command::Start)
}

/// Construct a packet for closing a command bracket
pub const fn end() -> Packet {
    Packet::new(Command::End)
}

/// Construct a packet for selecting an onboard profile
pub fn set_profile(profile: Profile) -> Packet {
    let mut packet = Packet(PROFILE_TEMPLATE);
    packet.0[PROFILE_INDEX_OFFSET] = profile.index();
    packet
}

/// Construct a packet for writing `colors` starting at key index `first_key`
pub fn key_colors(first_key: usize, colors: &[Color]) -> Result<Packet, ValidationError> {
    let byte_offset = u16::try_from(first_key * 3).map_err(|_| ValidationError::KeyOutOfRange {
        index: first_key,
        capacity: MAX_ADDRESSABLE_KEYS,
    })?;
    if colors.len() > MAX_KEYS_PER_PACKET {
        return Err(ValidationError::FrameLength {
            expected: MAX_KEYS_PER_PACKET,
            actual: colors.len(),
        });
    }

    let mut packet = Packet::new(Command::KeyColors);
    packet.0[KEYCOLORS_COUNT_OFFSET] = (colors.len() * 3) as u8;
    // frames past 85 keys need the high byte
    packet.0[KEYCOLORS_START_OFFSET..KEYCOLORS_START_OFFSET + 2]
        .copy_from_slice(&byte_offset.to_le_bytes());
    for (slot, color) in packet.0[KEYCOLORS_DATA_OFFSET..]
        .chunks_exact_mut(3)
        .zip(colors)
    {
        slot.copy_from_slice(&color.to_bytes());
    }
    Ok(packet)
}
