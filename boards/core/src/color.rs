//! Per-key colors and frames.

use std::fmt::{self, Display};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// 24-bit RGB color for a single key
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color::new(0, 0, 0);
    pub const WHITE: Color = Color::new(0xff, 0xff, 0xff);
    pub const RED: Color = Color::new(0xff, 0, 0);
    pub const GREEN: Color = Color::new(0, 0xff, 0);
    pub const BLUE: Color = Color::new(0, 0, 0xff);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Wire order of the channels
    #[inline(always)]
    pub const fn to_bytes(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }

    /// Scale every channel by `factor` (clamped to 0..=1)
    pub fn scale(self, factor: f32) -> Self {
        let f = factor.clamp(0.0, 1.0);
        Self::new(
            (self.r as f32 * f).round() as u8,
            (self.g as f32 * f).round() as u8,
            (self.b as f32 * f).round() as u8,
        )
    }
}

impl From<[u8; 3]> for Color {
    fn from([r, g, b]: [u8; 3]) -> Self {
        Self { r, g, b }
    }
}

impl Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl FromStr for Color {
    type Err = ValidationError;

    fn from_str(code: &str) -> Result<Self, Self::Err> {
        let mut hex = code.strip_prefix('#').unwrap_or(code).to_string();
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ValidationError::InvalidColor(code.to_string()));
        }
        match hex.len() {
            // Extend 3 character hex colors
            3 => hex = hex.chars().flat_map(|a| [a, a]).collect(),
            6 => {},
            _ => return Err(ValidationError::InvalidColor(code.to_string())),
        }
        let bits = u32::from_str_radix(&hex, 16)
            .map_err(|_| ValidationError::InvalidColor(code.to_string()))?;
        Ok(Self::new((bits >> 16) as u8, (bits >> 8) as u8, bits as u8))
    }
}

impl TryFrom<String> for Color {
    type Error = ValidationError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(value: Color) -> Self {
        value.to_string()
    }
}

/// Ordered key colors, indexed by the device's key index.
///
/// The length is fixed at construction and never changes afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    colors: Vec<Color>,
}

impl Frame {
    /// A frame of `len` keys all set to `color`
    pub fn filled(color: Color, len: usize) -> Self {
        Self {
            colors: vec![color; len],
        }
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Color> {
        self.colors.get(index).copied()
    }

    /// Set a single key
    pub fn set(&mut self, index: usize, color: Color) -> Result<(), ValidationError> {
        let capacity = self.colors.len();
        let slot = self
            .colors
            .get_mut(index)
            .ok_or(ValidationError::KeyOutOfRange { index, capacity })?;
        *slot = color;
        Ok(())
    }

    /// Set every key to `color`
    pub fn fill(&mut self, color: Color) {
        self.colors.fill(color);
    }

    pub fn as_slice(&self) -> &[Color] {
        &self.colors
    }

    /// Overwrite `src.len()` keys starting at `offset`
    pub fn copy_from(&mut self, offset: usize, src: &[Color]) -> Result<(), ValidationError> {
        let capacity = self.colors.len();
        let end = offset + src.len();
        if end > capacity {
            return Err(ValidationError::KeyOutOfRange {
                index: end - 1,
                capacity,
            });
        }
        self.colors[offset..end].copy_from_slice(src);
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Color> {
        self.colors.iter()
    }
}

impl AsRef<[Color]> for Frame {
    fn as_ref(&self) -> &[Color] {
        &self.colors
    }
}
