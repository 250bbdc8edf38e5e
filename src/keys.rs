//! Per-key color assignments given on the command line.

use std::ops::RangeInclusive;
use std::str::FromStr;

use gmmk_rgb_core::{Color, Frame, ValidationError};

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum KeySpecError {
    #[error("expected INDEX=COLOR or FIRST-LAST=COLOR, got {0}")]
    Syntax(String),
    #[error("invalid key index: {0}")]
    Index(String),
    #[error(transparent)]
    Color(#[from] ValidationError),
}

/// `INDEX=COLOR` or `FIRST-LAST=COLOR`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyAssignment {
    pub keys: RangeInclusive<usize>,
    pub color: Color,
}

impl FromStr for KeyAssignment {
    type Err = KeySpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (keys, color) = s
            .split_once('=')
            .ok_or_else(|| KeySpecError::Syntax(s.to_string()))?;
        let index = |v: &str| {
            v.trim()
                .parse::<usize>()
                .map_err(|_| KeySpecError::Index(v.to_string()))
        };
        let keys = match keys.split_once('-') {
            Some((first, last)) => index(first)?..=index(last)?,
            None => {
                let i = index(keys)?;
                i..=i
            },
        };
        Ok(Self {
            keys,
            color: color.trim().parse()?,
        })
    }
}

impl KeyAssignment {
    /// Paint the assignment onto `frame`, rejecting indices past its end
    pub fn apply(&self, frame: &mut Frame) -> Result<(), ValidationError> {
        for index in self.keys.clone() {
            frame.set(index, self.color)?;
        }
        Ok(())
    }
}
