//! Streaming animations through the diff engine

use std::error::Error;
use std::fmt::Display;
use std::str::FromStr;

use gmmk_rgb_core::{Board, Color, Frame};

use crate::config::Config;
use crate::detection::BoardKind;
use crate::lock::Lock;

/// Built-in animation patterns
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Pattern {
    /// A lit band sweeping across the key indices
    #[default]
    Wave,
    /// Every key fading in and out together
    Breathe,
    /// A hue gradient rotating over the board
    Rainbow,
}

impl FromStr for Pattern {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "wave" => Ok(Self::Wave),
            "breathe" => Ok(Self::Breathe),
            "rainbow" => Ok(Self::Rainbow),
            _ => Err(format!("unknown pattern: {s}. Available: wave, breathe, rainbow")),
        }
    }
}

impl Display for Pattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Wave => "wave",
            Self::Breathe => "breathe",
            Self::Rainbow => "rainbow",
        })
    }
}

const WAVE_WIDTH: usize = 6;
const BREATHE_PERIOD: u64 = 64;

impl Pattern {
    /// Frame number `tick` of the pattern
    pub fn render(self, base: Color, tick: u64, keys: usize) -> Frame {
        let mut frame = Frame::filled(Color::BLACK, keys);
        if keys == 0 {
            return frame;
        }
        match self {
            Self::Wave => {
                let dim = base.scale(0.1);
                frame.fill(dim);
                let head = (tick % keys as u64) as usize;
                for i in 0..WAVE_WIDTH.min(keys) {
                    let _ = frame.set((head + i) % keys, base);
                }
            },
            Self::Breathe => {
                let phase = tick % BREATHE_PERIOD;
                let half = BREATHE_PERIOD / 2;
                let level = if phase < half { phase } else { BREATHE_PERIOD - phase };
                frame.fill(base.scale(level as f32 / half as f32));
            },
            Self::Rainbow => {
                for i in 0..keys {
                    let hue = (i as f32 / keys as f32 + tick as f32 / 128.0).fract();
                    let _ = frame.set(i, hue_to_rgb(hue));
                }
            },
        }
        frame
    }
}

/// Fully saturated color for `hue` in 0..1
fn hue_to_rgb(hue: f32) -> Color {
    let h = hue.rem_euclid(1.0) * 6.0;
    let x = 1.0 - (h % 2.0 - 1.0).abs();
    let (r, g, b) = match h as u8 {
        0 => (1.0, x, 0.0),
        1 => (x, 1.0, 0.0),
        2 => (0.0, 1.0, x),
        3 => (0.0, x, 1.0),
        4 => (x, 0.0, 1.0),
        _ => (1.0, 0.0, x),
    };
    Color::new(
        (r * 255.0f32).round() as u8,
        (g * 255.0f32).round() as u8,
        (b * 255.0f32).round() as u8,
    )
}

/// Stream `pattern` until ctrl-c, reconnecting after failures
pub async fn run(kind: BoardKind, config: &Config, pattern: Pattern) -> Result<(), Box<dyn Error>> {
    let _lock = Lock::acquire()?;
    let mut tick = 0u64;

    loop {
        match kind.as_board(config) {
            Ok(mut board) => {
                println!("connected to {}, playing {pattern}", board.info().name);
                match drive(board.as_mut(), config, pattern, &mut tick).await {
                    Ok(()) => return Ok(()),
                    Err(e) => eprintln!("error: {e}"),
                }
            },
            Err(e) => eprintln!("failed to connect: {e}"),
        }

        // Wait before retry
        tokio::select! {
            _ = tokio::signal::ctrl_c() => return Ok(()),
            _ = tokio::time::sleep(config.animation.retry) => {},
        }
    }
}

/// Drive one connected board. Returns `Ok` only when interrupted.
async fn drive(
    board: &mut dyn Board,
    config: &Config,
    pattern: Pattern,
    tick: &mut u64,
) -> Result<(), Box<dyn Error>> {
    let lighting = board
        .as_lighting()
        .ok_or("board does not support per-key lighting")?;
    let keys = lighting.key_capacity();
    let base = config.device.base_color;
    lighting.initialize(Some(&Frame::filled(base, keys)))?;

    let mut interval = tokio::time::interval(config.animation.frame_interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                println!("stopping animation");
                return Ok(());
            },
            _ = interval.tick() => {
                let frame = pattern.render(base, *tick, keys);
                lighting.write_frame(&frame, config.diff.accuracy)?;
                *tick = tick.wrapping_add(1);
            },
        }
    }
}
