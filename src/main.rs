use std::error::Error;

use bpaf::{Bpaf, Parser};
use gmmk_rgb_core::{Board, Color, Frame};
use tracing_subscriber::EnvFilter;

use crate::animate::Pattern;
use crate::config::Config;
use crate::detection::{board_kind, BoardKind};
use crate::keys::KeyAssignment;

mod animate;
mod config;
mod detection;
mod keys;
mod lock;

/// Override the configured diff accuracy
fn accuracy() -> impl Parser<Option<f32>> {
    bpaf::short('a')
        .long("accuracy")
        .help("Diff accuracy from 0.0 to 1.0. 1.0 resends every changed key.")
        .argument::<f32>("ACCURACY")
        .guard(|a| (0.0..=1.0).contains(a), "accuracy must be within 0.0-1.0")
        .optional()
}

fn key_assignments() -> impl Parser<Vec<KeyAssignment>> {
    bpaf::positional::<KeyAssignment>("KEYS")
        .help("Key assignments, INDEX=COLOR or FIRST-LAST=COLOR")
        .some("at least one key assignment is required")
}

#[derive(Clone, Debug, Bpaf)]
enum Command {
    /// Run the bring-up sequence and light every key with the base color
    #[bpaf(command)]
    Init {
        /// Override the configured base color (hex: #RRGGBB or #RGB)
        #[bpaf(short, long)]
        color: Option<Color>,
    },
    /// Light every key with one color
    #[bpaf(command)]
    Fill {
        /// Color to fill with (hex: #RRGGBB or #RGB)
        #[bpaf(positional("COLOR"))]
        color: Color,
    },
    /// Color individual keys on top of the base color
    #[bpaf(command)]
    Keys {
        #[bpaf(external)]
        accuracy: Option<f32>,
        #[bpaf(external(key_assignments))]
        keys: Vec<KeyAssignment>,
    },
    /// Select a lighting mode
    #[bpaf(command)]
    Mode {
        /// Mode number, 20 is per-key custom lighting
        #[bpaf(positional("MODE"))]
        mode: u8,
    },
    /// Select an onboard profile
    #[bpaf(command)]
    Profile {
        /// Profile slot 1-3
        #[bpaf(positional("PROFILE"))]
        profile: u8,
    },
    /// Set the usb polling rate
    #[bpaf(command)]
    Rate {
        /// Rate in hz: 125, 250, 500 or 1000
        #[bpaf(positional("HZ"))]
        hz: u16,
    },
    /// Set the input delay
    #[bpaf(command)]
    Delay {
        /// Delay in milliseconds
        #[bpaf(positional("MS"))]
        ms: u8,
    },
    /// Stream an animation until interrupted
    #[bpaf(command)]
    Animate {
        /// Pattern to play [wave|breathe|rainbow]
        #[bpaf(short, long, fallback(Pattern::Wave), display_fallback)]
        pattern: Pattern,
        /// Frame interval override, e.g. 30ms
        #[bpaf(short, long)]
        interval: Option<humantime::Duration>,
    },
}

#[derive(Clone, Debug, Bpaf)]
#[bpaf(options, version, descr(env!("CARGO_PKG_DESCRIPTION")))]
struct Cli {
    #[bpaf(external(board_kind))]
    board: BoardKind,
    #[bpaf(external(command))]
    command: Command,
}

/// Open the board and run its bring-up sequence with a uniform frame
fn initialized(
    kind: BoardKind,
    config: &Config,
    color: Color,
) -> Result<Box<dyn Board>, Box<dyn Error>> {
    let mut board = kind.as_board(config)?;
    let lighting = board
        .as_lighting()
        .ok_or("board does not support per-key lighting")?;
    let frame = Frame::filled(color, lighting.key_capacity());
    lighting.initialize(Some(&frame))?;
    Ok(board)
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = cli().run();
    let mut config = Config::load_or_create()?;
    let base = config.device.base_color;

    match cli.command {
        Command::Init { color } => {
            let color = color.unwrap_or(base);
            let board = initialized(cli.board, &config, color)?;
            println!("initialized {} with {color}", board.info().name);
        },
        Command::Fill { color } => {
            // the bring-up sequence already writes a full frame
            initialized(cli.board, &config, color)?;
            println!("filled all keys with {color}");
        },
        Command::Keys { accuracy, keys } => {
            let mut board = initialized(cli.board, &config, base)?;
            let lighting = board
                .as_lighting()
                .ok_or("board does not support per-key lighting")?;
            let mut frame = lighting.shadow().clone();
            for key in &keys {
                key.apply(&mut frame)?;
            }
            lighting.write_frame(&frame, accuracy.unwrap_or(config.diff.accuracy))?;
            println!("updated {} key assignment(s)", keys.len());
        },
        Command::Mode { mode } => {
            let mut board = cli.board.as_board(&config)?;
            board
                .as_settings()
                .ok_or("board does not support device settings")?
                .set_mode(mode)?;
            println!("set mode {mode}");
        },
        Command::Profile { profile } => {
            let mut board = cli.board.as_board(&config)?;
            board
                .as_settings()
                .ok_or("board does not support device settings")?
                .set_profile(profile)?;
            println!("selected profile {profile}");
        },
        Command::Rate { hz } => {
            let mut board = cli.board.as_board(&config)?;
            board
                .as_settings()
                .ok_or("board does not support device settings")?
                .set_polling_rate(hz)?;
            println!("set polling rate to {hz}hz");
        },
        Command::Delay { ms } => {
            let mut board = cli.board.as_board(&config)?;
            board
                .as_settings()
                .ok_or("board does not support device settings")?
                .set_delay(ms)?;
            println!("set input delay to {ms}ms");
        },
        Command::Animate { pattern, interval } => {
            if let Some(interval) = interval {
                config.animation.frame_interval = interval.into();
            }
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(animate::run(cli.board, &config, pattern))?;
        },
    }
    Ok(())
}
