//! Command-line configuration for the server binary

use crate::board::Board;
use crate::scores::OverflowPolicy;
use crate::ServerError;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Networked terminal snake server")]
pub struct ServerArgs {
    /// IP address to bind to
    #[arg(short = 'H', long, default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = shared::DEFAULT_PORT)]
    pub port: u16,

    /// Milliseconds between simulation ticks
    #[arg(short, long, default_value_t = shared::TICK_MILLIS)]
    pub tick_ms: u64,

    /// Playable columns
    #[arg(long, default_value_t = shared::BOARD_WIDTH)]
    pub width: i32,

    /// Playable rows (no short flag to avoid conflict with --help)
    #[arg(long, default_value_t = shared::BOARD_HEIGHT)]
    pub height: i32,

    /// Score updates queued for broadcast before the overflow policy applies
    #[arg(long, default_value_t = 16, value_parser = clap::value_parser!(u16).range(1..))]
    pub score_queue: u16,

    /// What to discard when the score queue is full
    #[arg(long, value_enum, default_value_t = OverflowPolicy::DropNewest)]
    pub score_overflow: OverflowPolicy,

    /// Maximum simultaneous client connections
    #[arg(long, default_value_t = 32)]
    pub max_connections: usize,

    /// Run without drawing to the terminal; logs go to stderr
    #[arg(long)]
    pub headless: bool,

    /// Disable sound cues
    #[arg(long)]
    pub mute: bool,

    /// Directory holding game_start_beep.mp3 and game_over_beep.mp3
    #[arg(long, default_value = "assets")]
    pub sound_dir: PathBuf,

    /// Seed for food placement
    #[arg(long)]
    pub seed: Option<u64>,

    /// Log file used while the terminal is busy rendering
    #[arg(long, default_value = "debug.log")]
    pub log_file: PathBuf,
}

/// Validated server settings
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: String,
    pub tick: Duration,
    pub board: Board,
    pub score_queue: usize,
    pub score_overflow: OverflowPolicy,
    pub max_connections: usize,
    pub headless: bool,
    pub mute: bool,
    pub sound_dir: PathBuf,
    pub seed: Option<u64>,
    pub log_file: PathBuf,
}

impl TryFrom<ServerArgs> for ServerConfig {
    type Error = ServerError;

    fn try_from(args: ServerArgs) -> Result<Self, Self::Error> {
        if args.tick_ms == 0 {
            return Err(ServerError::Config("tick interval must be positive".into()));
        }
        if args.max_connections == 0 {
            return Err(ServerError::Config("max connections must be positive".into()));
        }

        Ok(Self {
            addr: format!("{}:{}", args.host, args.port),
            tick: Duration::from_millis(args.tick_ms),
            board: Board::new(args.width, args.height)?,
            score_queue: usize::from(args.score_queue),
            score_overflow: args.score_overflow,
            max_connections: args.max_connections,
            headless: args.headless,
            mute: args.mute,
            sound_dir: args.sound_dir,
            seed: args.seed,
            log_file: args.log_file,
        })
    }
}
