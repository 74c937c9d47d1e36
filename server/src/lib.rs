//! # Snake Session Server Library
//!
//! This library provides the authoritative server for the networked terminal
//! snake game. It owns the single game session, applies commands from any
//! number of connected clients, advances the simulation at a fixed tick and
//! pushes score changes back out to every client.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Simulation
//! The server runs the one and only game session: a single snake on a
//! bordered grid, a single food cell and a score. Clients never simulate;
//! they only send 4-byte command codes and receive 4-byte scores.
//!
//! ### Shared Control
//! Every connected client steers the same snake. Direction commands from all
//! connections are serialized through the session lock and the last one to
//! acquire it wins. There are no per-client snakes and no client identity in
//! the game state.
//!
//! ### Score Broadcasting
//! When the snake eats, the new score is queued on a bounded channel and a
//! dedicated task writes it to every registered connection.
//!
//! ## Architecture Design
//!
//! ### Task Layout
//! - **Accept loop** (`network::Server::run`): one spawned task per client
//!   reading command frames, plus one writer task per client draining its
//!   output sink
//! - **Session driver** (`driver::SessionDriver`): fixed-interval ticker that
//!   advances the session and renders a snapshot
//! - **Score broadcaster** (`broadcaster::run_score_broadcaster`): drains
//!   score changes into the connection registry
//!
//! All loops observe one quit signal (`shutdown::Shutdown`). A Quit command
//! from any client, or Ctrl+C, ends the run. While the board is drawn the
//! terminal is in raw mode, so `console` reads Ctrl+C, Esc and `q` as keys.
//!
//! ### Locking
//! Session state sits behind a single mutex held only while state changes.
//! Nothing blocks on I/O or rendering with the lock held, and the tick never
//! waits for the broadcaster: the score queue has an explicit overflow policy.
//!
//! ### Headless Core
//! The session performs no I/O. Rendering and sound are capabilities
//! (`render::Renderer`, `audio::SoundPlayer`) injected into the driver, so
//! the whole simulation can be exercised in tests without a terminal.
//!
//! ## Module Organization
//!
//! - `board`: grid geometry, snake body, food placement and collision rules
//! - `game`: the session state machine (running, paused, game over)
//! - `scores`: bounded score handoff with overflow policy
//! - `client_manager`: registry of connected clients and frame fan-out
//! - `broadcaster`: score broadcast loop
//! - `driver`: tick loop
//! - `render`, `audio`: output capabilities and their terminal backends
//! - `network`: TCP accept loop and per-connection framing
//! - `config`: command-line configuration
//! - `console`: operator quit keys on the server terminal
//! - `shutdown`: the quit signal
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::audio::Silent;
//! use server::board::Board;
//! use server::client_manager::ConnectionRegistry;
//! use server::driver::SessionDriver;
//! use server::game::GameSession;
//! use server::network::Server;
//! use server::render::HeadlessRenderer;
//! use server::scores::{score_channel, OverflowPolicy};
//! use server::shutdown::Shutdown;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let shutdown = Shutdown::new();
//!     let (scores_tx, scores_rx) = score_channel(16, OverflowPolicy::DropNewest);
//!     let session = Arc::new(GameSession::new(Board::new(70, 20)?, scores_tx, shutdown.clone()));
//!     let registry = ConnectionRegistry::shared(32);
//!
//!     let server = Server::bind("0.0.0.0:3000", Arc::clone(&session), Arc::clone(&registry)).await?;
//!     tokio::spawn(server.run());
//!     tokio::spawn(server::broadcaster::run_score_broadcaster(scores_rx, registry, shutdown));
//!
//!     SessionDriver::new(session, HeadlessRenderer::default(), Silent, Duration::from_millis(200))
//!         .run()
//!         .await;
//!     Ok(())
//! }
//! ```

pub mod audio;
pub mod board;
pub mod broadcaster;
pub mod client_manager;
pub mod config;
pub mod console;
pub mod driver;
pub mod game;
pub mod network;
pub mod render;
pub mod scores;
pub mod shutdown;

use thiserror::Error;

/// Fatal startup errors
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to initialize terminal: {0}")]
    Terminal(#[source] std::io::Error),
    #[error("failed to open log file: {0}")]
    LogFile(#[source] std::io::Error),
    #[error(transparent)]
    Board(#[from] board::BoardError),
    #[error("invalid configuration: {0}")]
    Config(String),
}
