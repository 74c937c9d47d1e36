//! # Snake Remote Client Library
//!
//! This library provides the terminal remote control for the snake session
//! server. The client holds no game state: it turns key presses into 4-byte
//! command codes and shows the scores the server pushes back.
//!
//! ## Architecture Overview
//!
//! The server owns the only session and draws the board on its own terminal.
//! Every connected client steers the same snake, so the client is a thin
//! pipe with a small status screen.
//!
//! ### Input
//! Key events are read on a blocking thread and forwarded to the async main
//! loop through a channel. `input::map_key` decides what each key means.
//!
//! ### Network
//! One TCP stream split into a command writer and a score reader. Both sides
//! exchange fixed 4-byte big-endian frames defined in the `shared` crate.
//!
//! ### Rendering
//! `rendering::ScoreView` shows the last received score, the connection
//! status and the key bindings in raw mode on the alternate screen.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::network;
//! use shared::Command;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), client::ClientError> {
//!     let (mut scores, mut commands) = network::connect("127.0.0.1:3000").await?;
//!
//!     commands.send(Command::MoveUp).await?;
//!     if let Some(score) = scores.next_score().await? {
//!         println!("score {}", score);
//!     }
//!     commands.send(Command::Quit).await
//! }
//! ```

pub mod input;
pub mod network;
pub mod rendering;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("connection error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to open log file: {0}")]
    LogFile(#[source] std::io::Error),
}
