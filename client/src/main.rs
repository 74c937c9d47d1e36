use clap::Parser;
use client::input::{map_key, KeyAction, TerminalInput};
use client::network::{self, CommandWriter};
use client::rendering::ScoreView;
use client::ClientError;
use crossterm::event::{self, KeyEvent};
use log::{debug, error, info, warn};
use std::fs::OpenOptions;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::mpsc;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:3000")]
    server: String,

    /// File receiving the client log
    #[arg(long, default_value = "debug2.log")]
    log_file: String,
}

enum Incoming {
    Score(i32),
    Closed,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_logging(&args.log_file)?;

    info!("Connecting to: {}", args.server);
    let (mut scores, mut commands) = network::connect(&args.server).await?;

    let (score_tx, mut score_rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        loop {
            match scores.next_score().await {
                Ok(Some(score)) => {
                    if score_tx.send(Incoming::Score(score)).is_err() {
                        break;
                    }
                }
                Ok(None) => {
                    let _ = score_tx.send(Incoming::Closed);
                    break;
                }
                Err(e) => {
                    warn!("Score stream failed: {}", e);
                    let _ = score_tx.send(Incoming::Closed);
                    break;
                }
            }
        }
    });

    let mut view = ScoreView::terminal(&args.server)?;
    view.redraw()?;

    let mut terminal = spawn_terminal_reader();
    let mut server_open = true;

    loop {
        tokio::select! {
            input = terminal.recv() => match input {
                Some(TerminalInput::Key(key)) => {
                    if !handle_key(key, &mut view, &mut commands, server_open).await? {
                        break;
                    }
                }
                Some(TerminalInput::Resize) => view.redraw()?,
                None => {
                    warn!("Key reader stopped");
                    break;
                }
            },
            incoming = score_rx.recv(), if server_open => {
                match incoming {
                    Some(Incoming::Score(score)) => view.set_score(score)?,
                    Some(Incoming::Closed) | None => {
                        info!("Server closed the connection");
                        server_open = false;
                        view.set_status("Disconnected, press Q to leave")?;
                    }
                }
            }
        }
    }

    drop(view);
    info!("Client exited");
    Ok(())
}

/// Returns `false` when the client should exit.
async fn handle_key(
    key: KeyEvent,
    view: &mut ScoreView,
    commands: &mut CommandWriter<OwnedWriteHalf>,
    server_open: bool,
) -> Result<bool, ClientError> {
    match map_key(key) {
        KeyAction::Send(command) => {
            if server_open {
                commands.send(command).await?;
            }
        }
        KeyAction::SendAndExit(command) => {
            if server_open {
                if let Err(e) = commands.send(command).await {
                    warn!("Failed to send {:?}: {}", command, e);
                }
            }
            return Ok(false);
        }
        KeyAction::Redraw => view.redraw()?,
        KeyAction::Clear => view.clear()?,
        KeyAction::None => debug!("Unbound key {:?}", key.code),
    }
    Ok(true)
}

/// Reads terminal events on a blocking thread. The thread ends when the
/// receiver is dropped and the next event arrives.
fn spawn_terminal_reader() -> mpsc::UnboundedReceiver<TerminalInput> {
    let (tx, rx) = mpsc::unbounded_channel();

    std::thread::spawn(move || loop {
        let input = match event::read().map(TerminalInput::from_event) {
            Ok(Some(input)) => input,
            Ok(None) => continue,
            Err(e) => {
                error!("Failed to read terminal event: {}", e);
                break;
            }
        };
        if tx.send(input).is_err() {
            break;
        }
    });

    rx
}

/// The terminal belongs to the score view, so logs go to a file.
fn init_logging(path: &str) -> Result<(), ClientError> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(ClientError::LogFile)?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
    Ok(())
}
