//! Scripted client for poking a running server without a terminal UI.
//!
//! Sends each command given on the command line, waits between them, and
//! prints every score frame that arrives in the meantime.

use clap::Parser;
use shared::{decode_score, Command, Frame, FRAME_LEN};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::sleep;

#[derive(Parser, Debug)]
#[command(author, version, about = "Send scripted commands to a snake server")]
struct Args {
    /// Server address to connect to
    #[arg(short, long, default_value = "127.0.0.1:3000")]
    server: String,

    /// Milliseconds to wait after each command
    #[arg(short, long, default_value = "500")]
    delay_ms: u64,

    /// Commands to send: up, down, left, right, pause, restart, quit
    #[arg(required = true)]
    commands: Vec<String>,
}

fn parse_command(name: &str) -> Option<Command> {
    match name.to_ascii_lowercase().as_str() {
        "up" => Some(Command::MoveUp),
        "down" => Some(Command::MoveDown),
        "left" => Some(Command::MoveLeft),
        "right" => Some(Command::MoveRight),
        "pause" => Some(Command::Pause),
        "restart" => Some(Command::Restart),
        "quit" => Some(Command::Quit),
        _ => None,
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let commands: Vec<Command> = args
        .commands
        .iter()
        .map(|name| parse_command(name).ok_or_else(|| format!("unknown command '{}'", name)))
        .collect::<Result<_, _>>()?;

    let stream = TcpStream::connect(&args.server).await?;
    println!("Connected to {}", args.server);
    let (mut reader, mut writer) = stream.into_split();

    let scores = tokio::spawn(async move {
        let mut frame: Frame = [0; FRAME_LEN];
        while reader.read_exact(&mut frame).await.is_ok() {
            println!("Score: {}", decode_score(frame));
        }
    });

    for command in commands {
        writer.write_all(&command.encode()).await?;
        println!("Sent {:?} ({:#05x})", command, command.code());
        sleep(Duration::from_millis(args.delay_ms)).await;
    }

    // Give late score frames a moment before closing.
    sleep(Duration::from_millis(100)).await;
    scores.abort();

    Ok(())
}
