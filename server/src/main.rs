use clap::Parser;
use log::{error, info};
use server::audio::{open_player, Silent, SoundPlayer};
use server::broadcaster::run_score_broadcaster;
use server::console::spawn_quit_listener;
use server::client_manager::ConnectionRegistry;
use server::config::{ServerArgs, ServerConfig};
use server::driver::SessionDriver;
use server::game::GameSession;
use server::network::Server;
use server::render::{HeadlessRenderer, Renderer, TerminalRenderer};
use server::scores::score_channel;
use server::shutdown::Shutdown;
use server::ServerError;
use std::fs::OpenOptions;
use std::sync::Arc;

/// Parses arguments, binds the listener, then runs the accept loop, the
/// score broadcaster and the session driver until a client quits.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ServerConfig::try_from(ServerArgs::parse())?;
    init_logging(&config)?;

    let shutdown = Shutdown::new();
    let (scores_tx, scores_rx) = score_channel(config.score_queue, config.score_overflow);
    let session = Arc::new(match config.seed {
        Some(seed) => GameSession::with_seed(config.board, seed, scores_tx, shutdown.clone()),
        None => GameSession::new(config.board, scores_tx, shutdown.clone()),
    });
    let registry = ConnectionRegistry::shared(config.max_connections);

    let server = Server::bind(&config.addr, Arc::clone(&session), Arc::clone(&registry)).await?;
    let server_handle = tokio::spawn(server.run());
    let broadcaster_handle = tokio::spawn(run_score_broadcaster(
        scores_rx,
        Arc::clone(&registry),
        shutdown.clone(),
    ));

    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Received Ctrl+C, shutting down");
                shutdown.trigger();
            }
        });
    }

    let sound: Box<dyn SoundPlayer> = if config.headless {
        Box::new(Silent)
    } else {
        open_player(&config.sound_dir, config.mute)
    };

    if config.headless {
        run_driver(session, HeadlessRenderer::default(), sound, &config).await;
    } else {
        let renderer = TerminalRenderer::new().map_err(ServerError::Terminal)?;
        // Raw mode swallows SIGINT, so Ctrl+C is read as a key here
        let keys = spawn_quit_listener(shutdown.clone());
        run_driver(session, renderer, sound, &config).await;
        if keys.join().is_err() {
            error!("Operator key thread panicked");
        }
    }

    shutdown.trigger();
    if let Err(e) = broadcaster_handle.await {
        error!("Score broadcaster panicked: {}", e);
    }
    if let Err(e) = server_handle.await {
        error!("Accept loop panicked: {}", e);
    }

    info!("Server exited");
    Ok(())
}

async fn run_driver<R: Renderer>(
    session: Arc<GameSession>,
    renderer: R,
    sound: Box<dyn SoundPlayer>,
    config: &ServerConfig,
) {
    SessionDriver::new(session, renderer, sound, config.tick)
        .run()
        .await;
}

/// Logs go to stderr when headless, otherwise to the log file so they do not
/// draw over the board.
fn init_logging(config: &ServerConfig) -> Result<(), ServerError> {
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));

    if !config.headless {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.log_file)
            .map_err(ServerError::LogFile)?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }

    builder.init();
    Ok(())
}
