//! Integration tests for the networked snake session
//!
//! These tests run the real accept loop and score broadcaster on loopback TCP
//! and talk to them with the client crate's protocol types.

use client::network::{self, CommandWriter, ScoreReader};
use server::audio::Silent;
use server::board::Board;
use server::broadcaster::run_score_broadcaster;
use server::client_manager::{ConnectionRegistry, SharedRegistry};
use server::driver::SessionDriver;
use server::game::{GameSession, Phase, TickOutcome};
use server::network::Server;
use server::render::HeadlessRenderer;
use server::scores::{score_channel, OverflowPolicy, ScoreReceiver, ScoreSender};
use server::shutdown::Shutdown;
use shared::{Command, Direction, BOARD_HEIGHT, BOARD_WIDTH};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};

const WAIT: Duration = Duration::from_secs(2);

/// A running server without a driver; tests advance the session themselves.
struct TestServer {
    addr: SocketAddr,
    session: Arc<GameSession>,
    registry: SharedRegistry,
    shutdown: Shutdown,
    accept_loop: JoinHandle<()>,
    broadcaster: JoinHandle<usize>,
}

impl TestServer {
    async fn start(max_connections: usize) -> Self {
        let (scores_tx, scores_rx) = score_channel(16, OverflowPolicy::DropNewest);
        Self::launch(max_connections, scores_tx, scores_rx).await
    }

    /// Like `start`, but the broadcaster reads a score channel the test
    /// feeds directly instead of the session's.
    async fn start_with_score_feed(max_connections: usize) -> (Self, ScoreSender) {
        let (session_tx, _session_rx) = score_channel(16, OverflowPolicy::DropNewest);
        let (feed_tx, feed_rx) = score_channel(16, OverflowPolicy::DropNewest);
        let server = Self::launch(max_connections, session_tx, feed_rx).await;
        (server, feed_tx)
    }

    async fn launch(
        max_connections: usize,
        scores_tx: ScoreSender,
        scores_rx: ScoreReceiver,
    ) -> Self {
        let shutdown = Shutdown::new();
        let board = Board::new(BOARD_WIDTH, BOARD_HEIGHT).unwrap();
        let session = Arc::new(GameSession::with_seed(board, 7, scores_tx, shutdown.clone()));
        let registry = ConnectionRegistry::shared(max_connections);

        let server = Server::bind("127.0.0.1:0", Arc::clone(&session), Arc::clone(&registry))
            .await
            .expect("Failed to bind test server");
        let addr = server.local_addr().unwrap();

        let accept_loop = tokio::spawn(server.run());
        let broadcaster = tokio::spawn(run_score_broadcaster(
            scores_rx,
            Arc::clone(&registry),
            shutdown.clone(),
        ));

        Self {
            addr,
            session,
            registry,
            shutdown,
            accept_loop,
            broadcaster,
        }
    }

    async fn connect(&self) -> (ScoreReader<OwnedReadHalf>, CommandWriter<OwnedWriteHalf>) {
        network::connect(&self.addr.to_string())
            .await
            .expect("Failed to connect to test server")
    }

    async fn wait_for_clients(&self, count: usize) {
        let registry = Arc::clone(&self.registry);
        wait_until(move || {
            let registry = Arc::clone(&registry);
            async move { registry.read().await.len() == count }
        })
        .await;
    }
}

async fn wait_until<F, Fut>(mut condition: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    timeout(WAIT, async {
        while !condition().await {
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("Condition not reached in time");
}

/// Chooses a direction toward the food that is never a reversal
fn greedy_step(session: &GameSession) -> Command {
    let snapshot = session.snapshot();
    let head = snapshot.head().unwrap();
    let food = snapshot.food;
    let current = snapshot.direction;

    let vertical = match food.y.cmp(&head.y) {
        std::cmp::Ordering::Greater => Some(Direction::Down),
        std::cmp::Ordering::Less => Some(Direction::Up),
        std::cmp::Ordering::Equal => None,
    };
    let horizontal = match food.x.cmp(&head.x) {
        std::cmp::Ordering::Greater => Some(Direction::Right),
        std::cmp::Ordering::Less => Some(Direction::Left),
        std::cmp::Ordering::Equal => None,
    };

    let chosen = [vertical, horizontal]
        .into_iter()
        .flatten()
        .find(|direction| *direction != current.opposite())
        .unwrap_or_else(|| {
            // Food is straight behind: sidestep toward the middle
            let board = session.board();
            match current {
                Direction::Left | Direction::Right if head.y <= board.height() / 2 => Direction::Down,
                Direction::Left | Direction::Right => Direction::Up,
                _ if head.x <= board.width() / 2 => Direction::Right,
                _ => Direction::Left,
            }
        });

    match chosen {
        Direction::Up => Command::MoveUp,
        Direction::Right => Command::MoveRight,
        Direction::Down => Command::MoveDown,
        Direction::Left => Command::MoveLeft,
    }
}

/// PROTOCOL TESTS
mod protocol_tests {
    use super::*;

    #[tokio::test]
    async fn direction_command_over_tcp_steers_session() {
        let server = TestServer::start(8).await;
        let (_scores, mut commands) = server.connect().await;

        commands.send(Command::MoveUp).await.unwrap();

        let session = Arc::clone(&server.session);
        wait_until(move || {
            let direction = session.snapshot().direction;
            async move { direction == Direction::Up }
        })
        .await;
    }

    #[tokio::test]
    async fn reversal_over_tcp_is_rejected() {
        let server = TestServer::start(8).await;
        let (_scores, mut commands) = server.connect().await;

        // Frames on one connection are applied in order, so once the pause
        // lands the reversal has already been seen.
        commands.send(Command::MoveLeft).await.unwrap();
        commands.send(Command::Pause).await.unwrap();

        let session = Arc::clone(&server.session);
        wait_until(move || {
            let paused = session.snapshot().paused;
            async move { paused }
        })
        .await;

        assert_eq!(server.session.snapshot().direction, Direction::Right);
    }

    #[tokio::test]
    async fn unknown_code_keeps_connection_open() {
        let server = TestServer::start(8).await;
        let mut stream = TcpStream::connect(server.addr).await.unwrap();

        stream.write_all(&[0x00, 0x00, 0x00, 0x02]).await.unwrap();
        stream.write_all(&[0xff, 0xff, 0xff, 0xff]).await.unwrap();
        stream.write_all(&Command::Pause.encode()).await.unwrap();

        let session = Arc::clone(&server.session);
        wait_until(move || {
            let phase = session.phase();
            async move { phase == Phase::Paused }
        })
        .await;
        assert_eq!(server.registry.read().await.len(), 1);
    }

    #[tokio::test]
    async fn partial_frame_waits_for_remaining_bytes() {
        let server = TestServer::start(8).await;
        let mut stream = TcpStream::connect(server.addr).await.unwrap();
        let frame = Command::MoveDown.encode();

        stream.write_all(&frame[..2]).await.unwrap();
        sleep(Duration::from_millis(50)).await;
        assert_eq!(server.session.snapshot().direction, Direction::Right);

        stream.write_all(&frame[2..]).await.unwrap();
        let session = Arc::clone(&server.session);
        wait_until(move || {
            let direction = session.snapshot().direction;
            async move { direction == Direction::Down }
        })
        .await;
    }
}

/// SCORE BROADCAST TESTS
mod broadcast_tests {
    use super::*;

    #[tokio::test]
    async fn eating_pushes_score_to_every_client() {
        let server = TestServer::start(8).await;
        let (mut first, _first_commands) = server.connect().await;
        let (mut second, _second_commands) = server.connect().await;
        server.wait_for_clients(2).await;

        let mut eaten = None;
        for _ in 0..500 {
            server.session.apply_command(greedy_step(&server.session));
            match server.session.advance() {
                TickOutcome::Ate { score } => {
                    eaten = Some(score);
                    break;
                }
                TickOutcome::GameOver(cause) => panic!("Greedy walk died: {:?}", cause),
                _ => {}
            }
        }
        assert_eq!(eaten, Some(1));

        for reader in [&mut first, &mut second] {
            let score = timeout(WAIT, reader.next_score()).await.unwrap().unwrap();
            assert_eq!(score, Some(1));
        }

        let snapshot = server.session.snapshot();
        assert_eq!(snapshot.score, 1);
        assert_eq!(snapshot.snake.len(), shared::INITIAL_SNAKE_LEN + 1);
    }

    #[tokio::test]
    async fn disconnected_client_does_not_block_others() {
        let server = TestServer::start(8).await;
        let (mut staying, _staying_commands) = server.connect().await;
        let leaving = server.connect().await;
        server.wait_for_clients(2).await;

        drop(leaving);
        server.wait_for_clients(1).await;

        for _ in 0..500 {
            server.session.apply_command(greedy_step(&server.session));
            if let TickOutcome::Ate { .. } = server.session.advance() {
                break;
            }
        }

        let score = timeout(WAIT, staying.next_score()).await.unwrap().unwrap();
        assert_eq!(score, Some(1));
    }
}

/// SHUTDOWN DELIVERY TESTS
mod shutdown_delivery_tests {
    use super::*;

    /// A score racing with quit must still reach the client before the
    /// server hangs up, whichever of the two lands first.
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn score_pending_at_quit_reaches_client() {
        for round in 0..20 {
            let (server, feed) = TestServer::start_with_score_feed(8).await;
            let (mut scores, _commands) = server.connect().await;
            server.wait_for_clients(1).await;

            if round % 2 == 0 {
                feed.send(round);
                server.shutdown.trigger();
            } else {
                server.shutdown.trigger();
                feed.send(round);
            }

            let received = timeout(WAIT, scores.next_score()).await.unwrap().unwrap();
            assert_eq!(received, Some(round), "round {}", round);

            // Then the server closes the connection
            let after = timeout(WAIT, scores.next_score()).await.unwrap().unwrap();
            assert_eq!(after, None);

            timeout(WAIT, server.accept_loop).await.unwrap().unwrap();
            assert_eq!(timeout(WAIT, server.broadcaster).await.unwrap().unwrap(), 1);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn quit_command_flushes_score_to_every_client() {
        let (server, feed) = TestServer::start_with_score_feed(8).await;
        let (mut first, mut quitter) = server.connect().await;
        let (mut second, _second_commands) = server.connect().await;
        server.wait_for_clients(2).await;

        feed.send(3);
        quitter.send(Command::Quit).await.unwrap();

        for reader in [&mut first, &mut second] {
            let score = timeout(WAIT, reader.next_score()).await.unwrap().unwrap();
            assert_eq!(score, Some(3));
        }
        timeout(WAIT, server.accept_loop).await.unwrap().unwrap();
        assert!(server.registry.read().await.is_closed());
    }
}

/// CONNECTION LIFECYCLE TESTS
mod lifecycle_tests {
    use super::*;

    #[tokio::test]
    async fn disconnect_removes_registry_entry() {
        let server = TestServer::start(8).await;
        let stream = TcpStream::connect(server.addr).await.unwrap();
        server.wait_for_clients(1).await;

        drop(stream);
        server.wait_for_clients(0).await;
    }

    #[tokio::test]
    async fn connection_over_capacity_is_closed() {
        let server = TestServer::start(1).await;
        let _first = TcpStream::connect(server.addr).await.unwrap();
        server.wait_for_clients(1).await;

        let mut second = TcpStream::connect(server.addr).await.unwrap();
        let mut buf = [0u8; 4];
        let read = timeout(WAIT, second.read(&mut buf)).await.unwrap();

        // Closed by the server without any frame
        assert!(matches!(read, Ok(0) | Err(_)));
        assert_eq!(server.registry.read().await.len(), 1);
    }

    #[tokio::test]
    async fn quit_stops_accept_loop_and_broadcaster() {
        let server = TestServer::start(8).await;
        let (_scores, mut commands) = server.connect().await;
        let before = server.session.snapshot();

        commands.send(Command::Quit).await.unwrap();

        timeout(WAIT, server.accept_loop).await.unwrap().unwrap();
        let broadcast = timeout(WAIT, server.broadcaster).await.unwrap().unwrap();

        assert!(server.shutdown.is_triggered());
        assert_eq!(broadcast, 0);
        assert_eq!(server.session.snapshot(), before);
    }

    #[tokio::test]
    async fn quit_from_client_ends_driver() {
        let server = TestServer::start(8).await;
        let (_scores, mut commands) = server.connect().await;

        let driver = tokio::spawn(
            SessionDriver::new(
                Arc::clone(&server.session),
                HeadlessRenderer::default(),
                Silent,
                Duration::from_millis(2),
            )
            .run(),
        );

        sleep(Duration::from_millis(30)).await;
        commands.send(Command::Quit).await.unwrap();

        let ticks = timeout(WAIT, driver).await.unwrap().unwrap();
        assert!(ticks > 0);
        assert!(server.shutdown.is_triggered());
    }

    #[tokio::test]
    async fn driver_runs_snake_into_wall_and_restart_recovers() {
        let server = TestServer::start(8).await;
        let (_scores, mut commands) = server.connect().await;

        // Keep the food out of the way by steering along the top row
        commands.send(Command::MoveUp).await.unwrap();
        let session = Arc::clone(&server.session);
        wait_until(move || {
            let direction = session.snapshot().direction;
            async move { direction == Direction::Up }
        })
        .await;

        let driver = tokio::spawn(
            SessionDriver::new(
                Arc::clone(&server.session),
                HeadlessRenderer::default(),
                Silent,
                Duration::from_millis(1),
            )
            .run(),
        );

        let session = Arc::clone(&server.session);
        wait_until(move || {
            let phase = session.phase();
            async move { phase == Phase::GameOver }
        })
        .await;

        commands.send(Command::Restart).await.unwrap();
        let session = Arc::clone(&server.session);
        wait_until(move || {
            let phase = session.phase();
            async move { phase != Phase::GameOver }
        })
        .await;

        commands.send(Command::Quit).await.unwrap();
        timeout(WAIT, driver).await.unwrap().unwrap();
    }
}
