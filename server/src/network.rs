//! TCP transport: accept clients, read command frames, write score frames

use crate::client_manager::{ConnectionId, SharedRegistry};
use crate::game::GameSession;
use crate::shutdown::Shutdown;
use crate::ServerError;
use log::{debug, error, info, warn};
use shared::{Command, Frame, FRAME_LEN};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::timeout;

/// Upper bound on waiting for connections to flush after shutdown
pub const CONNECTION_DRAIN: Duration = Duration::from_secs(2);

/// Why a connection's read loop ended
#[derive(Debug, PartialEq, Eq)]
pub enum Disconnect {
    Closed,
    ReadFailed(io::ErrorKind),
    Shutdown,
}

pub struct Server {
    listener: TcpListener,
    session: Arc<GameSession>,
    registry: SharedRegistry,
}

impl Server {
    pub async fn bind(
        addr: &str,
        session: Arc<GameSession>,
        registry: SharedRegistry,
    ) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.to_string(),
                source,
            })?;
        info!("Server listening on {}", addr);

        Ok(Server {
            listener,
            session,
            registry,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts connections until the session's shutdown signal fires, then
    /// waits up to [`CONNECTION_DRAIN`] for every connection to flush its
    /// last frames and close.
    pub async fn run(self) {
        let shutdown = self.session.shutdown_signal().clone();
        let mut connections = JoinSet::new();

        loop {
            tokio::select! {
                _ = shutdown.wait() => break,

                accepted = self.listener.accept() => match accepted {
                    Ok((stream, addr)) => {
                        let session = Arc::clone(&self.session);
                        let registry = Arc::clone(&self.registry);
                        connections.spawn(handle_connection(stream, addr, session, registry));
                    }
                    Err(e) => error!("Error accepting connection: {}", e),
                },

                // Reap finished connections so the set does not grow forever
                Some(finished) = connections.join_next(), if !connections.is_empty() => {
                    if let Err(e) = finished {
                        error!("Connection task failed: {}", e);
                    }
                }
            }
        }

        info!("Server stopped accepting connections");
        drop(self.listener);

        let pending = connections.len();
        let drained = timeout(CONNECTION_DRAIN, async {
            while let Some(finished) = connections.join_next().await {
                if let Err(e) = finished {
                    error!("Connection task failed: {}", e);
                }
            }
        })
        .await;

        match drained {
            Ok(()) => debug!("All {} connections closed", pending),
            Err(_) => {
                warn!(
                    "{} connections still open after {:?}, aborting",
                    connections.len(),
                    CONNECTION_DRAIN
                );
                connections.shutdown().await;
            }
        }
    }
}

/// Registers a TCP client, then serves it until it disconnects.
///
/// On EOF or a read error the connection is unregistered at once. On
/// shutdown the registry entry is left for the broadcaster, which closes it
/// after the final scores are out. Either way this returns only after the
/// writer task has flushed and closed the socket.
pub async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    session: Arc<GameSession>,
    registry: SharedRegistry,
) {
    if let Err(e) = stream.set_nodelay(true) {
        debug!("Could not disable Nagle for {}: {}", addr, e);
    }

    let (frames_tx, frames_rx) = mpsc::unbounded_channel();
    let id = match registry.write().await.register(addr, frames_tx) {
        Some(id) => id,
        None => return,
    };

    let (reader, writer) = stream.into_split();
    let writer = tokio::spawn(write_frames(writer, frames_rx, id));

    let shutdown = session.shutdown_signal().clone();
    let reason = serve_connection(reader, id, &session, &shutdown).await;
    debug!("Client {} read loop ended: {:?}", id, reason);

    if reason != Disconnect::Shutdown {
        registry.write().await.unregister(id);
    }

    if let Err(e) = writer.await {
        error!("Writer for client {} failed: {}", id, e);
    }
}

/// Reads 4-byte command frames and applies them to the session.
///
/// Unknown codes are skipped and the connection stays open. Returns on EOF,
/// on a read error, or when shutdown is signalled.
pub async fn serve_connection<R: AsyncRead + Unpin>(
    mut reader: R,
    id: ConnectionId,
    session: &GameSession,
    shutdown: &Shutdown,
) -> Disconnect {
    let mut frame: Frame = [0; FRAME_LEN];

    loop {
        let read = tokio::select! {
            _ = shutdown.wait() => return Disconnect::Shutdown,
            read = reader.read_exact(&mut frame) => read,
        };

        match read {
            Ok(_) => match Command::decode(frame) {
                Some(command) => {
                    let (sequence, outcome) = session.apply_command_numbered(command);
                    debug!("Client {} command #{}: {:?}", id, sequence, outcome);
                }
                None => debug!(
                    "Client {} sent unknown code {:#x}",
                    id,
                    u32::from_be_bytes(frame)
                ),
            },
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Disconnect::Closed,
            Err(e) => {
                warn!("Error reading from client {}: {}", id, e);
                return Disconnect::ReadFailed(e.kind());
            }
        }
    }
}

/// Drains a connection's sink onto the socket until the sink is dropped or a
/// write fails. A failed write closes the sink, so the next broadcast drops
/// this connection from the registry.
pub async fn write_frames<W: AsyncWrite + Unpin>(
    mut writer: W,
    mut frames: mpsc::UnboundedReceiver<Frame>,
    id: ConnectionId,
) {
    while let Some(frame) = frames.recv().await {
        if let Err(e) = writer.write_all(&frame).await {
            warn!("Failed to write to client {}: {}", id, e);
            break;
        }
    }
    let _ = writer.shutdown().await;
}
