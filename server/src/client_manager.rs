//! Registry of connected clients eligible for score broadcasts
//!
//! This module tracks the output side of every live connection:
//! - Connection lifecycle (register on accept, unregister on EOF or error,
//!   close everything once the last scores have gone out at shutdown)
//! - Capacity limits for concurrent connections
//! - Fan-out of 4-byte frames with per-connection failure isolation
//!
//! The registry never touches the game session. It is purely an observer
//! set: clients receive score frames, and any client may steer the snake
//! through the session independently of its registry entry.

use log::{debug, info, warn};
use shared::Frame;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, RwLock};

pub type ConnectionId = u32;

/// Output sink of one connection, drained by that connection's writer task
pub type FrameSink = mpsc::UnboundedSender<Frame>;

pub type SharedRegistry = Arc<RwLock<ConnectionRegistry>>;

/// A registered connection and its output sink
#[derive(Debug)]
pub struct Connection {
    /// Unique identifier assigned by the registry
    pub id: ConnectionId,
    /// Peer address, for logging
    pub addr: SocketAddr,
    /// When the connection was accepted
    pub connected_at: Instant,
    sink: FrameSink,
}

impl Connection {
    /// Hands a frame to the writer task. Fails once the writer has exited.
    fn deliver(&self, frame: Frame) -> bool {
        self.sink.send(frame).is_ok()
    }
}

/// Outcome of a broadcast across all registered connections
#[derive(Debug, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub removed: Vec<ConnectionId>,
}

/// Tracks every live output sink
///
/// Connection IDs start from 1 and are never reused within a process.
pub struct ConnectionRegistry {
    connections: HashMap<ConnectionId, Connection>,
    next_connection_id: ConnectionId,
    max_connections: usize,
    closed: bool,
}

impl ConnectionRegistry {
    pub fn new(max_connections: usize) -> Self {
        Self {
            connections: HashMap::new(),
            next_connection_id: 1,
            max_connections,
            closed: false,
        }
    }

    pub fn shared(max_connections: usize) -> SharedRegistry {
        Arc::new(RwLock::new(Self::new(max_connections)))
    }

    /// Adds a connection's sink
    ///
    /// Returns `None` when the registry is at capacity or already closed;
    /// the caller should close the connection.
    pub fn register(&mut self, addr: SocketAddr, sink: FrameSink) -> Option<ConnectionId> {
        if self.closed {
            debug!("Rejecting {}: shutting down", addr);
            return None;
        }
        if self.connections.len() >= self.max_connections {
            warn!("Rejecting {}: {} connections open", addr, self.connections.len());
            return None;
        }

        let id = self.next_connection_id;
        self.next_connection_id += 1;

        self.connections.insert(
            id,
            Connection {
                id,
                addr,
                connected_at: Instant::now(),
                sink,
            },
        );
        info!("Client {} connected from {}", id, addr);

        Some(id)
    }

    /// Removes a connection. Returns false if it was already gone.
    pub fn unregister(&mut self, id: ConnectionId) -> bool {
        if let Some(connection) = self.connections.remove(&id) {
            info!(
                "Client {} disconnected after {:.1}s",
                id,
                connection.connected_at.elapsed().as_secs_f32()
            );
            true
        } else {
            false
        }
    }

    /// Sends `frame` to every connection
    ///
    /// A sink that can no longer accept frames is dropped from the registry;
    /// delivery to the remaining connections continues regardless.
    pub fn broadcast(&mut self, frame: Frame) -> BroadcastReport {
        let mut report = BroadcastReport::default();

        for connection in self.connections.values() {
            if connection.deliver(frame) {
                report.delivered += 1;
            } else {
                report.removed.push(connection.id);
            }
        }

        for id in &report.removed {
            if let Some(connection) = self.connections.remove(id) {
                warn!("Dropping client {} ({}): writer closed", id, connection.addr);
            }
        }

        debug!(
            "Broadcast {:?} to {} clients ({} removed)",
            frame,
            report.delivered,
            report.removed.len()
        );
        report
    }

    /// Drops every sink and refuses further registrations.
    ///
    /// Writer tasks finish flushing what they already hold and then close
    /// their sockets. Called by the broadcaster once its final scores are
    /// out, so connections are not torn down while a score is pending.
    pub fn close(&mut self) -> usize {
        self.closed = true;
        let count = self.connections.len();
        self.connections.clear();
        info!("Closed {} client connections", count);
        count
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.connections.contains_key(&id)
    }

    pub fn addrs(&self) -> Vec<(ConnectionId, SocketAddr)> {
        self.connections
            .values()
            .map(|connection| (connection.id, connection.addr))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
