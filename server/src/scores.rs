//! Bounded score-change handoff between the simulation tick and the broadcaster
//!
//! Sending never blocks, so a slow or missing broadcaster cannot stall the
//! tick loop. What happens when the queue is full is an [`OverflowPolicy`].

use clap::ValueEnum;
use log::warn;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};

/// What a full score queue does with one more score
///
/// Either way the tick loop never waits and every lost score is counted.
/// The last score of a burst always survives `drop-oldest`; `drop-newest`
/// keeps the earliest ones instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OverflowPolicy {
    /// Keep queued scores, discard the incoming one
    #[default]
    DropNewest,
    /// Overwrite the oldest queued score
    DropOldest,
}

#[derive(Debug)]
enum SenderKind {
    Bounded(mpsc::Sender<i32>),
    Ring(broadcast::Sender<i32>),
}

#[derive(Debug)]
enum ReceiverKind {
    Bounded(mpsc::Receiver<i32>),
    Ring(broadcast::Receiver<i32>),
}

/// Producing end, owned by the game session
#[derive(Debug)]
pub struct ScoreSender {
    kind: SenderKind,
    dropped: Arc<AtomicU64>,
}

/// Consuming end, owned by the broadcaster
///
/// Shares the drop counter with its sender. Under `drop-oldest` the losses
/// are only known when the receiver notices it lagged, so they are counted
/// here rather than at send time.
#[derive(Debug)]
pub struct ScoreReceiver {
    kind: ReceiverKind,
    dropped: Arc<AtomicU64>,
}

/// Creates a score queue holding at most `capacity` pending scores.
///
/// # Panics
/// Panics if `capacity` is zero.
pub fn score_channel(capacity: usize, policy: OverflowPolicy) -> (ScoreSender, ScoreReceiver) {
    let dropped = Arc::new(AtomicU64::new(0));

    let (tx, rx) = match policy {
        OverflowPolicy::DropNewest => {
            let (tx, rx) = mpsc::channel(capacity);
            (SenderKind::Bounded(tx), ReceiverKind::Bounded(rx))
        }
        OverflowPolicy::DropOldest => {
            let (tx, rx) = broadcast::channel(capacity);
            (SenderKind::Ring(tx), ReceiverKind::Ring(rx))
        }
    };

    (
        ScoreSender {
            kind: tx,
            dropped: Arc::clone(&dropped),
        },
        ScoreReceiver { kind: rx, dropped },
    )
}

impl ScoreSender {
    /// Queues `score` without waiting. Returns false if it was discarded.
    pub fn send(&self, score: i32) -> bool {
        let accepted = match &self.kind {
            SenderKind::Bounded(tx) => match tx.try_send(score) {
                Ok(()) => true,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!("Score queue full, dropping score {}", score);
                    false
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    warn!("Score broadcaster gone, dropping score {}", score);
                    false
                }
            },
            SenderKind::Ring(tx) => {
                if tx.send(score).is_err() {
                    warn!("Score broadcaster gone, dropping score {}", score);
                    false
                } else {
                    true
                }
            }
        };

        if !accepted {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
        accepted
    }

    /// Scores lost to overflow or a missing receiver so far
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl ScoreReceiver {
    /// Waits for the next score. `None` once every sender is gone.
    pub async fn recv(&mut self) -> Option<i32> {
        match &mut self.kind {
            ReceiverKind::Bounded(rx) => rx.recv().await,
            ReceiverKind::Ring(rx) => loop {
                match rx.recv().await {
                    Ok(score) => return Some(score),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        Self::record_lag(&self.dropped, skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            },
        }
    }

    /// Takes a queued score if one is ready.
    pub fn try_recv(&mut self) -> Option<i32> {
        match &mut self.kind {
            ReceiverKind::Bounded(rx) => rx.try_recv().ok(),
            ReceiverKind::Ring(rx) => loop {
                match rx.try_recv() {
                    Ok(score) => return Some(score),
                    Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                        Self::record_lag(&self.dropped, skipped);
                    }
                    Err(_) => return None,
                }
            },
        }
    }

    /// Scores lost so far, from either end of the queue.
    ///
    /// Same counter as [`ScoreSender::dropped`]. With `drop-oldest` the
    /// count only grows once `recv` or `try_recv` runs past the overwritten
    /// scores, so it can lag behind the sender's view.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    fn record_lag(dropped: &AtomicU64, skipped: u64) {
        warn!("Score queue overflowed, {} oldest scores overwritten", skipped);
        dropped.fetch_add(skipped, Ordering::Relaxed);
    }
}
