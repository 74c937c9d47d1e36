//! Fans score changes out to every registered connection

use crate::client_manager::SharedRegistry;
use crate::scores::ScoreReceiver;
use crate::shutdown::Shutdown;
use log::{debug, info};
use shared::encode_score;
use std::time::Duration;
use tokio::time::timeout;

/// How long the broadcaster keeps listening for late scores after quit.
/// A tick that was already running when quit arrived may still emit one.
pub const DRAIN_GRACE: Duration = Duration::from_millis(50);

/// Runs until shutdown or until the score sender is gone.
///
/// Scores already queued when shutdown is signalled, or sent within
/// [`DRAIN_GRACE`] of it, are still delivered. Only then is the registry
/// closed, which lets every connection's writer flush and hang up. Returns
/// how many scores were broadcast.
pub async fn run_score_broadcaster(
    mut scores: ScoreReceiver,
    registry: SharedRegistry,
    shutdown: Shutdown,
) -> usize {
    let mut broadcast = 0;

    loop {
        tokio::select! {
            biased;

            score = scores.recv() => match score {
                Some(score) => {
                    deliver(&registry, score).await;
                    broadcast += 1;
                }
                None => {
                    debug!("Score sender dropped");
                    break;
                }
            },

            _ = shutdown.wait() => {
                broadcast += drain(&mut scores, &registry).await;
                break;
            }
        }
    }

    registry.write().await.close();

    info!(
        "Score broadcaster stopped after {} updates ({} dropped)",
        broadcast,
        scores.dropped()
    );
    broadcast
}

async fn drain(scores: &mut ScoreReceiver, registry: &SharedRegistry) -> usize {
    let mut delivered = 0;

    loop {
        while let Some(score) = scores.try_recv() {
            deliver(registry, score).await;
            delivered += 1;
        }

        match timeout(DRAIN_GRACE, scores.recv()).await {
            Ok(Some(score)) => {
                deliver(registry, score).await;
                delivered += 1;
            }
            Ok(None) | Err(_) => break,
        }
    }

    if delivered > 0 {
        debug!("Delivered {} scores after quit", delivered);
    }
    delivered
}

async fn deliver(registry: &SharedRegistry, score: i32) {
    let report = registry.write().await.broadcast(encode_score(score));
    debug!("Score {} sent to {} clients", score, report.delivered);
}
