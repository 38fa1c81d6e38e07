//! Round-robin poll path.
//!
//! One channel per tick, newest message only. Multiple posts landing in one
//! channel within a full cycle are left to the event path.

use super::Acquired;
use courier_core::traits::ChatNetwork;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant};
use tracing::{debug, info};

/// Cycles through the configured channel selectors.
pub(crate) struct RoundRobin {
    channels: Vec<String>,
    next: usize,
}

impl RoundRobin {
    pub fn new(channels: Vec<String>) -> Self {
        Self { channels, next: 0 }
    }

    /// The selector to check on this tick, or `None` for an empty list.
    pub fn advance(&mut self) -> Option<&str> {
        if self.channels.is_empty() {
            return None;
        }
        let index = self.next;
        self.next = (self.next + 1) % self.channels.len();
        Some(&self.channels[index])
    }
}

/// Fetch the newest message of one channel per tick and queue it.
///
/// Returns when the pipeline queue closes. A tick that fires while the
/// previous fetch is still outstanding waits behind it.
pub(crate) async fn poll_loop(
    network: Arc<dyn ChatNetwork>,
    channels: Vec<String>,
    period: Duration,
    tx: mpsc::Sender<Acquired>,
) {
    let mut rotation = RoundRobin::new(channels);
    let mut ticker = interval_at(Instant::now() + period, period);

    loop {
        ticker.tick().await;

        let Some(selector) = rotation.advance() else {
            return;
        };

        let latest = match network.recent_messages(selector, 1).await {
            Ok(messages) => messages.into_iter().next(),
            Err(e) => {
                debug!("poll of {selector} failed: {e}");
                continue;
            }
        };

        let Some(message) = latest else {
            continue;
        };

        if tx.send(Acquired::polled(message)).await.is_err() {
            info!("pipeline queue closed, stopping poller");
            return;
        }
    }
}
