//! Single consumer of the acquisition queue.
//!
//! Owns the dedup cache. Steps run one at a time, so the two acquisition
//! paths can never race on cache membership.

use super::dedup::DedupCache;
use super::forwarder::{DeliveryOutcome, Forwarder};
use super::resolver::{resolve, Resolution};
use super::{Acquired, RelayStats};
use chrono::Utc;
use courier_core::{
    message::{DedupKey, NormalizedMessage},
    traits::ChatNetwork,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// What a single pipeline step did with its input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum StepOutcome {
    Duplicate,
    Unidentified,
    Forwarded(DeliveryOutcome),
}

pub(crate) struct Pipeline {
    network: Arc<dyn ChatNetwork>,
    dedup: DedupCache,
    forwarder: Forwarder,
    stats: RelayStats,
}

impl Pipeline {
    pub fn new(network: Arc<dyn ChatNetwork>, dedup: DedupCache, forwarder: Forwarder) -> Self {
        Self {
            network,
            dedup,
            forwarder,
            stats: RelayStats::default(),
        }
    }

    /// Drain the queue until every producer has dropped its sender.
    pub async fn run(mut self, mut rx: mpsc::Receiver<Acquired>) -> RelayStats {
        while let Some(item) = rx.recv().await {
            self.step(item).await;
        }
        info!(
            "pipeline drained ({} of {} dedup slots in use)",
            self.dedup.len(),
            self.dedup.capacity()
        );
        self.stats
    }

    pub async fn step(&mut self, item: Acquired) -> StepOutcome {
        let key = DedupKey::for_message(&item.message);
        if !self.dedup.should_process(&key) {
            debug!("duplicate {key} via {:?} path, skipping", item.source);
            self.stats.duplicates += 1;
            return StepOutcome::Duplicate;
        }
        self.stats.accepted += 1;

        let resolution = resolve(&*self.network, &item.message, item.chat.as_ref()).await;
        let entity = match resolution {
            Resolution::Complete(entity) => entity,
            Resolution::Partial { entity, reason } => {
                debug!("partial identity for {key}: {reason}");
                entity
            }
            Resolution::Unidentified { reason } => {
                warn!("dropping unidentifiable message {key}: {reason}");
                self.stats.unidentified += 1;
                return StepOutcome::Unidentified;
            }
        };

        let message = NormalizedMessage::from_raw(item.message, entity, Utc::now());
        let outcome = self.forwarder.forward(&message).await;
        match &outcome {
            DeliveryOutcome::Delivered { .. } => self.stats.delivered += 1,
            DeliveryOutcome::Unrouted => self.stats.unrouted += 1,
            DeliveryOutcome::Failed { .. } => self.stats.failed += 1,
        }
        StepOutcome::Forwarded(outcome)
    }
}
