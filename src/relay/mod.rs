//! Relay: dual-path acquisition feeding one dedup/resolve/forward pipeline.
//!
//! The event subscription and the round-robin poller are producers on a
//! single queue; one consumer task owns the dedup cache and runs each
//! pipeline step to completion before taking the next.

mod dedup;
mod forwarder;
mod matcher;
mod payload;
mod pipeline;
mod poller;
mod resolver;

#[cfg(test)]
mod fake;

use courier_core::{
    config::{Config, ForwardConfig, RouteMapping},
    message::{Entity, NetworkEvent, RawMessage},
    traits::ChatNetwork,
};
use dedup::DedupCache;
use forwarder::Forwarder;
use pipeline::Pipeline;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

/// Queue depth between the producers and the pipeline consumer.
const QUEUE_DEPTH: usize = 256;

/// Which acquisition path produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Source {
    Event,
    Poll,
}

/// A raw message on its way into the pipeline.
#[derive(Debug, Clone)]
pub(crate) struct Acquired {
    pub message: RawMessage,
    /// Chat object, only available on the event path.
    pub chat: Option<Entity>,
    pub source: Source,
}

impl Acquired {
    pub fn from_event(event: NetworkEvent) -> Self {
        let (message, chat) = event.into_parts();
        Self {
            message,
            chat,
            source: Source::Event,
        }
    }

    pub fn polled(message: RawMessage) -> Self {
        Self {
            message,
            chat: None,
            source: Source::Poll,
        }
    }
}

/// Lifecycle of the acquisition subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquisitionState {
    Disconnected,
    Connecting,
    Subscribed,
    PollingSubscribed,
    Stopped,
}

/// Per-run counters, logged on shutdown.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelayStats {
    pub accepted: u64,
    pub duplicates: u64,
    pub unidentified: u64,
    pub unrouted: u64,
    pub delivered: u64,
    pub failed: u64,
}

impl fmt::Display for RelayStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "accepted={} duplicates={} unidentified={} unrouted={} delivered={} failed={}",
            self.accepted,
            self.duplicates,
            self.unidentified,
            self.unrouted,
            self.delivered,
            self.failed
        )
    }
}

/// The relay: owns the network handle and the pipeline configuration.
pub struct Relay {
    network: Arc<dyn ChatNetwork>,
    routes: Vec<RouteMapping>,
    forward: ForwardConfig,
    poll_channels: Vec<String>,
    poll_period: Duration,
    dedup_capacity: usize,
    state: watch::Sender<AcquisitionState>,
}

impl Relay {
    pub fn new(network: Arc<dyn ChatNetwork>, config: &Config) -> Self {
        let (state, _) = watch::channel(AcquisitionState::Disconnected);
        Self {
            network,
            routes: config.routes.clone(),
            forward: config.forward.clone(),
            poll_channels: config.poll.channels.clone(),
            poll_period: Duration::from_secs(config.poll.interval_secs.max(1)),
            dedup_capacity: config.dedup.capacity,
            state,
        }
    }

    /// Observe acquisition state transitions.
    pub fn subscribe_state(&self) -> watch::Receiver<AcquisitionState> {
        self.state.subscribe()
    }

    fn set_state(&self, state: AcquisitionState) {
        info!("acquisition state: {state:?}");
        self.state.send_replace(state);
    }

    /// Run until `shutdown` resolves or the network subscription closes.
    ///
    /// Only connect/subscribe failures are returned as errors; everything
    /// after that is logged and absorbed by the pipeline.
    pub async fn run<F>(self, shutdown: F) -> anyhow::Result<RelayStats>
    where
        F: Future<Output = ()>,
    {
        info!(
            "Courier relay starting | network: {} | routes: {} | poll channels: {}",
            self.network.name(),
            self.routes.len(),
            self.poll_channels.len()
        );

        self.set_state(AcquisitionState::Connecting);
        if let Err(e) = self.network.connect().await {
            self.set_state(AcquisitionState::Disconnected);
            anyhow::bail!("failed to connect to {}: {e}", self.network.name());
        }

        let mut events = match self.network.subscribe().await {
            Ok(rx) => rx,
            Err(e) => {
                self.set_state(AcquisitionState::Disconnected);
                anyhow::bail!("failed to subscribe to {}: {e}", self.network.name());
            }
        };
        self.set_state(AcquisitionState::Subscribed);

        let (tx, rx) = mpsc::channel::<Acquired>(QUEUE_DEPTH);

        let event_tx = tx.clone();
        let event_handle = tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                if event_tx.send(Acquired::from_event(event)).await.is_err() {
                    info!("pipeline queue closed, stopping event forwarder");
                    return;
                }
            }
            warn!("network subscription closed");
        });

        let poll_handle = if self.poll_channels.is_empty() {
            None
        } else {
            let handle = tokio::spawn(poller::poll_loop(
                self.network.clone(),
                self.poll_channels.clone(),
                self.poll_period,
                tx.clone(),
            ));
            self.set_state(AcquisitionState::PollingSubscribed);
            Some(handle)
        };

        drop(tx);

        let forwarder = Forwarder::new(
            self.network.clone(),
            self.routes.clone(),
            self.forward.clone(),
        );
        let pipeline = Pipeline::new(
            self.network.clone(),
            DedupCache::new(self.dedup_capacity),
            forwarder,
        );
        let mut consumer = tokio::spawn(pipeline.run(rx));

        let finished = tokio::select! {
            _ = shutdown => {
                info!("Received shutdown signal");
                None
            }
            stats = &mut consumer => Some(stats),
        };

        // Stop producers; the consumer drains what is already queued.
        if let Some(handle) = &poll_handle {
            handle.abort();
        }
        if let Err(e) = self.network.stop().await {
            warn!("error stopping {}: {e}", self.network.name());
        }
        event_handle.abort();

        let stats = match finished {
            Some(stats) => stats?,
            None => consumer.await?,
        };

        self.set_state(AcquisitionState::Stopped);
        info!("Courier relay stopped | {stats}");
        Ok(stats)
    }
}
