//! In-memory chat network for relay tests.

use async_trait::async_trait;
use courier_core::{
    error::CourierError,
    message::{Entity, MessageHandle, NetworkEvent, PeerRef, RawMessage},
    traits::ChatNetwork,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::mpsc;

pub(crate) struct FakeNetwork {
    entities: HashMap<PeerRef, Entity>,
    recent: HashMap<String, Vec<RawMessage>>,
    attachments: HashMap<String, Vec<u8>>,
    fail_connect: bool,
    events_tx: Mutex<Option<mpsc::Sender<NetworkEvent>>>,
    events_rx: Mutex<Option<mpsc::Receiver<NetworkEvent>>>,
    entity_lookups: AtomicUsize,
    history_calls: AtomicUsize,
    downloads: AtomicUsize,
    stopped: AtomicBool,
}

impl FakeNetwork {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel(64);
        Self {
            entities: HashMap::new(),
            recent: HashMap::new(),
            attachments: HashMap::new(),
            fail_connect: false,
            events_tx: Mutex::new(Some(tx)),
            events_rx: Mutex::new(Some(rx)),
            entity_lookups: AtomicUsize::new(0),
            history_calls: AtomicUsize::new(0),
            downloads: AtomicUsize::new(0),
            stopped: AtomicBool::new(false),
        }
    }

    pub fn with_entity(mut self, peer: PeerRef, entity: Entity) -> Self {
        self.entities.insert(peer, entity);
        self
    }

    pub fn with_recent(mut self, selector: &str, messages: Vec<RawMessage>) -> Self {
        self.recent.insert(selector.to_string(), messages);
        self
    }

    pub fn with_attachment(mut self, handle: &str, bytes: Vec<u8>) -> Self {
        self.attachments.insert(handle.to_string(), bytes);
        self
    }

    pub fn failing_connect(mut self) -> Self {
        self.fail_connect = true;
        self
    }

    /// Sender side of the push subscription.
    pub fn events(&self) -> mpsc::Sender<NetworkEvent> {
        self.events_tx
            .lock()
            .unwrap()
            .clone()
            .expect("fake network already stopped")
    }

    pub fn entity_lookups(&self) -> usize {
        self.entity_lookups.load(Ordering::SeqCst)
    }

    pub fn history_calls(&self) -> usize {
        self.history_calls.load(Ordering::SeqCst)
    }

    pub fn downloads(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatNetwork for FakeNetwork {
    fn name(&self) -> &str {
        "fake"
    }

    async fn connect(&self) -> Result<(), CourierError> {
        if self.fail_connect {
            return Err(CourierError::Network("connection refused".into()));
        }
        Ok(())
    }

    async fn subscribe(&self) -> Result<mpsc::Receiver<NetworkEvent>, CourierError> {
        self.events_rx
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| CourierError::Network("already subscribed".into()))
    }

    async fn get_entity(&self, peer: &PeerRef) -> Result<Entity, CourierError> {
        self.entity_lookups.fetch_add(1, Ordering::SeqCst);
        self.entities
            .get(peer)
            .cloned()
            .ok_or_else(|| CourierError::Network(format!("no entity for {peer}")))
    }

    async fn recent_messages(
        &self,
        selector: &str,
        limit: usize,
    ) -> Result<Vec<RawMessage>, CourierError> {
        self.history_calls.fetch_add(1, Ordering::SeqCst);
        match self.recent.get(selector) {
            Some(messages) => Ok(messages.iter().take(limit).cloned().collect()),
            None => Err(CourierError::Network(format!("unknown channel {selector}"))),
        }
    }

    async fn download_attachment(&self, handle: &MessageHandle) -> Result<Vec<u8>, CourierError> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        self.attachments
            .get(handle.as_str())
            .cloned()
            .ok_or_else(|| CourierError::Network(format!("no file {}", handle.as_str())))
    }

    async fn stop(&self) -> Result<(), CourierError> {
        self.stopped.store(true, Ordering::SeqCst);
        self.events_tx.lock().unwrap().take();
        Ok(())
    }
}
