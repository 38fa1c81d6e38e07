use crate::{
    error::CourierError,
    message::{Entity, MessageHandle, NetworkEvent, PeerRef, RawMessage},
};
use async_trait::async_trait;

/// Chat network trait: the account the relay reads from.
///
/// Every network client (Telegram Bot API, user-account sessions, test
/// fakes) implements this narrow surface. The relay never touches the
/// client's wire protocol directly.
#[async_trait]
pub trait ChatNetwork: Send + Sync {
    /// Human-readable network name.
    fn name(&self) -> &str;

    /// Establish the session. Failure here is fatal for the relay.
    async fn connect(&self) -> Result<(), CourierError>;

    /// Register for push notifications of new messages and raw updates.
    /// Returns a receiver that yields network events until `stop` is called.
    async fn subscribe(&self) -> Result<tokio::sync::mpsc::Receiver<NetworkEvent>, CourierError>;

    /// Look up identity metadata for a peer.
    async fn get_entity(&self, peer: &PeerRef) -> Result<Entity, CourierError>;

    /// Fetch the most recent messages of a channel, newest first.
    async fn recent_messages(
        &self,
        selector: &str,
        limit: usize,
    ) -> Result<Vec<RawMessage>, CourierError>;

    /// Download the attachment behind a message handle.
    async fn download_attachment(&self, handle: &MessageHandle) -> Result<Vec<u8>, CourierError>;

    /// Close the subscription. In-flight calls are allowed to finish.
    async fn stop(&self) -> Result<(), CourierError>;
}
