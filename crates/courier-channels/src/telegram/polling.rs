//! Long-polling update loop and ChatNetwork trait implementation.

use super::types::{TgResponse, TgUpdate};
use super::TelegramNetwork;
use async_trait::async_trait;
use courier_core::{
    error::CourierError,
    message::{Entity, MessageHandle, NetworkEvent, PeerRef, RawMessage},
    traits::ChatNetwork,
};
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Long-poll timeout passed to `getUpdates`.
const LONG_POLL_SECS: u64 = 30;

#[async_trait]
impl ChatNetwork for TelegramNetwork {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn connect(&self) -> Result<(), CourierError> {
        #[derive(Deserialize)]
        struct TgMe {
            id: i64,
            username: Option<String>,
        }

        let me: TgMe = self.call("getMe", &[]).await?;
        info!(
            "telegram connected as {} ({})",
            me.username.as_deref().unwrap_or("<no username>"),
            me.id
        );
        Ok(())
    }

    async fn subscribe(&self) -> Result<mpsc::Receiver<NetworkEvent>, CourierError> {
        let mut task = self.poll_task.lock().await;
        if task.is_some() {
            return Err(CourierError::Network(
                "telegram subscription already active".into(),
            ));
        }

        let (tx, rx) = mpsc::channel(64);
        let client = self.client.clone();
        let base_url = self.base_url.clone();
        let last_update_id = self.last_update_id.clone();
        let recent = self.recent.clone();

        info!("Telegram network starting long polling...");

        *task = Some(tokio::spawn(async move {
            let mut backoff_secs: u64 = 1;

            loop {
                let last = last_update_id.lock().await;
                let offset = last.map(|id| id + 1);
                drop(last);

                let mut query = vec![
                    ("timeout", LONG_POLL_SECS.to_string()),
                    (
                        "allowed_updates",
                        r#"["message","channel_post"]"#.to_string(),
                    ),
                ];
                if let Some(off) = offset {
                    query.push(("offset", off.to_string()));
                }

                let resp = match client
                    .get(format!("{base_url}/getUpdates"))
                    .query(&query)
                    .timeout(Duration::from_secs(LONG_POLL_SECS + 5))
                    .send()
                    .await
                {
                    Ok(r) => r,
                    Err(e) => {
                        error!("telegram poll error (retry in {backoff_secs}s): {e}");
                        tokio::time::sleep(Duration::from_secs(backoff_secs)).await;
                        backoff_secs = (backoff_secs * 2).min(60);
                        continue;
                    }
                };

                let body: TgResponse<Vec<TgUpdate>> = match resp.json().await {
                    Ok(b) => b,
                    Err(e) => {
                        error!("telegram parse error (retry in {backoff_secs}s): {e}");
                        tokio::time::sleep(Duration::from_secs(backoff_secs)).await;
                        backoff_secs = (backoff_secs * 2).min(60);
                        continue;
                    }
                };

                if !body.ok {
                    error!(
                        "telegram API error (retry in {backoff_secs}s): {}",
                        body.description.unwrap_or_default()
                    );
                    tokio::time::sleep(Duration::from_secs(backoff_secs)).await;
                    backoff_secs = (backoff_secs * 2).min(60);
                    continue;
                }

                // Successful poll -- reset backoff.
                backoff_secs = 1;

                let updates = body.result.unwrap_or_default();

                if let Some(last_update) = updates.last() {
                    *last_update_id.lock().await = Some(last_update.update_id);
                }

                for update in updates {
                    let update_id = update.update_id;
                    let Some(msg) = update.into_message() else {
                        debug!("telegram: skipping update {update_id} without a message");
                        continue;
                    };

                    let (raw, chat) = msg.into_raw();
                    recent.lock().await.record(&raw, &chat);

                    let event = NetworkEvent::NewMessage {
                        message: raw,
                        chat: Some(chat),
                    };
                    if tx.send(event).await.is_err() {
                        info!("telegram subscriber dropped, stopping poll");
                        return;
                    }
                }
            }
        }));

        Ok(rx)
    }

    async fn get_entity(&self, peer: &PeerRef) -> Result<Entity, CourierError> {
        #[derive(Deserialize)]
        struct TgChatFull {
            id: i64,
            title: Option<String>,
            username: Option<String>,
        }

        let chat: TgChatFull = self.call("getChat", &[("chat_id", peer.raw_id())]).await?;
        Ok(Entity {
            username: chat.username,
            title: chat.title,
            id: Some(chat.id.to_string()),
        })
    }

    async fn recent_messages(
        &self,
        selector: &str,
        limit: usize,
    ) -> Result<Vec<RawMessage>, CourierError> {
        Ok(self.recent.lock().await.latest(selector, limit))
    }

    async fn download_attachment(&self, handle: &MessageHandle) -> Result<Vec<u8>, CourierError> {
        if handle.as_str().is_empty() {
            return Err(CourierError::Network("empty attachment handle".into()));
        }
        self.download_file(handle.as_str()).await
    }

    async fn stop(&self) -> Result<(), CourierError> {
        match self.poll_task.lock().await.take() {
            Some(task) => {
                task.abort();
                info!("Telegram network stopped");
            }
            None => warn!("telegram stop called without an active subscription"),
        }
        Ok(())
    }
}
