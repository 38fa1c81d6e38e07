//! Telegram Bot API network adapter.
//!
//! Uses long polling via `getUpdates` for the push path, `getChat` for entity
//! lookups, and `getFile` for attachment downloads.
//! Docs: <https://core.telegram.org/bots/api>

mod history;
mod polling;
pub(crate) mod types;


use courier_core::{config::TelegramConfig, error::CourierError};
use history::{RecentPosts, POSTS_PER_CHAT};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use types::{TgFile, TgResponse};

/// Telegram network using the Bot API with long polling.
pub struct TelegramNetwork {
    client: reqwest::Client,
    base_url: String,
    file_base_url: String,
    /// Tracks the last update_id to avoid reprocessing.
    last_update_id: Arc<Mutex<Option<i64>>>,
    recent: Arc<Mutex<RecentPosts>>,
    poll_task: Mutex<Option<JoinHandle<()>>>,
}

impl TelegramNetwork {
    /// Create a new Telegram network from config.
    pub fn new(config: &TelegramConfig) -> Self {
        let api_base = config.api_base.trim_end_matches('/');
        Self {
            client: reqwest::Client::new(),
            base_url: format!("{api_base}/bot{}", config.bot_token),
            file_base_url: format!("{api_base}/file/bot{}", config.bot_token),
            last_update_id: Arc::new(Mutex::new(None)),
            recent: Arc::new(Mutex::new(RecentPosts::new(POSTS_PER_CHAT))),
            poll_task: Mutex::new(None),
        }
    }

    /// Call a Bot API method and unwrap its `result`.
    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        query: &[(&str, String)],
    ) -> Result<T, CourierError> {
        let url = format!("{}/{method}", self.base_url);
        let resp: TgResponse<T> = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| CourierError::Network(format!("telegram {method} failed: {e}")))?
            .json()
            .await
            .map_err(|e| CourierError::Network(format!("telegram {method} parse failed: {e}")))?;

        if !resp.ok {
            return Err(CourierError::Network(format!(
                "telegram {method} error: {}",
                resp.description.unwrap_or_default()
            )));
        }
        resp.result
            .ok_or_else(|| CourierError::Network(format!("telegram {method} returned no result")))
    }

    /// Download a file from Telegram servers by file_id.
    async fn download_file(&self, file_id: &str) -> Result<Vec<u8>, CourierError> {
        // Step 1: getFile to obtain file_path.
        let file: TgFile = self.call("getFile", &[("file_id", file_id.to_string())]).await?;
        let file_path = file
            .file_path
            .ok_or_else(|| CourierError::Network("telegram getFile returned no file_path".into()))?;

        // Step 2: Download the actual file bytes.
        let download_url = format!("{}/{file_path}", self.file_base_url);
        let resp = self
            .client
            .get(&download_url)
            .send()
            .await
            .map_err(|e| CourierError::Network(format!("telegram file download failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(CourierError::Network(format!(
                "telegram file download returned {}",
                resp.status()
            )));
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| CourierError::Network(format!("telegram file read failed: {e}")))?;
        Ok(bytes.to_vec())
    }
}
