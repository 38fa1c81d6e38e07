use serde::{Deserialize, Serialize};

use super::defaults::default_api_base;

/// Static pairing of a channel selector to a webhook.
///
/// The selector is a username (with or without `@`), a channel title, or a
/// numeric channel id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteMapping {
    pub selector: String,
    pub webhook_url: String,
}

/// Telegram account config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Bot API token. `COURIER_BOT_TOKEN` overrides the file value.
    #[serde(default)]
    pub bot_token: String,
    /// Bot API base URL, overridable for self-hosted API servers.
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Account-holder phone number for a user-account (MTProto) client.
    /// The Bot API adapter does not use it; `courier check` only reports it.
    #[serde(default)]
    pub phone: Option<String>,
    /// Session label for a user-account (MTProto) client.
    /// The Bot API adapter does not use it; `courier check` only reports it.
    #[serde(default)]
    pub session: Option<String>,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            api_base: default_api_base(),
            phone: None,
            session: None,
        }
    }
}
