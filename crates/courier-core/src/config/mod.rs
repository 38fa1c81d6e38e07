mod defaults;
mod routes;

#[cfg(test)]
mod tests;

pub use routes::*;

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::CourierError;
use defaults::*;

/// Appended to embed descriptions that were cut short.
pub const TRUNCATION_MARKER: &str = "… (truncated)";

/// Environment variable that overrides `telegram.bot_token`.
pub const BOT_TOKEN_ENV: &str = "COURIER_BOT_TOKEN";

/// Top-level Courier configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub courier: CourierConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub routes: Vec<RouteMapping>,
    #[serde(default)]
    pub poll: PollConfig,
    #[serde(default)]
    pub dedup: DedupConfig,
    #[serde(default)]
    pub forward: ForwardConfig,
}

/// General process settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourierConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Directory for daily-rolling log files. Unset = stdout only.
    #[serde(default)]
    pub log_dir: Option<String>,
}

impl Default for CourierConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            log_level: default_log_level(),
            log_dir: None,
        }
    }
}

/// Poll path -- round-robin over a channel list, one channel per tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollConfig {
    /// Channel selectors to poll. Empty = event path only.
    #[serde(default)]
    pub channels: Vec<String>,
    #[serde(default = "default_poll_interval")]
    pub interval_secs: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            channels: Vec::new(),
            interval_secs: default_poll_interval(),
        }
    }
}

/// Dedup cache sizing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DedupConfig {
    #[serde(default = "default_dedup_capacity")]
    pub capacity: usize,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            capacity: default_dedup_capacity(),
        }
    }
}

/// Webhook payload limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForwardConfig {
    /// Documents reported above this size are not downloaded.
    #[serde(default = "default_max_document_bytes")]
    pub max_document_bytes: u64,
    /// Upper bound on a multipart request body.
    #[serde(default = "default_max_request_bytes")]
    pub max_request_bytes: u64,
    #[serde(default = "default_max_description_chars")]
    pub max_description_chars: usize,
    #[serde(default = "default_embed_color")]
    pub embed_color: u32,
}

impl Default for ForwardConfig {
    fn default() -> Self {
        Self {
            max_document_bytes: default_max_document_bytes(),
            max_request_bytes: default_max_request_bytes(),
            max_description_chars: default_max_description_chars(),
            embed_color: default_embed_color(),
        }
    }
}

impl Config {
    /// Reject configurations the relay cannot run with.
    pub fn validate(&self) -> Result<(), CourierError> {
        if self.telegram.bot_token.trim().is_empty() {
            return Err(CourierError::Config(format!(
                "telegram.bot_token is empty (set it in the config file or {BOT_TOKEN_ENV})"
            )));
        }
        if self.routes.is_empty() {
            return Err(CourierError::Config(
                "no routes configured; add at least one [[routes]] entry".into(),
            ));
        }
        for (i, route) in self.routes.iter().enumerate() {
            if route.selector.trim().is_empty() {
                return Err(CourierError::Config(format!(
                    "routes[{i}]: selector is empty"
                )));
            }
            let url = route.webhook_url.trim();
            if !(url.starts_with("https://") || url.starts_with("http://")) {
                return Err(CourierError::Config(format!(
                    "routes[{i}] ({}): webhook_url must be an http(s) URL, got '{url}'",
                    route.selector
                )));
            }
        }
        if self.dedup.capacity == 0 {
            return Err(CourierError::Config("dedup.capacity must be > 0".into()));
        }
        if self.poll.interval_secs == 0 {
            return Err(CourierError::Config(
                "poll.interval_secs must be > 0".into(),
            ));
        }
        let marker_len = TRUNCATION_MARKER.chars().count();
        if self.forward.max_description_chars < marker_len {
            return Err(CourierError::Config(format!(
                "forward.max_description_chars must be at least {marker_len}"
            )));
        }
        if self.poll.channels.iter().any(|c| c.trim().is_empty()) {
            return Err(CourierError::Config(
                "poll.channels contains an empty selector".into(),
            ));
        }
        Ok(())
    }

    /// Apply environment overrides on top of the file values.
    pub fn apply_env(&mut self) {
        if let Ok(token) = std::env::var(BOT_TOKEN_ENV) {
            if !token.trim().is_empty() {
                self.telegram.bot_token = token;
            }
        }
    }
}

/// Expand `~` to home directory.
pub fn shellexpand(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            return format!("{}/{rest}", home.to_string_lossy());
        }
    }
    path.to_string()
}

/// Parse configuration from TOML text.
pub fn parse(content: &str) -> Result<Config, CourierError> {
    toml::from_str(content).map_err(|e| CourierError::Config(format!("failed to parse config: {e}")))
}

/// Load configuration from a TOML file and apply environment overrides.
///
/// A missing file is an error: without routes nothing can be relayed.
pub fn load(path: &str) -> Result<Config, CourierError> {
    let path = Path::new(path);
    if !path.exists() {
        return Err(CourierError::Config(format!(
            "config file not found at {}",
            path.display()
        )));
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| CourierError::Config(format!("failed to read {}: {}", path.display(), e)))?;

    let mut config = parse(&content)?;
    config.apply_env();
    tracing::debug!(
        "loaded config from {} ({} routes, {} poll channels)",
        path.display(),
        config.routes.len(),
        config.poll.channels.len()
    );
    Ok(config)
}
