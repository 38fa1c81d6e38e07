use thiserror::Error;

/// Top-level error type for Courier.
#[derive(Debug, Error)]
pub enum CourierError {
    /// Error from the chat network (connect, lookup, history, download).
    #[error("network error: {0}")]
    Network(String),

    /// Error delivering a payload to a webhook.
    #[error("delivery error: {0}")]
    Delivery(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
