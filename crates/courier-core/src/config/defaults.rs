//! Default values for serde-deserialized config fields.

pub(super) fn default_name() -> String {
    "courier".to_string()
}

pub(super) fn default_log_level() -> String {
    "info".to_string()
}

pub(super) fn default_api_base() -> String {
    "https://api.telegram.org".to_string()
}

pub(super) fn default_poll_interval() -> u64 {
    2
}

pub(super) fn default_dedup_capacity() -> usize {
    1000
}

/// 8 MiB.
pub(super) fn default_max_document_bytes() -> u64 {
    8 * 1024 * 1024
}

/// 25 MiB.
pub(super) fn default_max_request_bytes() -> u64 {
    25 * 1024 * 1024
}

pub(super) fn default_max_description_chars() -> usize {
    4000
}

/// Telegram blue.
pub(super) fn default_embed_color() -> u32 {
    0x229E_D9
}
