use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Reference to the peer a message was posted in.
///
/// Adapters decide the variant once when they translate a network object;
/// everything downstream switches on the tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PeerRef {
    /// Broadcast channel or supergroup.
    Channel(i64),
    /// Basic group chat.
    Chat(i64),
    /// Private conversation with a user.
    User(i64),
    /// Anything the adapter could not classify, kept in raw form.
    Other(String),
}

impl PeerRef {
    /// The numeric or raw identifier carried by this reference.
    pub fn raw_id(&self) -> String {
        match self {
            Self::Channel(id) | Self::Chat(id) | Self::User(id) => id.to_string(),
            Self::Other(raw) => raw.clone(),
        }
    }
}

impl fmt::Display for PeerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Channel(id) => write!(f, "channel#{id}"),
            Self::Chat(id) => write!(f, "chat#{id}"),
            Self::User(id) => write!(f, "user#{id}"),
            Self::Other(raw) => write!(f, "{raw}"),
        }
    }
}

/// Opaque handle back to the source message, understood only by the adapter
/// that produced it. Used to fetch attachment bytes later.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageHandle(String);

impl MessageHandle {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// At most one attachment per message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Media {
    Photo {
        size: Option<u64>,
    },
    Document {
        size: Option<u64>,
        mime_type: Option<String>,
        file_name: Option<String>,
    },
}

impl Media {
    /// Short kind label used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Photo { .. } => "photo",
            Self::Document { .. } => "document",
        }
    }

    /// Size reported by the network, if any.
    pub fn reported_size(&self) -> Option<u64> {
        match self {
            Self::Photo { size } | Self::Document { size, .. } => *size,
        }
    }
}

/// A message as it arrives from the network, before identity resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMessage {
    /// Sequence number, scoped to its channel.
    pub id: i64,
    pub peer: Option<PeerRef>,
    #[serde(default)]
    pub text: String,
    /// Seconds since epoch, when the network supplied one.
    pub date: Option<i64>,
    pub media: Option<Media>,
    #[serde(default)]
    pub handle: MessageHandle,
}

/// Identity metadata for a channel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub username: Option<String>,
    pub title: Option<String>,
    pub id: Option<String>,
}

impl Entity {
    /// True when no field carries a non-empty value.
    pub fn is_empty(&self) -> bool {
        non_empty(&self.username).is_none()
            && non_empty(&self.title).is_none()
            && non_empty(&self.id).is_none()
    }

    /// True when a human-readable name (username or title) is present.
    pub fn has_name(&self) -> bool {
        non_empty(&self.username).is_some() || non_empty(&self.title).is_some()
    }

    /// Fill fields that are still empty from `other`.
    pub fn merge(&mut self, other: Entity) {
        if non_empty(&self.username).is_none() {
            self.username = other.username.filter(|s| !s.is_empty());
        }
        if non_empty(&self.title).is_none() {
            self.title = other.title.filter(|s| !s.is_empty());
        }
        if non_empty(&self.id).is_none() {
            self.id = other.id.filter(|s| !s.is_empty());
        }
    }
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.is_empty())
}

/// Push notification from the network subscription.
#[derive(Debug, Clone)]
pub enum NetworkEvent {
    /// High-level new-message event, optionally carrying the chat object.
    NewMessage {
        message: RawMessage,
        chat: Option<Entity>,
    },
    /// Low-level update that only carries the message and its peer.
    RawUpdate { message: RawMessage },
}

impl NetworkEvent {
    pub fn into_parts(self) -> (RawMessage, Option<Entity>) {
        match self {
            Self::NewMessage { message, chat } => (message, chat),
            Self::RawUpdate { message } => (message, None),
        }
    }
}

/// Identity used to collapse duplicate observations of one message.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupKey {
    pub channel: String,
    pub message_id: i64,
}

impl DedupKey {
    /// Channel-scoped id, else chat-scoped id, else user-scoped id, else `"unknown"`.
    pub fn for_message(message: &RawMessage) -> Self {
        let channel = match &message.peer {
            Some(PeerRef::Channel(id)) | Some(PeerRef::Chat(id)) | Some(PeerRef::User(id)) => {
                id.to_string()
            }
            Some(PeerRef::Other(_)) | None => "unknown".to_string(),
        };
        Self {
            channel,
            message_id: message.id,
        }
    }
}

impl fmt::Display for DedupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.channel, self.message_id)
    }
}

/// The canonical unit the relay pipeline operates on.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedMessage {
    pub id: i64,
    pub text: String,
    pub channel_username: Option<String>,
    pub channel_title: Option<String>,
    pub channel_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub media: Option<Media>,
    pub handle: MessageHandle,
}

impl NormalizedMessage {
    /// Build from a raw message and its resolved entity.
    ///
    /// Falls back to `now` when the network omitted the date.
    pub fn from_raw(raw: RawMessage, entity: Entity, now: DateTime<Utc>) -> Self {
        let timestamp = raw
            .date
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .unwrap_or(now);
        Self {
            id: raw.id,
            text: raw.text,
            channel_username: entity.username.filter(|s| !s.is_empty()),
            channel_title: entity.title.filter(|s| !s.is_empty()),
            channel_id: entity.id.filter(|s| !s.is_empty()),
            timestamp,
            media: raw.media,
            handle: raw.handle,
        }
    }

    pub fn is_identified(&self) -> bool {
        self.channel_username.is_some() || self.channel_title.is_some() || self.channel_id.is_some()
    }

    /// Title, else `@username`, else the numeric id.
    pub fn display_name(&self) -> String {
        if let Some(title) = &self.channel_title {
            return title.clone();
        }
        if let Some(username) = &self.channel_username {
            return format!("@{}", username.trim_start_matches('@'));
        }
        self.channel_id
            .clone()
            .unwrap_or_else(|| "unknown channel".to_string())
    }
}
