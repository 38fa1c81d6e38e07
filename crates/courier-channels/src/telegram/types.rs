//! Telegram Bot API deserialization types and their translation into
//! network-neutral messages.

use courier_core::message::{Entity, Media, MessageHandle, PeerRef, RawMessage};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub(crate) struct TgResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TgUpdate {
    pub update_id: i64,
    pub message: Option<TgMessage>,
    pub channel_post: Option<TgMessage>,
}

impl TgUpdate {
    /// Channel posts take precedence; a single update never carries both.
    pub fn into_message(self) -> Option<TgMessage> {
        self.channel_post.or(self.message)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TgMessage {
    pub message_id: i64,
    pub chat: TgChat,
    pub date: Option<i64>,
    pub text: Option<String>,
    pub caption: Option<String>,
    pub photo: Option<Vec<TgPhotoSize>>,
    pub document: Option<TgDocument>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TgChat {
    pub id: i64,
    /// Chat type: "private", "group", "supergroup", or "channel".
    #[serde(default, rename = "type")]
    pub chat_type: String,
    pub title: Option<String>,
    pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TgPhotoSize {
    pub file_id: String,
    pub file_size: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TgDocument {
    pub file_id: String,
    pub file_name: Option<String>,
    pub mime_type: Option<String>,
    pub file_size: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TgFile {
    pub file_path: Option<String>,
}

impl TgChat {
    pub fn peer(&self) -> PeerRef {
        match self.chat_type.as_str() {
            "channel" | "supergroup" => PeerRef::Channel(self.id),
            "group" => PeerRef::Chat(self.id),
            "private" => PeerRef::User(self.id),
            _ => PeerRef::Other(self.id.to_string()),
        }
    }

    pub fn entity(&self) -> Entity {
        Entity {
            username: self.username.clone(),
            title: self.title.clone(),
            id: Some(self.id.to_string()),
        }
    }
}

impl TgMessage {
    /// Translate into a raw message plus the chat context it arrived with.
    pub fn into_raw(self) -> (RawMessage, Entity) {
        let entity = self.chat.entity();
        let peer = self.chat.peer();

        let (media, handle) = if let Some(doc) = self.document {
            (
                Some(Media::Document {
                    size: doc.file_size,
                    mime_type: doc.mime_type,
                    file_name: doc.file_name,
                }),
                MessageHandle::new(doc.file_id),
            )
        } else if let Some(largest) = self.photo.as_ref().and_then(|sizes| sizes.last()) {
            // Telegram sends multiple sizes; the last is the largest.
            (
                Some(Media::Photo {
                    size: largest.file_size,
                }),
                MessageHandle::new(largest.file_id.clone()),
            )
        } else {
            (
                None,
                MessageHandle::new(format!("{}:{}", self.chat.id, self.message_id)),
            )
        };

        let raw = RawMessage {
            id: self.message_id,
            peer: Some(peer),
            text: self.text.or(self.caption).unwrap_or_default(),
            date: self.date,
            media,
            handle,
        };
        (raw, entity)
    }
}
