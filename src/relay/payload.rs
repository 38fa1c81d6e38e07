//! Webhook payload construction: embed JSON and attachment metadata.

use courier_core::{
    config::{ForwardConfig, TRUNCATION_MARKER},
    message::{Media, NormalizedMessage},
};
use mime_guess::Mime;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub(crate) struct WebhookPayload {
    pub embeds: Vec<Embed>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct Embed {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub color: u32,
    /// RFC 3339 instant.
    pub timestamp: String,
    pub footer: Footer,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct Footer {
    pub text: String,
}

/// A downloaded file ready to be sent as one multipart field.
#[derive(Debug, Clone)]
pub(crate) struct Attachment {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

pub(crate) fn build_payload(message: &NormalizedMessage, limits: &ForwardConfig) -> WebhookPayload {
    let description = if message.text.is_empty() {
        None
    } else {
        Some(truncate_description(&message.text, limits.max_description_chars))
    };

    WebhookPayload {
        embeds: vec![Embed {
            title: message.display_name(),
            description,
            color: limits.embed_color,
            timestamp: message.timestamp.to_rfc3339(),
            footer: Footer {
                text: footer_text(message),
            },
        }],
    }
}

fn footer_text(message: &NormalizedMessage) -> String {
    match &message.channel_username {
        Some(username) => format!(
            "Telegram · @{} · #{}",
            username.trim_start_matches('@'),
            message.id
        ),
        None => format!("Telegram · #{}", message.id),
    }
}

/// Cut `text` to at most `max_chars` characters, ending in the marker when cut.
///
/// A limit too small to hold the marker gets a plain cut.
pub(crate) fn truncate_description(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let marker_len = TRUNCATION_MARKER.chars().count();
    if max_chars < marker_len {
        return text.chars().take(max_chars).collect();
    }
    let keep = max_chars - marker_len;
    let mut out: String = text.chars().take(keep).collect();
    out.push_str(TRUNCATION_MARKER);
    out
}

/// Name and content type for the bytes behind `media`.
///
/// A source mime type that does not parse is ignored; the type is then
/// guessed from the file name, else `application/octet-stream`.
pub(crate) fn attachment_for(
    message: &NormalizedMessage,
    media: &Media,
    bytes: Vec<u8>,
) -> Attachment {
    let (file_name, content_type) = match media {
        Media::Photo { .. } => (format!("{}.jpg", message.id), "image/jpeg".to_string()),
        Media::Document {
            mime_type,
            file_name,
            ..
        } => {
            let mime = mime_type
                .as_deref()
                .and_then(|m| m.trim().parse::<Mime>().ok());
            let name = file_name
                .clone()
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| {
                    let ext = mime
                        .as_ref()
                        .and_then(|m| mime_guess::get_mime_extensions(m))
                        .and_then(|exts| exts.first())
                        .copied()
                        .unwrap_or("bin");
                    format!("{}.{ext}", message.id)
                });
            let content_type = match mime {
                Some(m) => m.to_string(),
                None => guess_content_type(&name),
            };
            (name, content_type)
        }
    };

    Attachment {
        file_name,
        content_type,
        bytes,
    }
}

/// Content type from a file extension, `application/octet-stream` if unknown.
fn guess_content_type(file_name: &str) -> String {
    mime_guess::from_path(file_name)
        .first_or_octet_stream()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use courier_core::message::MessageHandle;

    const OCTET_STREAM: &str = "application/octet-stream";

    fn message(text: &str) -> NormalizedMessage {
        NormalizedMessage {
            id: 7,
            text: text.to_string(),
            channel_username: Some("news".into()),
            channel_title: Some("Daily News".into()),
            channel_id: Some("42".into()),
            timestamp: DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap(),
            media: None,
            handle: MessageHandle::default(),
        }
    }

    fn document(mime: Option<&str>, name: Option<&str>) -> Media {
        Media::Document {
            size: Some(10),
            mime_type: mime.map(String::from),
            file_name: name.map(String::from),
        }
    }

    #[test]
    fn test_truncation_of_long_text() {
        let text = "a".repeat(4500);
        let out = truncate_description(&text, 4000);
        assert!(out.chars().count() <= 4000);
        assert!(out.ends_with(TRUNCATION_MARKER));
    }

    #[test]
    fn test_limit_below_marker_length_stays_within_limit() {
        let out = truncate_description(&"c".repeat(50), 5);
        assert_eq!(out, "ccccc");
    }

    #[test]
    fn test_short_text_untouched() {
        assert_eq!(truncate_description("hello", 4000), "hello");
        let exact = "b".repeat(4000);
        assert_eq!(truncate_description(&exact, 4000), exact);
    }

    #[test]
    fn test_truncation_counts_chars_not_bytes() {
        let text = "é".repeat(4100);
        let out = truncate_description(&text, 4000);
        assert_eq!(out.chars().count(), 4000);
    }

    #[test]
    fn test_payload_shape() {
        let payload = build_payload(&message("hi"), &ForwardConfig::default());
        let json = serde_json::to_value(&payload).unwrap();
        let embed = &json["embeds"][0];
        assert_eq!(embed["title"], "Daily News");
        assert_eq!(embed["description"], "hi");
        assert_eq!(embed["color"], 0x229ED9);
        assert_eq!(embed["timestamp"], "2023-11-14T22:13:20+00:00");
        assert_eq!(embed["footer"]["text"], "Telegram · @news · #7");
    }

    #[test]
    fn test_empty_text_omits_description() {
        let payload = build_payload(&message(""), &ForwardConfig::default());
        let json = serde_json::to_value(&payload).unwrap();
        assert!(json["embeds"][0].get("description").is_none());
    }

    #[test]
    fn test_photo_attachment_name() {
        let att = attachment_for(&message(""), &Media::Photo { size: None }, vec![1]);
        assert_eq!(att.file_name, "7.jpg");
        assert_eq!(att.content_type, "image/jpeg");
    }

    #[test]
    fn test_document_uses_source_metadata() {
        let media = document(Some("application/pdf"), Some("report.pdf"));
        let att = attachment_for(&message(""), &media, vec![1]);
        assert_eq!(att.file_name, "report.pdf");
        assert_eq!(att.content_type, "application/pdf");
    }

    #[test]
    fn test_document_fallbacks() {
        let att = attachment_for(&message(""), &document(None, Some("clip.MP4")), vec![]);
        assert_eq!(att.content_type, "video/mp4");

        let att = attachment_for(&message(""), &document(None, Some("anim.gif")), vec![]);
        assert_eq!(att.content_type, "image/gif");

        let att = attachment_for(&message(""), &document(None, None), vec![]);
        assert_eq!(att.file_name, "7.bin");
        assert_eq!(att.content_type, OCTET_STREAM);

        let att = attachment_for(&message(""), &document(Some("application/pdf"), None), vec![]);
        assert_eq!(att.file_name, "7.pdf");
        assert_eq!(att.content_type, "application/pdf");

        let att = attachment_for(&message(""), &document(Some("video/mp4"), None), vec![]);
        assert!(att.file_name.starts_with("7."));
        assert!(!att.file_name.ends_with(".bin"));
        assert_eq!(att.content_type, "video/mp4");
    }

    #[test]
    fn test_unparseable_mime_is_ignored() {
        let media = document(Some("not a mime"), Some("clip.webm"));
        let att = attachment_for(&message(""), &media, vec![1]);
        assert_eq!(att.content_type, "video/webm");

        let att = attachment_for(&message(""), &document(Some("not a mime"), None), vec![1]);
        assert_eq!(att.file_name, "7.bin");
        assert_eq!(att.content_type, OCTET_STREAM);
    }
}
