//! Route lookup, media fetch, and webhook delivery for one message.
//!
//! Every step reports an outcome instead of an error; the forwarder never
//! propagates failures back into the acquisition paths.

use super::matcher::find_route;
use super::payload::{attachment_for, build_payload, Attachment, WebhookPayload};
use courier_core::{
    config::{ForwardConfig, RouteMapping},
    error::CourierError,
    message::{Media, NormalizedMessage},
    traits::ChatNetwork,
};
use reqwest::multipart::{Form, Part};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Boundary line plus part headers, rounded up generously.
const MULTIPART_PART_OVERHEAD: u64 = 512;

/// Result of trying to obtain the message's attachment.
#[derive(Debug)]
pub(crate) enum MediaOutcome {
    /// No media on the message.
    Absent,
    Attached(Attachment),
    /// Document above the size cap; skipped without downloading.
    TooLarge { size: u64 },
    /// Download failed; delivery continues without the file.
    FetchFailed(String),
}

/// Result of forwarding one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum DeliveryOutcome {
    Delivered { status: u16, attachments: usize },
    /// Identified, but no route selector matched.
    Unrouted,
    /// Webhook rejected the request or was unreachable. Not retried.
    Failed { reason: String },
}

pub(crate) struct Forwarder {
    client: reqwest::Client,
    network: Arc<dyn ChatNetwork>,
    routes: Vec<RouteMapping>,
    limits: ForwardConfig,
}

impl Forwarder {
    pub fn new(
        network: Arc<dyn ChatNetwork>,
        routes: Vec<RouteMapping>,
        limits: ForwardConfig,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            network,
            routes,
            limits,
        }
    }

    pub async fn forward(&self, message: &NormalizedMessage) -> DeliveryOutcome {
        let Some(route) = find_route(message, &self.routes) else {
            debug!(
                "no route for message {} from {}",
                message.id,
                message.display_name()
            );
            return DeliveryOutcome::Unrouted;
        };

        let attachments = match self.fetch_media(message).await {
            MediaOutcome::Absent => Vec::new(),
            MediaOutcome::Attached(attachment) => vec![attachment],
            MediaOutcome::TooLarge { size } => {
                info!(
                    "skipping {size}-byte document on message {} (limit {})",
                    message.id, self.limits.max_document_bytes
                );
                Vec::new()
            }
            MediaOutcome::FetchFailed(reason) => {
                warn!("media download for message {} failed: {reason}", message.id);
                Vec::new()
            }
        };

        let payload = build_payload(message, &self.limits);
        match self.deliver(&route.webhook_url, &payload, attachments).await {
            Ok(outcome) => {
                info!(
                    "forwarded message {} from {} to route '{}'",
                    message.id,
                    message.display_name(),
                    route.selector
                );
                outcome
            }
            Err(e) => {
                warn!(
                    "delivery of message {} to route '{}' failed: {e}",
                    message.id, route.selector
                );
                DeliveryOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }

    pub(crate) async fn fetch_media(&self, message: &NormalizedMessage) -> MediaOutcome {
        let Some(media) = &message.media else {
            return MediaOutcome::Absent;
        };

        if let Media::Document {
            size: Some(size), ..
        } = media
        {
            if *size > self.limits.max_document_bytes {
                return MediaOutcome::TooLarge { size: *size };
            }
        }

        match self.network.download_attachment(&message.handle).await {
            Ok(bytes) => {
                debug!(
                    "downloaded {} ({} bytes) for message {}",
                    media.kind(),
                    bytes.len(),
                    message.id
                );
                MediaOutcome::Attached(attachment_for(message, media, bytes))
            }
            Err(e) => MediaOutcome::FetchFailed(e.to_string()),
        }
    }

    async fn deliver(
        &self,
        url: &str,
        payload: &WebhookPayload,
        mut attachments: Vec<Attachment>,
    ) -> Result<DeliveryOutcome, CourierError> {
        let json = serde_json::to_string(payload)?;

        let total = request_size(json.len(), &attachments);
        if !attachments.is_empty() && total > self.limits.max_request_bytes {
            warn!(
                "request body would be {total} bytes (limit {}); sending embed without attachments",
                self.limits.max_request_bytes
            );
            attachments.clear();
        }

        let mut count = attachments.len();
        let request = if attachments.is_empty() {
            self.json_request(url, json)
        } else {
            match multipart_form(json.clone(), attachments) {
                Ok(form) => self.client.post(url).multipart(form),
                Err(e) => {
                    warn!("{e}; sending embed without attachments");
                    count = 0;
                    self.json_request(url, json)
                }
            }
        };

        let resp = request
            .send()
            .await
            .map_err(|e| CourierError::Delivery(format!("webhook request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(CourierError::Delivery(format!(
                "webhook returned {status}: {body}"
            )));
        }

        Ok(DeliveryOutcome::Delivered {
            status: status.as_u16(),
            attachments: count,
        })
    }

    fn json_request(&self, url: &str, json: String) -> reqwest::RequestBuilder {
        self.client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(json)
    }
}

/// Wire size of the request, including a framing allowance for each
/// multipart part when attachments are present.
pub(crate) fn request_size(json_len: usize, attachments: &[Attachment]) -> u64 {
    let body = json_len as u64 + attachments.iter().map(|a| a.bytes.len() as u64).sum::<u64>();
    if attachments.is_empty() {
        body
    } else {
        body + MULTIPART_PART_OVERHEAD * (attachments.len() as u64 + 1)
    }
}

fn multipart_form(json: String, attachments: Vec<Attachment>) -> Result<Form, CourierError> {
    let payload_part = Part::text(json)
        .mime_str("application/json")
        .map_err(|e| CourierError::Delivery(format!("payload mime error: {e}")))?;
    let mut form = Form::new().part("payload_json", payload_part);

    for (i, attachment) in attachments.into_iter().enumerate() {
        let part = Part::bytes(attachment.bytes)
            .file_name(attachment.file_name)
            .mime_str(&attachment.content_type)
            .map_err(|e| CourierError::Delivery(format!("attachment mime error: {e}")))?;
        form = form.part(format!("files[{i}]"), part);
    }

    Ok(form)
}
