//! Tiered channel identity resolution.
//!
//! 1. chat object from the event context,
//! 2. numeric id pulled out of the peer reference,
//! 3. explicit `get_entity` lookup when no username or title is known yet.
//!
//! Lookup failures never abort resolution; they only downgrade the outcome.

use courier_core::{
    message::{Entity, RawMessage},
    traits::ChatNetwork,
};
use tracing::debug;

/// Outcome of resolving a message's channel identity.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Resolution {
    /// Every tier that ran succeeded.
    Complete(Entity),
    /// A lookup failed but earlier tiers produced something usable.
    Partial { entity: Entity, reason: String },
    /// Nothing identifying anywhere; the message is dropped.
    Unidentified { reason: String },
}

impl Resolution {
    #[cfg(test)]
    pub fn entity(&self) -> Option<&Entity> {
        match self {
            Self::Complete(entity) | Self::Partial { entity, .. } => Some(entity),
            Self::Unidentified { .. } => None,
        }
    }
}

pub(crate) async fn resolve(
    network: &dyn ChatNetwork,
    message: &RawMessage,
    chat: Option<&Entity>,
) -> Resolution {
    let mut entity = Entity::default();

    match chat.filter(|c| !c.is_empty()) {
        Some(chat) => entity.merge(chat.clone()),
        None => {
            if let Some(peer) = &message.peer {
                let raw_id = peer.raw_id();
                if !raw_id.is_empty() {
                    entity.id = Some(raw_id);
                }
            }
        }
    }

    if entity.has_name() {
        return Resolution::Complete(entity);
    }

    let Some(peer) = &message.peer else {
        return if entity.is_empty() {
            Resolution::Unidentified {
                reason: "no chat context and no peer reference".into(),
            }
        } else {
            Resolution::Complete(entity)
        };
    };

    match network.get_entity(peer).await {
        Ok(found) => {
            entity.merge(found);
            if entity.is_empty() {
                Resolution::Unidentified {
                    reason: format!("lookup for {peer} returned no identity"),
                }
            } else {
                Resolution::Complete(entity)
            }
        }
        Err(e) => {
            debug!("entity lookup for {peer} failed: {e}");
            if entity.is_empty() {
                Resolution::Unidentified {
                    reason: format!("lookup for {peer} failed: {e}"),
                }
            } else {
                Resolution::Partial {
                    entity,
                    reason: e.to_string(),
                }
            }
        }
    }
}
