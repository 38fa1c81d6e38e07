//! Selector matching and route lookup.

use courier_core::{config::RouteMapping, message::NormalizedMessage};

/// Whether `selector` names the channel `message` came from.
///
/// Usernames compare case-insensitively with one leading `@` ignored on both
/// sides, or verbatim. Titles compare case-insensitively or verbatim. A
/// numeric selector is an id selector and only matches the channel id.
pub(crate) fn matches(message: &NormalizedMessage, selector: &str) -> bool {
    if message.channel_id.as_deref() == Some(selector) {
        return true;
    }
    if is_id_selector(selector) {
        return false;
    }

    let folded = fold(selector);

    if let Some(username) = message.channel_username.as_deref() {
        if username == selector || fold(username) == folded {
            return true;
        }
    }

    if let Some(title) = message.channel_title.as_deref() {
        if title == selector || title.to_lowercase() == folded {
            return true;
        }
    }

    false
}

/// First route, in configuration order, whose selector matches.
pub(crate) fn find_route<'a>(
    message: &NormalizedMessage,
    routes: &'a [RouteMapping],
) -> Option<&'a RouteMapping> {
    routes.iter().find(|route| matches(message, &route.selector))
}

fn fold(value: &str) -> String {
    value.strip_prefix('@').unwrap_or(value).to_lowercase()
}

fn is_id_selector(selector: &str) -> bool {
    let digits = selector.strip_prefix('-').unwrap_or(selector);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}
