//! Per-chat buffer of recently observed posts.
//!
//! The Bot API has no history call, so `recent_messages` is served from what
//! the update stream delivered. Each chat is indexed by id, username, and
//! title so poll selectors resolve the same way route selectors do.
//!
//! Both dimensions are bounded: posts per chat, and the number of chats.
//! When a new chat pushes the count over the limit, the chat that was
//! least recently active is dropped together with its aliases.

use courier_core::message::{Entity, RawMessage};
use std::collections::{HashMap, VecDeque};

/// Posts kept per chat.
pub(crate) const POSTS_PER_CHAT: usize = 20;

/// Chats tracked at once.
pub(crate) const MAX_CHATS: usize = 256;

#[derive(Default)]
struct ChatPosts {
    /// Selector keys currently pointing at this chat.
    aliases: Vec<String>,
    posts: VecDeque<RawMessage>,
}

pub(crate) struct RecentPosts {
    per_chat: usize,
    max_chats: usize,
    /// Keyed by the chat's primary key (id when known).
    chats: HashMap<String, ChatPosts>,
    /// Selector key -> primary key.
    aliases: HashMap<String, String>,
    /// Primary keys, least recently active first.
    activity: VecDeque<String>,
}

impl RecentPosts {
    pub fn new(per_chat: usize) -> Self {
        Self {
            per_chat: per_chat.max(1),
            max_chats: MAX_CHATS,
            chats: HashMap::new(),
            aliases: HashMap::new(),
            activity: VecDeque::new(),
        }
    }

    pub fn max_chats(mut self, max_chats: usize) -> Self {
        self.max_chats = max_chats.max(1);
        self
    }

    pub fn record(&mut self, message: &RawMessage, chat: &Entity) {
        let keys = chat_keys(chat);
        let Some(primary) = keys.first().cloned() else {
            return;
        };

        if let Some(pos) = self.activity.iter().position(|k| *k == primary) {
            self.activity.remove(pos);
        }
        self.activity.push_back(primary.clone());

        let entry = self.chats.entry(primary.clone()).or_default();

        // Renamed chats must not keep answering to their old title.
        for stale in entry.aliases.drain(..) {
            if self.aliases.get(&stale) == Some(&primary) {
                self.aliases.remove(&stale);
            }
        }
        for key in &keys {
            self.aliases.insert(key.clone(), primary.clone());
        }
        entry.aliases = keys;

        if !entry.posts.iter().any(|m| m.id == message.id) {
            entry.posts.push_back(message.clone());
            while entry.posts.len() > self.per_chat {
                entry.posts.pop_front();
            }
        }

        while self.activity.len() > self.max_chats {
            let Some(oldest) = self.activity.pop_front() else {
                break;
            };
            if let Some(evicted) = self.chats.remove(&oldest) {
                for alias in evicted.aliases {
                    if self.aliases.get(&alias) == Some(&oldest) {
                        self.aliases.remove(&alias);
                    }
                }
            }
        }
    }

    /// Newest first, at most `limit`.
    pub fn latest(&self, selector: &str, limit: usize) -> Vec<RawMessage> {
        self.aliases
            .get(&selector_key(selector))
            .and_then(|primary| self.chats.get(primary))
            .map(|chat| chat.posts.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default()
    }

    #[cfg(test)]
    pub fn chat_count(&self) -> usize {
        self.chats.len()
    }

    #[cfg(test)]
    pub fn alias_count(&self) -> usize {
        self.aliases.len()
    }
}

fn chat_keys(chat: &Entity) -> Vec<String> {
    let mut keys = Vec::with_capacity(3);
    if let Some(id) = chat.id.as_deref().filter(|s| !s.is_empty()) {
        keys.push(id.to_string());
    }
    if let Some(username) = chat.username.as_deref().filter(|s| !s.is_empty()) {
        keys.push(username.trim_start_matches('@').to_lowercase());
    }
    if let Some(title) = chat.title.as_deref().filter(|s| !s.is_empty()) {
        keys.push(title.to_lowercase());
    }
    keys.dedup();
    keys
}

pub(crate) fn selector_key(selector: &str) -> String {
    let trimmed = selector.trim();
    match trimmed.strip_prefix('@') {
        Some(username) => username.to_lowercase(),
        None => trimmed.to_lowercase(),
    }
}
