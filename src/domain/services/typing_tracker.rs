//! Typing indicator tracking with server-side expiry.
//!
//! Every `start` stamps the entry with a fresh generation. An expiry
//! timer carries the generation it was armed for and only removes the
//! entry if nothing re-armed or cleared it in the meantime.

use std::collections::HashMap;

#[derive(Debug, Clone)]
struct TypingEntry {
    username: String,
    generation: u64,
}

/// Per-channel set of users currently typing.
#[derive(Debug, Default)]
pub struct TypingTracker {
    channels: HashMap<i64, HashMap<i64, TypingEntry>>,
    next_generation: u64,
}

impl TypingTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a user as typing and return the generation to arm a timer with.
    pub fn start(&mut self, channel_id: i64, user_id: i64, username: &str) -> u64 {
        self.next_generation += 1;
        let generation = self.next_generation;
        self.channels.entry(channel_id).or_default().insert(
            user_id,
            TypingEntry {
                username: username.to_string(),
                generation,
            },
        );
        generation
    }

    /// Clear a user's entry. Returns the username when one was active.
    pub fn stop(&mut self, channel_id: i64, user_id: i64) -> Option<String> {
        self.remove_if(channel_id, user_id, |_| true)
    }

    /// Remove the entry only if it is still the one armed with `generation`.
    pub fn expire(&mut self, channel_id: i64, user_id: i64, generation: u64) -> Option<String> {
        self.remove_if(channel_id, user_id, |entry| entry.generation == generation)
    }

    pub fn is_typing(&self, channel_id: i64, user_id: i64) -> bool {
        self.channels
            .get(&channel_id)
            .is_some_and(|users| users.contains_key(&user_id))
    }

    /// User ids typing in a channel, sorted.
    pub fn typers(&self, channel_id: i64) -> Vec<i64> {
        let mut ids: Vec<i64> = self
            .channels
            .get(&channel_id)
            .map(|users| users.keys().copied().collect())
            .unwrap_or_default();
        ids.sort_unstable();
        ids
    }

    pub fn clear(&mut self) {
        self.channels.clear();
    }

    fn remove_if(
        &mut self,
        channel_id: i64,
        user_id: i64,
        matches: impl FnOnce(&TypingEntry) -> bool,
    ) -> Option<String> {
        let users = self.channels.get_mut(&channel_id)?;
        if !matches(users.get(&user_id)?) {
            return None;
        }
        let entry = users.remove(&user_id)?;
        if users.is_empty() {
            self.channels.remove(&channel_id);
        }
        Some(entry.username)
    }
}
