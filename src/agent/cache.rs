//! First-round response caching
//!
//! Keys are 64-bit hashes of the message and of the history window, so two
//! different conversations can collide in theory. Entries live for the
//! session only.

use crate::llm::{LlmResponse, Message};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::RwLock;
use std::time::Instant;

/// Agent responses keyed by `(message, history)`
pub struct ResponseCache {
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
    max_size: usize,
}

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub struct CacheKey {
    message_hash: u64,
    history_hash: u64,
}

impl CacheKey {
    pub fn new(message: &str, history: &[Message]) -> Self {
        let mut hasher = DefaultHasher::new();
        message.hash(&mut hasher);
        let message_hash = hasher.finish();

        let mut hasher = DefaultHasher::new();
        // serde_json output is stable for the same message list
        serde_json::to_string(history)
            .unwrap_or_default()
            .hash(&mut hasher);
        let history_hash = hasher.finish();

        Self {
            message_hash,
            history_hash,
        }
    }
}

struct CacheEntry {
    response: LlmResponse,
    created_at: Instant,
    hits: usize,
}

impl ResponseCache {
    pub fn new(max_size: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            max_size: max_size.max(1),
        }
    }

    pub fn get(&self, key: &CacheKey) -> Option<LlmResponse> {
        let mut entries = self.entries.write().ok()?;
        let entry = entries.get_mut(key)?;
        entry.hits += 1;
        Some(entry.response.clone())
    }

    /// Store a response; responses that request tools are refused
    ///
    /// Returns whether the response was stored.
    pub fn put(&self, key: CacheKey, response: &LlmResponse) -> bool {
        if response.has_tool_calls() {
            tracing::debug!("Skipping cache for tool call response");
            return false;
        }

        let Ok(mut entries) = self.entries.write() else {
            return false;
        };
        if entries.len() >= self.max_size && !entries.contains_key(&key) {
            self.evict(&mut entries);
        }
        entries.insert(
            key,
            CacheEntry {
                response: response.clone(),
                created_at: Instant::now(),
                hits: 0,
            },
        );
        true
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.write() {
            entries.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn evict(&self, entries: &mut HashMap<CacheKey, CacheEntry>) {
        // Fewest hits first, oldest among equals
        if let Some(key) = entries
            .iter()
            .min_by_key(|(_, entry)| (entry.hits, entry.created_at))
            .map(|(key, _)| *key)
        {
            entries.remove(&key);
        }
    }
}
