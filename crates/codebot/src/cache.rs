//! Per-message cache of rendered compile output.
//!
//! Keyed by message identity, holding the already-chunked delivery parts
//! so a ▶️ replay is a pure cache read. Bounded LRU by entry count; `put`
//! replaces any existing entry (last write wins) and evicts the least
//! recently used entry once the cap is exceeded. Not persisted across
//! restarts.

use std::sync::Mutex;

use indexmap::IndexMap;

use crate::gateway::MessageId;

/// Default maximum number of cached messages.
pub const DEFAULT_CAPACITY: usize = 1024;

pub struct CompilationCache {
    /// IndexMap insertion order doubles as the recency queue: index 0 is
    /// the least recently used entry.
    entries: Mutex<IndexMap<MessageId, Vec<String>>>,
    capacity: usize,
}

impl CompilationCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(IndexMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// Store the delivery parts for a message, replacing any prior entry.
    pub fn put(&self, id: MessageId, parts: Vec<String>) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.shift_remove(&id);
        entries.insert(id, parts);
        while entries.len() > self.capacity {
            entries.shift_remove_index(0);
        }
    }

    /// Fetch the parts for a message, refreshing its recency.
    pub fn get(&self, id: &MessageId) -> Option<Vec<String>> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let parts = entries.shift_remove(id)?;
        entries.insert(id.clone(), parts.clone());
        Some(parts)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn has(&self, id: &MessageId) -> bool {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for CompilationCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
