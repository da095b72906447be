use crate::domain::model::{FetchStatus, QueryItem};
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Per-key fetch status shared by every fetch action
///
/// Each key is written only by the action that owns it, so writes for one key
/// land in the order they were issued. Keys are independent of each other.
#[derive(Clone, Default)]
pub struct StatusBoard {
    entries: Arc<DashMap<String, FetchStatus>>,
}

impl StatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a key as loading. Items already shown stay visible.
    pub fn set_loading(&self, key: &str) {
        let mut entry = self.entries.entry(key.to_string()).or_default();
        entry.loading = true;
        entry.error = None;
    }

    /// Replace the items of a key while more pages are still coming
    pub fn set_progress(&self, key: &str, items: Vec<QueryItem>) {
        let mut entry = self.entries.entry(key.to_string()).or_default();
        entry.items = items;
    }

    pub fn set_success(&self, key: &str, items: Vec<QueryItem>) {
        self.entries.insert(
            key.to_string(),
            FetchStatus {
                loading: false,
                error: None,
                items,
            },
        );
    }

    /// Record a failure. The last known good items are kept.
    pub fn set_error(&self, key: &str, message: impl Into<String>) {
        let mut entry = self.entries.entry(key.to_string()).or_default();
        entry.loading = false;
        entry.error = Some(message.into());
    }

    /// Seed a key from the persisted cache without touching its flags
    pub fn hydrate(&self, key: &str, items: Vec<QueryItem>) {
        let mut entry = self.entries.entry(key.to_string()).or_default();
        if !entry.loading {
            entry.items = items;
        }
    }

    pub fn remove(&self, key: &str) {
        self.entries.remove(key);
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn get(&self, key: &str) -> Option<FetchStatus> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sorted copy of every key's status
    pub fn snapshot(&self) -> BTreeMap<String, FetchStatus> {
        self.entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }
}
