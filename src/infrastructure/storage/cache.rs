// In-memory cache store using DashMap
use crate::domain::error::IqmsError;
use crate::domain::model::QueryItem;
use crate::domain::traits::CacheStore;
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::HashMap;

/// Thread-safe in-memory store, keyed by namespace
///
/// Nothing survives the process. Used for ephemeral runs and tests.
pub struct MemoryStore {
    map: DashMap<String, HashMap<String, Vec<QueryItem>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            map: DashMap::new(),
        }
    }

    /// Number of keys held in a namespace
    pub fn len(&self, namespace: &str) -> usize {
        self.map.get(namespace).map(|entry| entry.len()).unwrap_or(0)
    }

    pub fn is_empty(&self, namespace: &str) -> bool {
        self.len(namespace) == 0
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn load(&self, namespace: &str) -> Result<HashMap<String, Vec<QueryItem>>, IqmsError> {
        Ok(self
            .map
            .get(namespace)
            .map(|entry| entry.value().clone())
            .unwrap_or_default())
    }

    async fn save(
        &self,
        namespace: &str,
        key: &str,
        items: &[QueryItem],
    ) -> Result<(), IqmsError> {
        self.map
            .entry(namespace.to_string())
            .or_default()
            .insert(key.to_string(), items.to_vec());
        Ok(())
    }

    async fn remove(&self, namespace: &str, key: &str) -> Result<(), IqmsError> {
        if let Some(mut entry) = self.map.get_mut(namespace) {
            entry.remove(key);
        }
        Ok(())
    }

    async fn clear(&self, namespace: &str) -> Result<(), IqmsError> {
        self.map.remove(namespace);
        Ok(())
    }
}
