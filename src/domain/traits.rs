use crate::domain::error::IqmsError;
use crate::domain::model::{BatchRequest, Page, PageRequest, QueryItem};
use async_trait::async_trait;
use std::collections::HashMap;

/// Trait for the remote IQMS endpoints
///
/// The HTTP client implements this; tests swap in scripted sources.
#[async_trait]
pub trait QuerySource: Send + Sync {
    /// Fetch one page of an incremental list endpoint
    async fn fetch_page(&self, request: &PageRequest, offset: usize) -> Result<Page, IqmsError>;

    /// Fetch a full result set from a batch listing endpoint
    async fn fetch_batch(&self, request: &BatchRequest) -> Result<Vec<QueryItem>, IqmsError>;

    /// Fetch the FAQ list
    async fn fetch_faq(&self) -> Result<Vec<QueryItem>, IqmsError>;

    /// Fetch the frequency-query count for a role key
    async fn fetch_frequency_count(&self, key: &str) -> Result<u64, IqmsError>;
}

/// Trait for persisted cache backends
///
/// Every namespace is a map of key to item list. A save replaces the list for
/// that key. Loads are best-effort and never fail on corrupt records.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn load(&self, namespace: &str) -> Result<HashMap<String, Vec<QueryItem>>, IqmsError>;

    async fn save(&self, namespace: &str, key: &str, items: &[QueryItem])
        -> Result<(), IqmsError>;

    /// Drop a single key
    async fn remove(&self, namespace: &str, key: &str) -> Result<(), IqmsError>;

    async fn clear(&self, namespace: &str) -> Result<(), IqmsError>;
}

/// Receives every page as soon as it lands
///
/// The fetcher awaits the observer before requesting the next page.
#[async_trait]
pub trait PageObserver: Send {
    async fn on_page(&mut self, new_items: &[QueryItem], accumulated: &[QueryItem]);
}
