use crate::domain::model::CacheWritten;
use tokio::sync::broadcast;

/// Broadcast of cache writes, for widgets that show per-key counts
#[derive(Clone)]
pub struct CacheEvents {
    tx: broadcast::Sender<CacheWritten>,
}

impl CacheEvents {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CacheWritten> {
        self.tx.subscribe()
    }

    /// Publish an event. Having no subscribers is fine.
    pub fn emit(&self, event: CacheWritten) {
        let _ = self.tx.send(event);
    }
}

impl Default for CacheEvents {
    fn default() -> Self {
        Self::new(256)
    }
}
