// JSON document store: one file per namespace, key -> item array
use crate::domain::error::IqmsError;
use crate::domain::model::QueryItem;
use crate::domain::traits::CacheStore;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::warn;

type Namespace = HashMap<String, Vec<QueryItem>>;

/// Key-value store persisted as whole JSON documents
///
/// Every save rewrites the namespace file. Writes go through a lock so that
/// concurrent fetches for different keys of one namespace don't drop each other.
pub struct JsonFileStore {
    dir: PathBuf,
    namespaces: Mutex<HashMap<String, Namespace>>,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            namespaces: Mutex::new(HashMap::new()),
        }
    }

    fn path_for(&self, namespace: &str) -> PathBuf {
        self.dir.join(format!("{}.json", namespace))
    }

    async fn write_namespace(&self, namespace: &str, data: &Namespace) -> Result<(), IqmsError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.path_for(namespace);
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serde_json::to_vec(data)?).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }
}

/// Read a namespace file. Missing or corrupt files read as empty.
async fn read_namespace(path: &Path) -> Namespace {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Namespace::new(),
        Err(e) => {
            warn!("cannot read cache file {}: {}", path.display(), e);
            return Namespace::new();
        }
    };

    match serde_json::from_slice::<Namespace>(&bytes) {
        Ok(data) => data,
        Err(e) => {
            warn!("discarding corrupt cache file {}: {}", path.display(), e);
            Namespace::new()
        }
    }
}

#[async_trait]
impl CacheStore for JsonFileStore {
    async fn load(&self, namespace: &str) -> Result<HashMap<String, Vec<QueryItem>>, IqmsError> {
        let mut namespaces = self.namespaces.lock().await;
        if let Some(data) = namespaces.get(namespace) {
            return Ok(data.clone());
        }
        let data = read_namespace(&self.path_for(namespace)).await;
        namespaces.insert(namespace.to_string(), data.clone());
        Ok(data)
    }

    async fn save(
        &self,
        namespace: &str,
        key: &str,
        items: &[QueryItem],
    ) -> Result<(), IqmsError> {
        let mut namespaces = self.namespaces.lock().await;
        if !namespaces.contains_key(namespace) {
            let data = read_namespace(&self.path_for(namespace)).await;
            namespaces.insert(namespace.to_string(), data);
        }
        let data = namespaces.entry(namespace.to_string()).or_default();
        data.insert(key.to_string(), items.to_vec());
        self.write_namespace(namespace, data).await
    }

    async fn remove(&self, namespace: &str, key: &str) -> Result<(), IqmsError> {
        let mut namespaces = self.namespaces.lock().await;
        if !namespaces.contains_key(namespace) {
            let data = read_namespace(&self.path_for(namespace)).await;
            namespaces.insert(namespace.to_string(), data);
        }
        let data = namespaces.entry(namespace.to_string()).or_default();
        if data.remove(key).is_some() {
            self.write_namespace(namespace, data).await?;
        }
        Ok(())
    }

    async fn clear(&self, namespace: &str) -> Result<(), IqmsError> {
        let mut namespaces = self.namespaces.lock().await;
        namespaces.insert(namespace.to_string(), Namespace::new());
        match tokio::fs::remove_file(self.path_for(namespace)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
