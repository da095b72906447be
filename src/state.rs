use crate::application::events::CacheEvents;
use crate::application::status::StatusBoard;
use crate::domain::error::IqmsError;
use crate::domain::model::QueryClass;
use crate::domain::traits::{CacheStore, QuerySource};
use crate::infrastructure::config::{self, ClassSettings, Config, StoreBackend};
use crate::infrastructure::network::client::HttpQuerySource;
use crate::infrastructure::network::http::create_client;
use crate::infrastructure::network::retry::RetryPolicy;
use crate::infrastructure::storage::cache::MemoryStore;
use crate::infrastructure::storage::db::{init_database, SqliteStore};
use crate::infrastructure::storage::file::JsonFileStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

/// The backing stores, one per configurable backend
#[derive(Clone)]
pub struct Stores {
    pub file: Arc<dyn CacheStore>,
    pub sqlite: Arc<dyn CacheStore>,
    pub memory: Arc<dyn CacheStore>,
}

impl Stores {
    /// Every backend served by the same store
    pub fn shared(store: Arc<dyn CacheStore>) -> Self {
        Self {
            file: store.clone(),
            sqlite: store.clone(),
            memory: store,
        }
    }

    pub fn get(&self, backend: StoreBackend) -> Arc<dyn CacheStore> {
        match backend {
            StoreBackend::File => self.file.clone(),
            StoreBackend::Sqlite => self.sqlite.clone(),
            StoreBackend::Memory => self.memory.clone(),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<RwLock<Config>>,
    pub source: Arc<dyn QuerySource>,
    pub stores: Stores,
    pub board: StatusBoard,
    pub events: CacheEvents,
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(config: Config, source: Arc<dyn QuerySource>, stores: Stores) -> Self {
        Self {
            config: Arc::new(RwLock::new(config)),
            source,
            stores,
            board: StatusBoard::new(),
            events: CacheEvents::default(),
            shutdown: CancellationToken::new(),
        }
    }

    /// Wire the HTTP source and the on-disk stores described by `config`
    pub async fn open(config: Config) -> Result<Self, IqmsError> {
        let data_dir = config::get_data_dir(&config);
        tokio::fs::create_dir_all(&data_dir).await?;

        let http_client = create_client(&config.server)?;
        let source = HttpQuerySource::new(
            http_client,
            config.server.base_url.clone(),
            config.server.api_token.clone(),
        );

        let db = init_database(&config::get_database_path(&config)).await?;
        let stores = Stores {
            file: Arc::new(JsonFileStore::new(data_dir)),
            sqlite: Arc::new(SqliteStore::new(db)),
            memory: Arc::new(MemoryStore::new()),
        };

        Ok(Self::new(config, Arc::new(source), stores))
    }

    pub async fn class_settings(&self, class: QueryClass) -> ClassSettings {
        self.config.read().await.classes.settings(class)
    }

    pub async fn store_for(&self, class: QueryClass) -> Arc<dyn CacheStore> {
        let settings = self.class_settings(class).await;
        self.stores.get(settings.store)
    }

    pub async fn retry_policy(&self) -> RetryPolicy {
        let config = self.config.read().await;
        RetryPolicy::new(
            config.retry.max_attempts,
            Duration::from_millis(config.retry.retry_delay_ms),
        )
    }
}
