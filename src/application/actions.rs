use crate::application::events::CacheEvents;
use crate::application::fetcher::fetch_paged;
use crate::application::status::StatusBoard;
use crate::domain::error::IqmsError;
use crate::domain::model::{
    status_key, BatchRequest, CacheWritten, PageRequest, QueryClass, QueryItem,
};
use crate::domain::role::{ActiveRole, Level, RoleFilter};
use crate::domain::traits::{CacheStore, PageObserver, QuerySource};
use crate::infrastructure::config::FetchStrategy;
use crate::infrastructure::network::retry::cancellable;
use crate::state::AppState;
use async_trait::async_trait;
use futures_util::future::join_all;
use std::fmt;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// A fetch whose first page has landed
///
/// Remaining pages keep loading on a background task; `finished` waits for it.
pub struct FetchStarted {
    pub class: QueryClass,
    pub key: String,
    pub first_page_item_count: usize,
    background: JoinHandle<()>,
}

impl FetchStarted {
    /// Wait until paging is done. Paging failures are on the status board, not here.
    pub async fn finished(self) -> Result<(), IqmsError> {
        self.background
            .await
            .map_err(|e| IqmsError::Task(format!("{} {}: {}", self.class, self.key, e)))
    }
}

impl fmt::Debug for FetchStarted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchStarted")
            .field("class", &self.class)
            .field("key", &self.key)
            .field("first_page_item_count", &self.first_page_item_count)
            .finish()
    }
}

// Writes every page to the cache and the board, and signals the first page
struct ActionSink {
    class: QueryClass,
    key: String,
    status_key: String,
    store: Arc<dyn CacheStore>,
    board: StatusBoard,
    events: CacheEvents,
    first_page: Option<oneshot::Sender<Result<usize, IqmsError>>>,
}

#[async_trait]
impl PageObserver for ActionSink {
    async fn on_page(&mut self, new_items: &[QueryItem], accumulated: &[QueryItem]) {
        let namespace = self.class.namespace();
        match self.store.save(namespace, &self.key, accumulated).await {
            Ok(()) => self.events.emit(CacheWritten {
                namespace: namespace.to_string(),
                key: self.key.clone(),
                count: accumulated.len(),
            }),
            Err(e) => warn!("cache write for {}/{} failed: {}", namespace, self.key, e),
        }

        self.board.set_progress(&self.status_key, accumulated.to_vec());

        if let Some(tx) = self.first_page.take() {
            let _ = tx.send(Ok(new_items.len()));
        }
    }
}

/// Fetch one data class for a role at a level
///
/// Resolves once the first page is cached and on the board. A failure before
/// that is returned; a failure afterwards is logged and recorded on the board
/// for the key, and never reaches the caller.
pub async fn fetch_class(
    state: &AppState,
    class: QueryClass,
    role: &ActiveRole,
    level: Level,
) -> Result<FetchStarted, IqmsError> {
    let key = role.key(level)?;
    let filter = role.filter(level)?;
    let settings = state.class_settings(class).await;

    let board_key = status_key(class, &key);
    state.board.set_loading(&board_key);

    let (tx, rx) = oneshot::channel();
    let sink = ActionSink {
        class,
        key: key.clone(),
        status_key: board_key,
        store: state.stores.get(settings.store),
        board: state.board.clone(),
        events: state.events.clone(),
        first_page: Some(tx),
    };

    let background = tokio::spawn(run_fetch(
        state.source.clone(),
        settings.strategy,
        filter,
        state.shutdown.child_token(),
        sink,
    ));

    match rx.await {
        Ok(Ok(count)) => Ok(FetchStarted {
            class,
            key,
            first_page_item_count: count,
            background,
        }),
        Ok(Err(e)) => Err(e),
        Err(_) => Err(IqmsError::Task(format!(
            "{} fetch for {} stopped before its first page",
            class, key
        ))),
    }
}

async fn run_fetch(
    source: Arc<dyn QuerySource>,
    strategy: FetchStrategy,
    filter: RoleFilter,
    cancel: CancellationToken,
    mut sink: ActionSink,
) {
    let class = sink.class;
    let key = sink.key.clone();
    let board_key = sink.status_key.clone();

    let result = match strategy {
        FetchStrategy::Incremental => {
            let request = PageRequest {
                resource: class.resource().to_string(),
                key: key.clone(),
            };
            fetch_paged(source.as_ref(), &request, &cancel, &mut sink).await
        }
        FetchStrategy::Batch => {
            let request = BatchRequest {
                query_name: class.query_name().to_string(),
                query_type: class.resource().to_string(),
                module_cat: filter.module_cat.clone(),
                routing_field: class.routing_field().to_string(),
                routing_code: filter.dept_code.clone(),
                cell: filter.cell_filter(),
            };
            match cancellable(&cancel, source.fetch_batch(&request)).await {
                Ok(items) => {
                    sink.on_page(&items, &items).await;
                    Ok(items)
                }
                Err(e) => Err(e),
            }
        }
    };

    match result {
        Ok(items) => {
            info!("{} {}: {} items", class, key, items.len());
            sink.board.set_success(&board_key, items);
        }
        Err(e) => {
            sink.board.set_error(&board_key, e.to_string());
            match sink.first_page.take() {
                Some(tx) => {
                    let _ = tx.send(Err(e));
                }
                None => warn!("{} {} failed after first page: {}", class, key, e),
            }
        }
    }
}

/// Fetch every data class for one level concurrently
pub async fn fetch_all_classes(
    state: &AppState,
    role: &ActiveRole,
    level: Level,
) -> Vec<(QueryClass, Result<FetchStarted, IqmsError>)> {
    let fetches = QueryClass::ALL.iter().map(|class| async move {
        (*class, fetch_class(state, *class, role, level).await)
    });
    join_all(fetches).await
}

/// Fetch every data class for one level and wait until all paging is done
///
/// `on_started` sees each class once its first page has landed or its fetch
/// failed. The background pages belong to the runtime, so a caller that exits
/// before they finish leaves the cache holding only the first page.
pub async fn sync_all_classes<F>(
    state: &AppState,
    role: &ActiveRole,
    level: Level,
    mut on_started: F,
) -> Vec<(QueryClass, Result<(), IqmsError>)>
where
    F: FnMut(QueryClass, &Result<FetchStarted, IqmsError>),
{
    let mut outcomes = Vec::new();
    for (class, result) in fetch_all_classes(state, role, level).await {
        on_started(class, &result);
        let outcome = match result {
            Ok(fetch) => fetch.finished().await,
            Err(e) => Err(e),
        };
        outcomes.push((class, outcome));
    }
    outcomes
}

/// Seed the board with whatever the stores hold for this role
///
/// Returns the number of keys restored. A class whose store can't be read is
/// logged and skipped.
pub async fn restore_cached(state: &AppState, role: &ActiveRole) -> Result<usize, IqmsError> {
    let keys = role.all_keys()?;
    let mut restored = 0;

    for class in QueryClass::ALL {
        let store = state.store_for(class).await;
        let cached = match store.load(class.namespace()).await {
            Ok(cached) => cached,
            Err(e) => {
                warn!("could not restore cached {}: {}", class, e);
                continue;
            }
        };
        for key in &keys {
            if let Some(items) = cached.get(key) {
                state.board.hydrate(&status_key(class, key), items.clone());
                restored += 1;
            }
        }
    }

    Ok(restored)
}
