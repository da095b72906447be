//! 测试用的脚本化数据源
#![allow(dead_code)]

use async_trait::async_trait;
use iqms_sync::domain::error::IqmsError;
use iqms_sync::domain::model::{BatchRequest, Page, PageRequest, QueryItem};
use iqms_sync::domain::role::{ActiveRole, Level, Module};
use iqms_sync::domain::traits::{CacheStore, QuerySource};
use iqms_sync::infrastructure::config::Config;
use iqms_sync::infrastructure::storage::cache::MemoryStore;
use iqms_sync::state::{AppState, Stores};
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

pub enum Step {
    Page(Page),
    Fail(String),
}

/// Query source that replays scripted pages per role key
#[derive(Default)]
pub struct ScriptedSource {
    pages: Mutex<HashMap<String, VecDeque<Step>>>,
    batches: Mutex<HashMap<String, Result<Vec<QueryItem>, String>>>,
    pub page_requests: Mutex<Vec<(String, usize)>>,
    pub batch_requests: Mutex<Vec<BatchRequest>>,
    /// Requests past offset 0 wait for a permit when set
    gate: Option<Arc<Semaphore>>,
    faq_failures_left: AtomicU32,
    pub faq_calls: AtomicU32,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gated(gate: Arc<Semaphore>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::default()
        }
    }

    pub fn script(&self, key: &str, steps: Vec<Step>) {
        self.pages
            .lock()
            .unwrap()
            .entry(key.to_string())
            .or_default()
            .extend(steps);
    }

    pub fn script_batch(&self, routing_code: &str, result: Result<Vec<QueryItem>, String>) {
        self.batches
            .lock()
            .unwrap()
            .insert(routing_code.to_string(), result);
    }

    pub fn fail_faq(&self, times: u32) {
        self.faq_failures_left.store(times, Ordering::SeqCst);
    }

    pub fn offsets_for(&self, key: &str) -> Vec<usize> {
        self.page_requests
            .lock()
            .unwrap()
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, offset)| *offset)
            .collect()
    }
}

#[async_trait]
impl QuerySource for ScriptedSource {
    async fn fetch_page(&self, request: &PageRequest, offset: usize) -> Result<Page, IqmsError> {
        self.page_requests
            .lock()
            .unwrap()
            .push((request.key.clone(), offset));

        if offset > 0 {
            if let Some(gate) = &self.gate {
                gate.acquire().await.unwrap().forget();
            }
        }

        let step = self
            .pages
            .lock()
            .unwrap()
            .get_mut(&request.key)
            .and_then(|steps| steps.pop_front());
        match step {
            Some(Step::Page(page)) => Ok(page),
            Some(Step::Fail(message)) => Err(IqmsError::Api(message)),
            None => Ok(Page::default()),
        }
    }

    async fn fetch_batch(&self, request: &BatchRequest) -> Result<Vec<QueryItem>, IqmsError> {
        self.batch_requests.lock().unwrap().push(request.clone());
        match self.batches.lock().unwrap().get(&request.routing_code) {
            Some(Ok(items)) => Ok(items.clone()),
            Some(Err(message)) => Err(IqmsError::Api(message.clone())),
            None => Ok(Vec::new()),
        }
    }

    async fn fetch_faq(&self) -> Result<Vec<QueryItem>, IqmsError> {
        self.faq_calls.fetch_add(1, Ordering::SeqCst);
        let left = self.faq_failures_left.load(Ordering::SeqCst);
        if left > 0 {
            self.faq_failures_left.store(left - 1, Ordering::SeqCst);
            return Err(IqmsError::Api("faq unavailable".to_string()));
        }
        Ok(vec![json!({"q": "How do I raise a pay query?"})])
    }

    async fn fetch_frequency_count(&self, key: &str) -> Result<u64, IqmsError> {
        Ok(key.len() as u64)
    }
}

pub fn items(ids: std::ops::Range<u32>) -> Vec<Value> {
    ids.map(|id| json!({"queryId": id, "serviceNo": format!("JC-{}", 1000 + id)}))
        .collect()
}

pub fn page(items: Vec<Value>, has_more: bool, limit: Option<usize>) -> Step {
    Step::Page(Page {
        count: Some(items.len()),
        items,
        has_more,
        limit,
    })
}

/// `pay-accounts` / pay role: keys U1A, U2A, U3A
pub fn pay_role() -> ActiveRole {
    ActiveRole {
        subsection: "pay-accounts".to_string(),
        module: Module::Pay,
        level: Level::Creator,
        cells: vec!["C1".to_string()],
    }
}

pub fn test_config() -> Config {
    let mut config = Config::default();
    config.retry.retry_delay_ms = 1;
    config
}

pub fn state_with(source: Arc<ScriptedSource>, config: Config) -> (AppState, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let shared: Arc<dyn CacheStore> = store.clone();
    let state = AppState::new(config, source, Stores::shared(shared));
    (state, store)
}
