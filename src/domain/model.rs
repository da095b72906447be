use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// One personnel query as returned by the server.
///
/// The record is passed through untouched; the client never validates its shape.
pub type QueryItem = Value;

// 缓存条目：一个 key 对应一组查询
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheEntry {
    pub key: String,
    pub items: Vec<QueryItem>,
    pub saved_at: Option<i64>,
}

/// In-memory status for one key. Loading and error flags are never persisted.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct FetchStatus {
    pub loading: bool,
    pub error: Option<String>,
    pub items: Vec<QueryItem>,
}

/// The three data classes the client keeps in sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum QueryClass {
    Pending,
    Transferred,
    Replied,
}

impl QueryClass {
    pub const ALL: [QueryClass; 3] = [
        QueryClass::Pending,
        QueryClass::Transferred,
        QueryClass::Replied,
    ];

    /// Storage namespace. The version suffix lets old and new layouts coexist.
    pub fn namespace(&self) -> &'static str {
        match self {
            QueryClass::Pending => "pending_queries_v2",
            QueryClass::Transferred => "transferred_queries_v2",
            QueryClass::Replied => "replied_queries_v2",
        }
    }

    /// Path segment of the incremental list endpoint.
    pub fn resource(&self) -> &'static str {
        match self {
            QueryClass::Pending => "pending",
            QueryClass::Transferred => "transferred",
            QueryClass::Replied => "replied",
        }
    }

    /// Query name of the batch listing endpoint.
    pub fn query_name(&self) -> &'static str {
        match self {
            QueryClass::Pending => "getPendingQueries",
            QueryClass::Transferred => "getTransferredQueries",
            QueryClass::Replied => "getRepliedQueries",
        }
    }

    /// Body field that carries the routing code in a batch request.
    pub fn routing_field(&self) -> &'static str {
        match self {
            QueryClass::Transferred => "SUB_SECTION",
            QueryClass::Pending | QueryClass::Replied => "PEN_WITH",
        }
    }
}

/// Status board key of a class at a role key, e.g. `pending:U1A`
pub fn status_key(class: QueryClass, key: &str) -> String {
    format!("{}:{}", class.resource(), key)
}

impl fmt::Display for QueryClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.resource())
    }
}

/// One page of an incremental list endpoint.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub items: Vec<QueryItem>,
    pub has_more: bool,
    pub limit: Option<usize>,
    pub count: Option<usize>,
}

impl Page {
    /// Lenient decoding: missing or mistyped fields fall back to an empty final page.
    pub fn from_value(value: &Value) -> Self {
        let items = value
            .get("items")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let has_more = value
            .get("hasMore")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let limit = value
            .get("limit")
            .and_then(Value::as_u64)
            .map(|n| n as usize);
        let count = value
            .get("count")
            .and_then(Value::as_u64)
            .map(|n| n as usize);

        Self {
            items,
            has_more,
            limit,
            count,
        }
    }
}

/// Target of an incremental fetch: `{base}/{resource}/{key}?offset=N`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub resource: String,
    pub key: String,
}

/// Target and filters of a batch listing call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchRequest {
    pub query_name: String,
    pub query_type: String,
    pub module_cat: String,
    pub routing_field: String,
    pub routing_code: String,
    pub cell: String,
}

/// Published after every cache write so that dashboards can refresh counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheWritten {
    pub namespace: String,
    pub key: String,
    pub count: usize,
}
