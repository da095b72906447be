use crate::domain::error::IqmsError;
use crate::domain::model::{CacheEntry, QueryItem};
use crate::domain::traits::CacheStore;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use tokio_rusqlite::Connection;
use tracing::warn;

pub async fn init_database(db_path: &Path) -> Result<Connection, IqmsError> {
    let db = Connection::open(db_path.to_path_buf())
        .await
        .map_err(tokio_rusqlite::Error::from)?;
    create_schema(&db).await?;
    Ok(db)
}

/// Open a throwaway in-memory database with the cache schema
pub async fn init_memory_database() -> Result<Connection, IqmsError> {
    let db = Connection::open_in_memory()
        .await
        .map_err(tokio_rusqlite::Error::from)?;
    create_schema(&db).await?;
    Ok(db)
}

async fn create_schema(db: &Connection) -> Result<(), IqmsError> {
    db.call(|conn| -> rusqlite::Result<()> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS entries (
                namespace TEXT NOT NULL,
                key TEXT NOT NULL,
                data BLOB NOT NULL,
                item_count INTEGER NOT NULL,
                original_size INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                PRIMARY KEY (namespace, key)
            )",
            [],
        )?;

        Ok(())
    })
    .await?;

    Ok(())
}

/// Object store for large item lists
///
/// Each (namespace, key) is one row holding the zstd-compressed JSON array.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// Entries of a namespace with their save time, sorted by key
    pub async fn entries(&self, namespace: &str) -> Result<Vec<CacheEntry>, IqmsError> {
        let rows = load_rows(&self.conn, namespace).await?;
        let mut entries: Vec<CacheEntry> = rows
            .into_iter()
            .filter_map(|(key, data, updated_at)| {
                decode_items(namespace, &key, &data).map(|items| CacheEntry {
                    key,
                    items,
                    saved_at: Some(updated_at),
                })
            })
            .collect();
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(entries)
    }
}

async fn load_rows(
    db: &Connection,
    namespace: &str,
) -> Result<Vec<(String, Vec<u8>, i64)>, IqmsError> {
    use tokio_rusqlite::params;

    let namespace = namespace.to_string();
    let rows = db
        .call(move |conn| -> rusqlite::Result<Vec<(String, Vec<u8>, i64)>> {
            let mut stmt =
                conn.prepare("SELECT key, data, updated_at FROM entries WHERE namespace = ?")?;
            let rows = stmt
                .query_map(params![namespace], |row| {
                    Ok((row.get(0)?, row.get(1)?, row.get(2)?))
                })?
                .collect::<rusqlite::Result<Vec<(String, Vec<u8>, i64)>>>()?;
            Ok(rows)
        })
        .await?;

    Ok(rows)
}

fn encode_items(items: &[QueryItem]) -> Result<(Vec<u8>, usize), IqmsError> {
    use std::io::Cursor;
    use zstd::stream::encode_all;

    let serialized = serde_json::to_vec(items)?;
    let compressed = encode_all(Cursor::new(&serialized), 0)?;
    Ok((compressed, serialized.len()))
}

// Undecodable rows are skipped so that one bad record doesn't hide the rest
fn decode_items(namespace: &str, key: &str, data: &[u8]) -> Option<Vec<QueryItem>> {
    use std::io::Cursor;
    use zstd::stream::decode_all;

    let decompressed = match decode_all(Cursor::new(data)) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("skipping undecodable entry {}/{}: {}", namespace, key, e);
            return None;
        }
    };
    match serde_json::from_slice(&decompressed) {
        Ok(items) => Some(items),
        Err(e) => {
            warn!("skipping corrupt entry {}/{}: {}", namespace, key, e);
            None
        }
    }
}

#[async_trait]
impl CacheStore for SqliteStore {
    async fn load(&self, namespace: &str) -> Result<HashMap<String, Vec<QueryItem>>, IqmsError> {
        let rows = load_rows(&self.conn, namespace).await?;
        Ok(rows
            .into_iter()
            .filter_map(|(key, data, _)| decode_items(namespace, &key, &data).map(|i| (key, i)))
            .collect())
    }

    async fn save(
        &self,
        namespace: &str,
        key: &str,
        items: &[QueryItem],
    ) -> Result<(), IqmsError> {
        use tokio_rusqlite::params;

        let (compressed, original_len) = encode_items(items)?;
        let item_count = items.len();
        let now = chrono::Utc::now().timestamp();
        let namespace = namespace.to_string();
        let key = key.to_string();

        self.conn
            .call(move |conn| -> rusqlite::Result<usize> {
                conn.execute(
                    "INSERT OR REPLACE INTO entries (namespace, key, data, item_count, original_size, updated_at)
                     VALUES (?, ?, ?, ?, ?, ?)",
                    params![namespace, key, compressed, item_count, original_len, now],
                )
            })
            .await?;

        Ok(())
    }

    async fn remove(&self, namespace: &str, key: &str) -> Result<(), IqmsError> {
        use tokio_rusqlite::params;

        let namespace = namespace.to_string();
        let key = key.to_string();
        self.conn
            .call(move |conn| -> rusqlite::Result<usize> {
                conn.execute(
                    "DELETE FROM entries WHERE namespace = ? AND key = ?",
                    params![namespace, key],
                )
            })
            .await?;
        Ok(())
    }

    async fn clear(&self, namespace: &str) -> Result<(), IqmsError> {
        use tokio_rusqlite::params;

        let namespace = namespace.to_string();
        self.conn
            .call(move |conn| -> rusqlite::Result<usize> {
                conn.execute(
                    "DELETE FROM entries WHERE namespace = ?",
                    params![namespace],
                )
            })
            .await?;
        Ok(())
    }
}
