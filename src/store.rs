//! SQLite-backed flag and performance tables.
//!
//! All queries run inside `spawn_blocking` so the async runtime never waits
//! on SQLite I/O.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use hdrhistogram::Histogram;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use thiserror::Error;
use tokio::task;

use crate::metrics::summary::{latency_histogram, record_millis};
use crate::metrics::LatencySummary;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS flagship (
    id        INTEGER PRIMARY KEY AUTOINCREMENT,
    name      TEXT    NOT NULL DEFAULT '',
    kind      TEXT    NOT NULL DEFAULT 'boolean',
    value     INTEGER DEFAULT 0,
    timestamp TEXT    NOT NULL DEFAULT (current_timestamp)
);
CREATE TABLE IF NOT EXISTS performance (
    id        INTEGER PRIMARY KEY AUTOINCREMENT,
    name      TEXT    NOT NULL DEFAULT '',
    value     REAL    NOT NULL,
    timestamp TEXT    NOT NULL DEFAULT (current_timestamp)
);
CREATE INDEX IF NOT EXISTS performance_name_idx ON performance (name);
";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("connection pool: {0}")]
    Pool(#[from] r2d2::Error),
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("blocking task failed: {0}")]
    Join(#[from] task::JoinError),
}

/// A row of the `flagship` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlagRow {
    pub id: i64,
    pub name: String,
    pub kind: String,
    pub value: Option<bool>,
    pub timestamp: String,
}

/// A stored latency sample. `value` is milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceRow {
    pub id: i64,
    pub name: String,
    pub value: f64,
    pub timestamp: String,
}

/// Cloneable handle over a pooled SQLite database.
#[derive(Clone)]
pub struct FlagStore {
    pool: Pool<SqliteConnectionManager>,
}

impl FlagStore {
    pub fn open(path: impl AsRef<Path>, pool_size: u32) -> Result<Self, StoreError> {
        let manager = SqliteConnectionManager::file(path).with_init(|conn| {
            conn.busy_timeout(Duration::from_secs(5))?;
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
                row.get::<_, String>(0)
            })?;
            Ok(())
        });
        let pool = Pool::builder().max_size(pool_size.max(1)).build(manager)?;
        Ok(Self { pool })
    }

    /// Create both tables if they are missing. Safe to call on every start.
    pub fn migrate(&self) -> Result<(), StoreError> {
        let conn = self.pool.get()?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// All flag rows with the given id (zero or one).
    pub async fn flags_by_id(&self, id: i64) -> Result<Vec<FlagRow>, StoreError> {
        self.blocking(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, kind, value, timestamp FROM flagship WHERE id = ?1",
            )?;
            let rows = stmt.query_map(params![id], |row| {
                Ok(FlagRow {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    kind: row.get(2)?,
                    value: row.get(3)?,
                    timestamp: row.get(4)?,
                })
            })?;
            rows.collect::<Result<Vec<_>, _>>().map_err(StoreError::from)
        })
        .await
    }

    /// Insert a flag unless the table already holds one. Returns whether a row was written.
    pub async fn ensure_flag(
        &self,
        name: &str,
        kind: &str,
        value: bool,
    ) -> Result<bool, StoreError> {
        let name = name.to_owned();
        let kind = kind.to_owned();
        self.blocking(move |conn| {
            let existing: Option<i64> = conn
                .query_row("SELECT id FROM flagship LIMIT 1", [], |row| row.get(0))
                .optional()?;
            if existing.is_some() {
                return Ok(false);
            }
            conn.execute(
                "INSERT INTO flagship (name, kind, value) VALUES (?1, ?2, ?3)",
                params![name, kind, value],
            )?;
            Ok(true)
        })
        .await
    }

    pub async fn insert_performance(&self, name: &str, latency_ms: f64) -> Result<(), StoreError> {
        let name = name.to_owned();
        self.blocking(move |conn| {
            conn.execute(
                "INSERT INTO performance (name, value) VALUES (?1, ?2)",
                params![name, latency_ms],
            )?;
            Ok(())
        })
        .await
    }

    /// Newest samples first, optionally filtered by name.
    pub async fn recent_performance(
        &self,
        name: Option<String>,
        limit: u32,
    ) -> Result<Vec<PerformanceRow>, StoreError> {
        self.blocking(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, value, timestamp FROM performance
                 WHERE (?1 IS NULL OR name = ?1)
                 ORDER BY id DESC
                 LIMIT ?2",
            )?;
            let rows = stmt.query_map(params![name, limit], |row| {
                Ok(PerformanceRow {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    value: row.get(2)?,
                    timestamp: row.get(3)?,
                })
            })?;
            rows.collect::<Result<Vec<_>, _>>().map_err(StoreError::from)
        })
        .await
    }

    /// Per-name latency summaries over samples recorded at or after `since`
    /// (`YYYY-MM-DD HH:MM:SS`, UTC), or over all of them. Rows are folded
    /// into histograms as they are read, so memory stays per name.
    pub async fn performance_summary(
        &self,
        since: Option<String>,
    ) -> Result<BTreeMap<String, LatencySummary>, StoreError> {
        self.blocking(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT name, value FROM performance
                 WHERE (?1 IS NULL OR timestamp >= ?1)",
            )?;
            let mut rows = stmt.query(params![since])?;

            let mut histograms: BTreeMap<String, Histogram<u64>> = BTreeMap::new();
            while let Some(row) = rows.next()? {
                let name: String = row.get(0)?;
                let latency_ms: f64 = row.get(1)?;
                let hist = histograms.entry(name).or_insert_with(latency_histogram);
                record_millis(hist, latency_ms);
            }

            Ok(histograms
                .into_iter()
                .map(|(name, hist)| (name, LatencySummary::from_histogram(&hist)))
                .collect())
        })
        .await
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let pool = self.pool.clone();
        task::spawn_blocking(move || {
            let conn: PooledConnection<SqliteConnectionManager> = pool.get()?;
            f(&*conn)
        })
        .await?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_store() -> (FlagStore, TempDir) {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = FlagStore::open(dir.path().join("flags.db"), 2).expect("open store");
        store.migrate().expect("migrate");
        (store, dir)
    }

    #[test]
    fn migrate_is_idempotent() {
        let (store, _dir) = open_store();
        store.migrate().unwrap();
        store.migrate().unwrap();
    }

    #[tokio::test]
    async fn unknown_flag_id_yields_no_rows() {
        let (store, _dir) = open_store();
        assert!(store.flags_by_id(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn ensure_flag_writes_only_into_empty_table() {
        let (store, _dir) = open_store();

        assert!(store.ensure_flag("iswinter", "boolean", true).await.unwrap());
        assert!(!store.ensure_flag("other", "boolean", false).await.unwrap());

        let rows = store.flags_by_id(1).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "iswinter");
        assert_eq!(rows[0].kind, "boolean");
        assert_eq!(rows[0].value, Some(true));
        assert!(!rows[0].timestamp.is_empty());
    }

    #[tokio::test]
    async fn recent_performance_is_newest_first_and_filtered() {
        let (store, _dir) = open_store();
        store.insert_performance("kv", 1.5).await.unwrap();
        store.insert_performance("d1", 2.25).await.unwrap();
        store.insert_performance("kv", 3.0).await.unwrap();

        let all = store.recent_performance(None, 10).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].value, 3.0);

        let kv = store.recent_performance(Some("kv".into()), 10).await.unwrap();
        assert_eq!(kv.len(), 2);
        assert!(kv.iter().all(|row| row.name == "kv"));

        let limited = store.recent_performance(None, 1).await.unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[tokio::test]
    async fn summary_groups_by_name_and_respects_since() {
        let (store, _dir) = open_store();
        store.insert_performance("cc", 4.0).await.unwrap();
        store.insert_performance("cc", 2.0).await.unwrap();
        store.insert_performance("kv", 1.0).await.unwrap();

        let all = store.performance_summary(None).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all["cc"].count, 2);
        assert!((all["cc"].max_ms - 4.0).abs() < 0.01);
        assert_eq!(all["kv"].count, 1);

        let future = store
            .performance_summary(Some("2999-01-01 00:00:00".into()))
            .await
            .unwrap();
        assert!(future.is_empty());

        let past = store
            .performance_summary(Some("2000-01-01 00:00:00".into()))
            .await
            .unwrap();
        assert_eq!(past["cc"].count, 2);
    }
}
