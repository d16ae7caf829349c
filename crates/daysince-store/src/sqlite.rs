//! SQLite-backed `IncidentStore` implementation with durable persistence.

use crate::{
    IncidentLogEntry, IncidentRecord, IncidentStore, IncidentStoreError, StoreResult,
    LAST_INCIDENT_CONTENT_KEY, LAST_INCIDENT_TIME_KEY,
};
use async_trait::async_trait;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, Connection, TransactionBehavior};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_SQLITE_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Persistent SQLite store backend for the incident singleton and history log.
///
/// Lock waits are bounded by the connection busy timeout, so a write either
/// commits or fails with `SQLITE_BUSY` before the caller gives up on it.
#[derive(Debug, Clone)]
pub struct SqliteIncidentStore {
    db_path: PathBuf,
    busy_timeout: Duration,
}

impl SqliteIncidentStore {
    /// Creates a SQLite-backed store at `path`, creating schema if needed.
    pub fn new(path: impl AsRef<Path>) -> StoreResult<Self> {
        let db_path = path.as_ref().to_path_buf();
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let store = Self {
            db_path,
            busy_timeout: DEFAULT_SQLITE_BUSY_TIMEOUT,
        };
        let connection = open_connection(&store.db_path, store.busy_timeout)?;
        initialize_schema(&connection)?;
        Ok(store)
    }

    /// Overrides how long a statement waits on another connection's lock.
    pub fn with_busy_timeout(mut self, busy_timeout: Duration) -> Self {
        self.busy_timeout = busy_timeout.max(Duration::from_millis(1));
        self
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn busy_timeout(&self) -> Duration {
        self.busy_timeout
    }

    async fn with_connection<T, F>(&self, operation: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> StoreResult<T> + Send + 'static,
    {
        let db_path = self.db_path.clone();
        let busy_timeout = self.busy_timeout;
        tokio::task::spawn_blocking(move || {
            let mut connection = open_connection(&db_path, busy_timeout)?;
            operation(&mut connection)
        })
        .await?
    }
}

fn open_connection(db_path: &Path, busy_timeout: Duration) -> StoreResult<Connection> {
    let connection = Connection::open(db_path)?;
    connection.busy_timeout(busy_timeout)?;
    connection.execute_batch(
        r#"
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        "#,
    )?;
    Ok(connection)
}

fn initialize_schema(connection: &Connection) -> StoreResult<()> {
    connection.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS "last-fup" (
            key TEXT PRIMARY KEY,
            value NOT NULL
        );

        CREATE TABLE IF NOT EXISTS "all-fups" (
            hash TEXT PRIMARY KEY,
            "fup-time" INTEGER NOT NULL,
            "fup-content" TEXT NOT NULL
        );
        "#,
    )?;
    Ok(())
}

#[async_trait]
impl IncidentStore for SqliteIncidentStore {
    async fn get_last(&self) -> StoreResult<Option<IncidentRecord>> {
        self.with_connection(|connection| {
            let mut statement =
                connection.prepare(r#"SELECT key, value FROM "last-fup" WHERE key IN (?1, ?2)"#)?;
            let rows = statement.query_map(
                params![LAST_INCIDENT_TIME_KEY, LAST_INCIDENT_CONTENT_KEY],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, SqlValue>(1)?)),
            )?;

            let mut last_time = None;
            let mut last_description = None;
            for row in rows {
                let (key, value) = row?;
                if key == LAST_INCIDENT_TIME_KEY {
                    last_time = Some(time_from_db(value)?);
                } else if key == LAST_INCIDENT_CONTENT_KEY {
                    last_description = Some(description_from_db(value)?);
                }
            }

            match (last_time, last_description) {
                (Some(last_time), Some(last_description)) => Ok(Some(IncidentRecord {
                    last_time,
                    last_description,
                })),
                (None, None) => Ok(None),
                (last_time, _) => {
                    warn!(
                        has_time = last_time.is_some(),
                        "incident singleton is only partially written"
                    );
                    Ok(None)
                }
            }
        })
        .await
    }

    async fn set_last(&self, time: i64, description: &str) -> StoreResult<IncidentLogEntry> {
        let entry = IncidentLogEntry::new(time, description);
        let written = entry.clone();
        self.with_connection(move |connection| {
            let transaction =
                connection.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let upsert = r#"
                INSERT INTO "last-fup" (key, value) VALUES (?1, ?2)
                ON CONFLICT(key) DO UPDATE SET value = excluded.value
            "#;
            transaction.execute(upsert, params![LAST_INCIDENT_TIME_KEY, written.time])?;
            transaction.execute(
                upsert,
                params![LAST_INCIDENT_CONTENT_KEY, written.description],
            )?;
            transaction.execute(
                r#"INSERT INTO "all-fups" (hash, "fup-time", "fup-content") VALUES (?1, ?2, ?3)"#,
                params![written.id, written.time, written.description],
            )?;
            transaction.commit()?;
            Ok(())
        })
        .await?;
        Ok(entry)
    }

    async fn list_history(&self) -> StoreResult<Vec<IncidentLogEntry>> {
        self.with_connection(|connection| {
            let mut statement = connection.prepare(
                r#"SELECT hash, "fup-time", "fup-content" FROM "all-fups" ORDER BY rowid"#,
            )?;
            let rows = statement.query_map([], |row| {
                Ok(IncidentLogEntry {
                    id: row.get(0)?,
                    time: row.get(1)?,
                    description: row.get(2)?,
                })
            })?;
            let mut entries = Vec::new();
            for row in rows {
                entries.push(row?);
            }
            Ok(entries)
        })
        .await
    }
}

fn time_from_db(value: SqlValue) -> StoreResult<i64> {
    match value {
        SqlValue::Integer(time) => Ok(time),
        other => Err(IncidentStoreError::InvalidPersistedValue {
            key: LAST_INCIDENT_TIME_KEY,
            value: format!("{other:?}"),
        }),
    }
}

fn description_from_db(value: SqlValue) -> StoreResult<String> {
    match value {
        SqlValue::Text(description) => Ok(description),
        other => Err(IncidentStoreError::InvalidPersistedValue {
            key: LAST_INCIDENT_CONTENT_KEY,
            value: format!("{other:?}"),
        }),
    }
}
