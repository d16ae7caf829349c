//! Incident store abstractions and in-memory backend.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

mod sqlite;

pub use sqlite::{SqliteIncidentStore, DEFAULT_SQLITE_BUSY_TIMEOUT};

/// Description persisted when a reset does not name a reason.
pub const UNKNOWN_INCIDENT_DESCRIPTION: &str = "Unknown";
/// Singleton key holding the midnight-truncated time of the last incident.
pub const LAST_INCIDENT_TIME_KEY: &str = "last-fup-time";
/// Singleton key holding the description of the last incident.
pub const LAST_INCIDENT_CONTENT_KEY: &str = "last-fup-content";

/// Result type for incident store operations.
pub type StoreResult<T> = Result<T, IncidentStoreError>;

/// Errors returned by store implementations.
#[derive(Debug, Error)]
pub enum IncidentStoreError {
    #[error("invalid persisted value for '{key}': {value}")]
    InvalidPersistedValue { key: &'static str, value: String },
    #[error("store operation timed out after {0} ms")]
    Timeout(u64),
    #[error("store worker task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Most recent incident, projected from the history log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidentRecord {
    pub last_time: i64,
    pub last_description: String,
}

/// One immutable history row appended by every reset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidentLogEntry {
    pub time: i64,
    pub description: String,
    pub id: String,
}

impl IncidentLogEntry {
    /// Builds an entry with a freshly generated random identifier.
    pub fn new(time: i64, description: impl Into<String>) -> Self {
        Self {
            time,
            description: description.into(),
            id: Uuid::new_v4().to_string(),
        }
    }
}

/// Async store contract used by the interaction router.
#[async_trait]
pub trait IncidentStore: Send + Sync {
    /// Reads the last incident. `Ok(None)` covers both "never written" and a
    /// singleton with only one of its two keys present.
    async fn get_last(&self) -> StoreResult<Option<IncidentRecord>>;

    /// Overwrites the singleton and appends one history entry as a single unit.
    async fn set_last(&self, time: i64, description: &str) -> StoreResult<IncidentLogEntry>;

    /// Returns the history log in insertion order.
    async fn list_history(&self) -> StoreResult<Vec<IncidentLogEntry>>;
}

/// In-memory implementation for tests and ephemeral deployments.
#[derive(Debug, Default)]
pub struct InMemoryIncidentStore {
    inner: RwLock<StoreInner>,
}

#[derive(Debug, Default)]
struct StoreInner {
    last: Option<IncidentRecord>,
    history: Vec<IncidentLogEntry>,
}

impl InMemoryIncidentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IncidentStore for InMemoryIncidentStore {
    async fn get_last(&self) -> StoreResult<Option<IncidentRecord>> {
        Ok(self.inner.read().await.last.clone())
    }

    async fn set_last(&self, time: i64, description: &str) -> StoreResult<IncidentLogEntry> {
        let entry = IncidentLogEntry::new(time, description);
        let mut inner = self.inner.write().await;
        inner.last = Some(IncidentRecord {
            last_time: time,
            last_description: description.to_string(),
        });
        inner.history.push(entry.clone());
        Ok(entry)
    }

    async fn list_history(&self) -> StoreResult<Vec<IncidentLogEntry>> {
        Ok(self.inner.read().await.history.clone())
    }
}
