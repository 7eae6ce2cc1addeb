//! Notification configuration store abstraction.
//!
//! The pipeline fetches one persisted [`NotificationConfigRecord`] per enabled
//! rule on every run. Records are read-only from this crate's point of view
//! and never cached.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::StoreConfig;
use crate::postgres::PostgresPool;
use crate::submission::{FieldId, NotificationId};

use super::postgres_store::PostgresConfigStore;

/// Errors that can occur while fetching notification configuration.
#[derive(Debug, Error)]
pub enum StoreError {
    /// PostgreSQL operation failed
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// Backend is temporarily unavailable
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Persisted companion record of a notification rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationConfigRecord {
    pub id: NotificationId,
    pub to_field_id: Option<FieldId>,
    pub from_field_id: Option<FieldId>,
}

impl NotificationConfigRecord {
    /// A record that contributes no field references
    pub fn empty(id: NotificationId) -> Self {
        Self {
            id,
            to_field_id: None,
            from_field_id: None,
        }
    }
}

/// Read-only lookup of notification configuration by id
#[async_trait]
pub trait NotificationConfigStore: Send + Sync {
    /// Fetch the record for a notification rule, `None` if it does not exist
    async fn find_by_id(
        &self,
        id: NotificationId,
    ) -> Result<Option<NotificationConfigRecord>, StoreError>;

    /// Backend name for logging and health output
    fn name(&self) -> &'static str;
}

/// In-memory configuration store
#[derive(Debug, Default)]
pub struct MemoryConfigStore {
    records: DashMap<NotificationId, NotificationConfigRecord>,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a record
    pub fn insert(&self, record: NotificationConfigRecord) {
        self.records.insert(record.id, record);
    }

    /// Remove a record, returning it if present
    pub fn remove(&self, id: NotificationId) -> Option<NotificationConfigRecord> {
        self.records.remove(&id).map(|(_, record)| record)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl FromIterator<NotificationConfigRecord> for MemoryConfigStore {
    fn from_iter<I: IntoIterator<Item = NotificationConfigRecord>>(iter: I) -> Self {
        let store = Self::new();
        for record in iter {
            store.insert(record);
        }
        store
    }
}

#[async_trait]
impl NotificationConfigStore for MemoryConfigStore {
    async fn find_by_id(
        &self,
        id: NotificationId,
    ) -> Result<Option<NotificationConfigRecord>, StoreError> {
        Ok(self.records.get(&id).map(|entry| entry.value().clone()))
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

/// Create a configuration store based on settings.
///
/// - `"postgres"`: a [`PostgresConfigStore`] if a pool is provided
/// - `"memory"` (default): an empty [`MemoryConfigStore`]
pub fn create_config_store(
    settings: &StoreConfig,
    postgres_pool: Option<PostgresPool>,
) -> Arc<dyn NotificationConfigStore> {
    match settings.backend.as_str() {
        "postgres" => {
            if let Some(pool) = postgres_pool {
                tracing::info!(
                    backend = "postgres",
                    database = %pool.database_url_masked(),
                    "Creating PostgreSQL notification config store"
                );
                Arc::new(PostgresConfigStore::new(pool))
            } else {
                tracing::warn!(
                    "PostgreSQL config store requested but no pool provided, falling back to memory"
                );
                Arc::new(MemoryConfigStore::new())
            }
        }
        _ => {
            tracing::info!(backend = "memory", "Creating memory notification config store");
            Arc::new(MemoryConfigStore::new())
        }
    }
}
