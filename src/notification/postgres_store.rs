//! PostgreSQL-backed notification configuration store.
//!
//! Reads the `form_notification` table:
//!
//! ```sql
//! CREATE TABLE form_notification (
//!     id            BIGINT PRIMARY KEY,
//!     to_field_id   BIGINT NULL,
//!     from_field_id BIGINT NULL
//! );
//! ```

use async_trait::async_trait;

use crate::postgres::PostgresPool;
use crate::submission::NotificationId;

use super::store::{NotificationConfigRecord, NotificationConfigStore, StoreError};

const FIND_BY_ID_SQL: &str =
    "SELECT id, to_field_id, from_field_id FROM form_notification WHERE id = $1";

#[derive(Debug, sqlx::FromRow)]
struct NotificationRow {
    id: i64,
    to_field_id: Option<i64>,
    from_field_id: Option<i64>,
}

impl From<NotificationRow> for NotificationConfigRecord {
    fn from(row: NotificationRow) -> Self {
        Self {
            id: row.id,
            to_field_id: row.to_field_id,
            from_field_id: row.from_field_id,
        }
    }
}

/// Configuration store reading persisted notification records from PostgreSQL
pub struct PostgresConfigStore {
    pool: PostgresPool,
}

impl PostgresConfigStore {
    pub fn new(pool: PostgresPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationConfigStore for PostgresConfigStore {
    #[tracing::instrument(name = "config_store.find_by_id", skip(self))]
    async fn find_by_id(
        &self,
        id: NotificationId,
    ) -> Result<Option<NotificationConfigRecord>, StoreError> {
        let row: Option<NotificationRow> = sqlx::query_as(FIND_BY_ID_SQL)
            .bind(id)
            .fetch_optional(self.pool.pool())
            .await?;

        Ok(row.map(NotificationConfigRecord::from))
    }

    fn name(&self) -> &'static str {
        "postgres"
    }
}
