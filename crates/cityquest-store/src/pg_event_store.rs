//! `PostgreSQL` implementation of the `EventStore` trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;
use uuid::Uuid;

use cityquest_core::error::DomainError;
use cityquest_core::platform::Platform;
use cityquest_core::repository::{EventStore, StoredEvent};

use crate::db_error;

const SELECT_EVENTS: &str = r"
SELECT event_id, aggregate_id, user_id, quest_id, event_type, event_data,
       platform, correlation_id, occurred_at
FROM progress_events
";

#[derive(sqlx::FromRow)]
struct EventRow {
    event_id: Uuid,
    aggregate_id: Uuid,
    user_id: Uuid,
    quest_id: Uuid,
    event_type: String,
    event_data: serde_json::Value,
    platform: Json<Platform>,
    correlation_id: Uuid,
    occurred_at: DateTime<Utc>,
}

impl From<EventRow> for StoredEvent {
    fn from(row: EventRow) -> Self {
        Self {
            event_id: row.event_id,
            aggregate_id: row.aggregate_id,
            user_id: row.user_id,
            quest_id: row.quest_id,
            event_type: row.event_type,
            event_data: row.event_data,
            platform: row.platform.0,
            correlation_id: row.correlation_id,
            occurred_at: row.occurred_at,
        }
    }
}

/// PostgreSQL-backed append-only event store.
#[derive(Debug, Clone)]
pub struct PgEventStore {
    pool: PgPool,
}

impl PgEventStore {
    /// Creates a new `PgEventStore`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Loads events whose `column` equals `id`, oldest first. Ties on
    /// `occurred_at` keep insertion order.
    async fn load_where(&self, column: &str, id: Uuid) -> Result<Vec<StoredEvent>, DomainError> {
        let sql =
            format!("{SELECT_EVENTS} WHERE {column} = $1 ORDER BY occurred_at, global_position");
        let rows = sqlx::query_as::<_, EventRow>(&sql)
            .bind(id)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(rows.into_iter().map(StoredEvent::from).collect())
    }
}

#[async_trait]
impl EventStore for PgEventStore {
    async fn append(&self, event: &StoredEvent) -> Result<(), DomainError> {
        sqlx::query(
            r"
            INSERT INTO progress_events
                (event_id, aggregate_id, user_id, quest_id, event_type, event_data,
                 platform, correlation_id, occurred_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ",
        )
        .bind(event.event_id)
        .bind(event.aggregate_id)
        .bind(event.user_id)
        .bind(event.quest_id)
        .bind(&event.event_type)
        .bind(&event.event_data)
        .bind(Json(&event.platform))
        .bind(event.correlation_id)
        .bind(event.occurred_at)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        tracing::debug!(
            event_id = %event.event_id,
            event_type = %event.event_type,
            "appended progress event"
        );
        Ok(())
    }

    async fn load_by_aggregate_id(
        &self,
        aggregate_id: Uuid,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        self.load_where("aggregate_id", aggregate_id).await
    }

    async fn load_by_user_id(&self, user_id: Uuid) -> Result<Vec<StoredEvent>, DomainError> {
        self.load_where("user_id", user_id).await
    }

    async fn load_by_quest_id(&self, quest_id: Uuid) -> Result<Vec<StoredEvent>, DomainError> {
        self.load_where("quest_id", quest_id).await
    }
}
