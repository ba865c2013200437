//! Persistence ports.
//!
//! Passive boundaries with no business logic: the progress context decides
//! what to write, these traits only describe how it is read and stored.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;
use crate::platform::Platform;
use crate::status::QuestStatus;

/// Stored representation of a domain event.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredEvent {
    /// Unique event identifier.
    pub event_id: Uuid,
    /// Aggregate this event belongs to.
    pub aggregate_id: Uuid,
    /// The user whose progress changed.
    pub user_id: Uuid,
    /// The quest the progress refers to.
    pub quest_id: Uuid,
    /// Event type name for deserialization routing.
    pub event_type: String,
    /// Kind-specific payload.
    pub event_data: serde_json::Value,
    /// Client platform the event originated from.
    pub platform: Platform,
    /// Correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Timestamp of event creation.
    pub occurred_at: DateTime<Utc>,
}

/// Append-only log of progress events.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Append one event. Prior rows are never updated or deleted.
    async fn append(&self, event: &StoredEvent) -> Result<(), DomainError>;

    /// Events of one aggregate, oldest first.
    async fn load_by_aggregate_id(&self, aggregate_id: Uuid)
    -> Result<Vec<StoredEvent>, DomainError>;

    /// Events of one user across all quests, oldest first.
    async fn load_by_user_id(&self, user_id: Uuid) -> Result<Vec<StoredEvent>, DomainError>;

    /// Events of one quest across all users, oldest first.
    async fn load_by_quest_id(&self, quest_id: Uuid) -> Result<Vec<StoredEvent>, DomainError>;
}

/// Materialized snapshot of one (user, quest) progress aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressRecord {
    /// Aggregate identifier.
    pub id: Uuid,
    /// Owning user.
    pub user_id: Uuid,
    /// Quest being played.
    pub quest_id: Uuid,
    /// Current status.
    pub status: QuestStatus,
    /// Whether the user likes the quest. Written only by the like store.
    pub is_liked: bool,
    /// Set when the quest was completed.
    pub completed_at: Option<DateTime<Utc>>,
    /// When the quest was first started.
    pub created_at: DateTime<Utc>,
    /// Last status change.
    pub updated_at: DateTime<Utc>,
}

/// The parts of a snapshot a writer read before deciding on a change.
///
/// A guarded write only lands if the stored row still matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressVersion {
    /// Aggregate identifier of the row that was read.
    pub id: Uuid,
    /// Status at read time.
    pub status: QuestStatus,
    /// Last status change at read time.
    pub updated_at: DateTime<Utc>,
}

impl ProgressVersion {
    /// The version of `record` as it was read.
    #[must_use]
    pub fn of(record: &ProgressRecord) -> Self {
        Self {
            id: record.id,
            status: record.status,
            updated_at: record.updated_at,
        }
    }

    /// Returns `true` when `record` is still the row this version was taken
    /// from.
    #[must_use]
    pub fn matches(&self, record: &ProgressRecord) -> bool {
        *self == Self::of(record)
    }
}

/// Optional filters for listing a user's progress.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressFilter {
    /// Only rows in this status.
    pub status: Option<QuestStatus>,
    /// Only liked (or only not-liked) rows.
    pub liked: Option<bool>,
}

impl ProgressFilter {
    /// Returns `true` when `record` passes every set filter.
    #[must_use]
    pub fn matches(&self, record: &ProgressRecord) -> bool {
        self.status.is_none_or(|status| record.status == status)
            && self.liked.is_none_or(|liked| record.is_liked == liked)
    }
}

/// Read model of a quest as exposed by the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestSummary {
    /// Quest identifier.
    pub id: Uuid,
    /// Display title.
    pub title: String,
    /// Long description.
    pub description: Option<String>,
    /// City the quest takes place in.
    pub city: Option<String>,
    /// Difficulty label.
    pub difficulty: Option<String>,
    /// Expected duration.
    pub duration_minutes: Option<i32>,
    /// Route length.
    pub distance_km: Option<f64>,
    /// Cover image.
    pub image_url: Option<String>,
    /// Denormalized like counter.
    pub likes_count: i64,
}

/// Read-only access to the quest catalog.
#[async_trait]
pub trait QuestCatalog: Send + Sync {
    /// Looks up a quest.
    async fn find_by_id(&self, quest_id: Uuid) -> Result<Option<QuestSummary>, DomainError>;
}

/// Storage of progress snapshots.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// The snapshot for one (user, quest) pair.
    async fn find_by_user_and_quest(
        &self,
        user_id: Uuid,
        quest_id: Uuid,
    ) -> Result<Option<ProgressRecord>, DomainError>;

    /// The user's active snapshot, if any.
    async fn find_active_by_user(&self, user_id: Uuid)
    -> Result<Option<ProgressRecord>, DomainError>;

    /// The user's snapshots, newest first.
    async fn find_by_user_with_filters(
        &self,
        user_id: Uuid,
        filter: ProgressFilter,
    ) -> Result<Vec<ProgressRecord>, DomainError>;

    /// Writes a snapshot. Never overwrites `is_liked`.
    ///
    /// With `expected` of `None` the row is inserted and must not exist yet;
    /// otherwise the stored row is updated only while it still matches
    /// `expected`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::ActiveQuestExists` when the write would leave the
    /// user with two active quests, and `DomainError::ConcurrencyConflict`
    /// when the stored row no longer matches `expected`.
    async fn save(
        &self,
        record: &ProgressRecord,
        expected: Option<ProgressVersion>,
    ) -> Result<(), DomainError>;

    /// Removes a snapshot while it still matches `expected`. If it was liked,
    /// the quest's like counter is decremented in the same transaction.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::ConcurrencyConflict` when the row is gone or was
    /// changed since it was read.
    async fn delete(
        &self,
        user_id: Uuid,
        quest_id: Uuid,
        expected: ProgressVersion,
    ) -> Result<(), DomainError>;
}

/// Opens transactions that keep the per-user like flag and the per-quest
/// like counter together.
#[async_trait]
pub trait LikeStore: Send + Sync {
    /// Begins a transaction.
    async fn begin(&self) -> Result<Box<dyn LikeTransaction>, DomainError>;
}

/// A unit of work over the like flag and counter. Dropping it without
/// calling [`LikeTransaction::commit`] discards every write.
#[async_trait]
pub trait LikeTransaction: Send {
    /// Flips `is_liked` on the (user, quest) snapshot and returns the new
    /// value, or `None` if no snapshot exists. Locks the row until the end of
    /// the transaction.
    async fn flip_like(&mut self, user_id: Uuid, quest_id: Uuid)
    -> Result<Option<bool>, DomainError>;

    /// Atomically adds one to the quest's like counter.
    async fn increment_likes_count(&mut self, quest_id: Uuid) -> Result<(), DomainError>;

    /// Atomically removes one from the quest's like counter.
    ///
    /// # Errors
    ///
    /// Fails rather than take the counter below zero.
    async fn decrement_likes_count(&mut self, quest_id: Uuid) -> Result<(), DomainError>;

    /// Makes every write visible.
    async fn commit(self: Box<Self>) -> Result<(), DomainError>;
}
