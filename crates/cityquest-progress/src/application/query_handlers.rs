//! Query handlers for the Quest Progress context.
//!
//! Reads come from the materialized snapshots; the event log is only read to
//! expose a progress history.

use chrono::{DateTime, Utc};
use cityquest_core::error::DomainError;
use cityquest_core::repository::{
    EventStore, ProgressFilter, ProgressRecord, ProgressRepository, QuestCatalog, QuestSummary,
    StoredEvent,
};
use cityquest_core::status::QuestStatus;
use serde::Serialize;
use tracing::error;
use uuid::Uuid;

use crate::domain::events::ProgressEvent;

/// Read-only view of one progress entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressEntryView {
    /// The quest being played.
    pub quest_id: Uuid,
    /// Current status.
    pub status: QuestStatus,
    /// Whether the user likes the quest.
    pub is_liked: bool,
    /// When the quest was completed.
    pub completed_at: Option<DateTime<Utc>>,
    /// When the quest was first started.
    pub started_at: DateTime<Utc>,
    /// Last status change.
    pub updated_at: DateTime<Utc>,
    /// The quest itself, omitted if it left the catalog.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quest: Option<QuestSummary>,
}

/// Per-status counts over all of a user's progress.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProgressCounters {
    /// Every progress row.
    pub total: usize,
    /// Completed rows.
    pub completed: usize,
    /// Active rows.
    pub in_progress: usize,
    /// Paused rows.
    pub paused: usize,
    /// Liked rows.
    pub liked: usize,
}

impl ProgressCounters {
    fn tally(records: &[ProgressRecord]) -> Self {
        records.iter().fold(Self::default(), |mut acc, r| {
            acc.total += 1;
            match r.status {
                QuestStatus::Completed => acc.completed += 1,
                QuestStatus::Active => acc.in_progress += 1,
                QuestStatus::Paused => acc.paused += 1,
                QuestStatus::New => {}
            }
            if r.is_liked {
                acc.liked += 1;
            }
            acc
        })
    }
}

/// A user's progress list plus counters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserProgressView {
    /// Entries matching the filter, newest first.
    pub data: Vec<ProgressEntryView>,
    /// Counters over the unfiltered set.
    pub meta: ProgressCounters,
}

async fn to_entry(
    record: ProgressRecord,
    quests: &dyn QuestCatalog,
) -> Result<ProgressEntryView, DomainError> {
    let quest = quests.find_by_id(record.quest_id).await?;
    Ok(ProgressEntryView {
        quest_id: record.quest_id,
        status: record.status,
        is_liked: record.is_liked,
        completed_at: record.completed_at,
        started_at: record.created_at,
        updated_at: record.updated_at,
        quest,
    })
}

/// Lists a user's progress, optionally filtered, with counters computed over
/// everything the user has.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if a read fails.
pub async fn get_user_progress(
    user_id: Uuid,
    filter: ProgressFilter,
    quests: &dyn QuestCatalog,
    progress: &dyn ProgressRepository,
) -> Result<UserProgressView, DomainError> {
    let all = progress
        .find_by_user_with_filters(user_id, ProgressFilter::default())
        .await?;
    let meta = ProgressCounters::tally(&all);

    let mut data = Vec::new();
    for record in all.into_iter().filter(|r| filter.matches(r)) {
        data.push(to_entry(record, quests).await?);
    }

    Ok(UserProgressView { data, meta })
}

/// The user's active quest, if any.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if a read fails.
pub async fn get_active_quest(
    user_id: Uuid,
    quests: &dyn QuestCatalog,
    progress: &dyn ProgressRepository,
) -> Result<Option<ProgressEntryView>, DomainError> {
    match progress.find_active_by_user(user_id).await? {
        Some(record) => Ok(Some(to_entry(record, quests).await?)),
        None => Ok(None),
    }
}

/// Every progress entry the user has liked, newest first.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if a read fails.
pub async fn get_liked_quests(
    user_id: Uuid,
    quests: &dyn QuestCatalog,
    progress: &dyn ProgressRepository,
) -> Result<Vec<ProgressEntryView>, DomainError> {
    let filter = ProgressFilter {
        status: None,
        liked: Some(true),
    };
    let mut entries = Vec::new();
    for record in progress.find_by_user_with_filters(user_id, filter).await? {
        entries.push(to_entry(record, quests).await?);
    }
    Ok(entries)
}

/// Whether the user may like the quest, i.e. has progress for it in any
/// status.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if the read fails.
pub async fn can_like(
    user_id: Uuid,
    quest_id: Uuid,
    progress: &dyn ProgressRepository,
) -> Result<bool, DomainError> {
    Ok(progress
        .find_by_user_and_quest(user_id, quest_id)
        .await?
        .is_some())
}

/// Whether the user currently likes the quest.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if the read fails.
pub async fn is_liked(
    user_id: Uuid,
    quest_id: Uuid,
    progress: &dyn ProgressRepository,
) -> Result<bool, DomainError> {
    Ok(progress
        .find_by_user_and_quest(user_id, quest_id)
        .await?
        .is_some_and(|r| r.is_liked))
}

fn rehydrate(stored: &[StoredEvent]) -> Result<Vec<ProgressEvent>, DomainError> {
    stored
        .iter()
        .map(|event| {
            ProgressEvent::try_from(event).inspect_err(|e| {
                if let DomainError::UnknownEventType(event_type) = e {
                    error!(
                        event_id = %event.event_id,
                        event_type = %event_type,
                        "event log holds an unknown event type"
                    );
                }
            })
        })
        .collect()
}

/// The history of one progress aggregate, oldest first.
///
/// # Errors
///
/// Returns `DomainError::UnknownEventType` if the log holds an event this
/// build cannot read, and `DomainError::Infrastructure` if the read fails.
pub async fn get_events_by_aggregate_id(
    aggregate_id: Uuid,
    events: &dyn EventStore,
) -> Result<Vec<ProgressEvent>, DomainError> {
    rehydrate(&events.load_by_aggregate_id(aggregate_id).await?)
}

/// Every progress event of one user, oldest first.
///
/// # Errors
///
/// Returns `DomainError::UnknownEventType` if the log holds an event this
/// build cannot read, and `DomainError::Infrastructure` if the read fails.
pub async fn get_events_by_user_id(
    user_id: Uuid,
    events: &dyn EventStore,
) -> Result<Vec<ProgressEvent>, DomainError> {
    rehydrate(&events.load_by_user_id(user_id).await?)
}

/// Every progress event on one quest, oldest first.
///
/// # Errors
///
/// Returns `DomainError::UnknownEventType` if the log holds an event this
/// build cannot read, and `DomainError::Infrastructure` if the read fails.
pub async fn get_events_by_quest_id(
    quest_id: Uuid,
    events: &dyn EventStore,
) -> Result<Vec<ProgressEvent>, DomainError> {
    rehydrate(&events.load_by_quest_id(quest_id).await?)
}
