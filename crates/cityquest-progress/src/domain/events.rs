//! Domain events for the Quest Progress context.

use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use cityquest_core::error::DomainError;
use cityquest_core::event::{DomainEvent, EventMetadata};
use cityquest_core::platform::Platform;
use cityquest_core::repository::StoredEvent;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::transitions::TransitionKind;

/// Payload of a geofenced step verification.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepCheck {
    /// Latitude reported by the client.
    pub client_latitude: f64,
    /// Longitude reported by the client.
    pub client_longitude: f64,
    /// Distance between the client and the step's point, in metres.
    pub distance_to_point: f64,
    /// Whether the step's conditions were met.
    pub check_passed: bool,
}

/// Event type identifier for [`ProgressEventKind::QuestStarted`].
pub const QUEST_STARTED_EVENT_TYPE: &str = "progress.quest_started";

/// Event type identifier for [`ProgressEventKind::QuestPaused`].
pub const QUEST_PAUSED_EVENT_TYPE: &str = "progress.quest_paused";

/// Event type identifier for [`ProgressEventKind::QuestResumed`].
pub const QUEST_RESUMED_EVENT_TYPE: &str = "progress.quest_resumed";

/// Event type identifier for [`ProgressEventKind::QuestCompleted`].
pub const QUEST_COMPLETED_EVENT_TYPE: &str = "progress.quest_completed";

/// Event type identifier for [`ProgressEventKind::QuestAbandoned`].
pub const QUEST_ABANDONED_EVENT_TYPE: &str = "progress.quest_abandoned";

/// Event type identifier for [`ProgressEventKind::StepChecked`].
pub const QUEST_STEP_CHECKED_EVENT_TYPE: &str = "progress.quest_step_checked";

/// Event payload variants for the Quest Progress context.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEventKind {
    /// The quest was started for the first time.
    QuestStarted,
    /// The quest was put on hold.
    QuestPaused,
    /// A paused quest was picked up again.
    QuestResumed,
    /// The quest was finished.
    QuestCompleted,
    /// The user dropped the quest.
    QuestAbandoned,
    /// A step was verified against the client's position.
    StepChecked(StepCheck),
}

impl ProgressEventKind {
    /// Returns the discriminator stored alongside the event.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::QuestStarted => QUEST_STARTED_EVENT_TYPE,
            Self::QuestPaused => QUEST_PAUSED_EVENT_TYPE,
            Self::QuestResumed => QUEST_RESUMED_EVENT_TYPE,
            Self::QuestCompleted => QUEST_COMPLETED_EVENT_TYPE,
            Self::QuestAbandoned => QUEST_ABANDONED_EVENT_TYPE,
            Self::StepChecked(_) => QUEST_STEP_CHECKED_EVENT_TYPE,
        }
    }

    /// The transition this event records.
    #[must_use]
    pub fn transition(&self) -> TransitionKind {
        match self {
            Self::QuestStarted => TransitionKind::Start,
            Self::QuestPaused => TransitionKind::Pause,
            Self::QuestResumed => TransitionKind::Resume,
            Self::QuestCompleted => TransitionKind::Complete,
            Self::QuestAbandoned => TransitionKind::Abandon,
            Self::StepChecked(_) => TransitionKind::StepCheck,
        }
    }

    /// Kind-specific payload; an empty object for plain lifecycle events.
    #[must_use]
    pub fn event_data(&self) -> serde_json::Value {
        match self {
            Self::StepChecked(check) => serde_json::json!({
                "client_latitude": check.client_latitude,
                "client_longitude": check.client_longitude,
                "distance_to_point": check.distance_to_point,
                "check_passed": check.check_passed,
            }),
            _ => serde_json::json!({}),
        }
    }

    /// Rebuilds a kind from its stored discriminator and payload.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::UnknownEventType` for a discriminator this build
    /// does not know, and `DomainError::Infrastructure` for a malformed
    /// step-check payload.
    pub fn from_stored(event_type: &str, event_data: &serde_json::Value) -> Result<Self, DomainError> {
        match event_type {
            QUEST_STARTED_EVENT_TYPE => Ok(Self::QuestStarted),
            QUEST_PAUSED_EVENT_TYPE => Ok(Self::QuestPaused),
            QUEST_RESUMED_EVENT_TYPE => Ok(Self::QuestResumed),
            QUEST_COMPLETED_EVENT_TYPE => Ok(Self::QuestCompleted),
            QUEST_ABANDONED_EVENT_TYPE => Ok(Self::QuestAbandoned),
            QUEST_STEP_CHECKED_EVENT_TYPE => {
                let check: StepCheck = serde_json::from_value(event_data.clone()).map_err(|e| {
                    DomainError::Infrastructure(format!("event deserialization failed: {e}"))
                })?;
                Ok(Self::StepChecked(check))
            }
            other => Err(DomainError::UnknownEventType(other.to_owned())),
        }
    }
}

/// Domain event envelope for the Quest Progress context.
///
/// Immutable once built, except for the platform, which is attached exactly
/// once after construction by the orchestration layer.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressEvent {
    /// Event metadata.
    pub metadata: EventMetadata,
    /// Event-specific payload.
    pub kind: ProgressEventKind,
    platform: OnceLock<Platform>,
}

impl ProgressEvent {
    /// Builds a new event without a platform.
    #[must_use]
    pub fn new(
        aggregate_id: Uuid,
        user_id: Uuid,
        quest_id: Uuid,
        correlation_id: Uuid,
        occurred_at: DateTime<Utc>,
        kind: ProgressEventKind,
    ) -> Self {
        Self {
            metadata: EventMetadata {
                event_id: Uuid::new_v4(),
                event_type: kind.event_type().to_owned(),
                aggregate_id,
                user_id,
                quest_id,
                correlation_id,
                occurred_at,
            },
            kind,
            platform: OnceLock::new(),
        }
    }

    /// Attaches the client platform.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if a platform is already attached.
    pub fn attach_platform(&self, platform: Platform) -> Result<(), DomainError> {
        self.platform.set(platform).map_err(|_| {
            DomainError::Validation(format!(
                "platform already attached to event {}",
                self.metadata.event_id
            ))
        })
    }

    /// Converts to the storage record. An event that never had a platform
    /// attached is stored as `unknown`.
    #[must_use]
    pub fn to_stored_event(&self) -> StoredEvent {
        let meta = &self.metadata;
        StoredEvent {
            event_id: meta.event_id,
            aggregate_id: meta.aggregate_id,
            user_id: meta.user_id,
            quest_id: meta.quest_id,
            event_type: self.event_type().to_owned(),
            event_data: self.event_data(),
            platform: self.platform().cloned().unwrap_or_else(Platform::unknown),
            correlation_id: meta.correlation_id,
            occurred_at: meta.occurred_at,
        }
    }
}

impl TryFrom<&StoredEvent> for ProgressEvent {
    type Error = DomainError;

    fn try_from(stored: &StoredEvent) -> Result<Self, Self::Error> {
        let kind = ProgressEventKind::from_stored(&stored.event_type, &stored.event_data)?;
        Ok(Self {
            metadata: EventMetadata {
                event_id: stored.event_id,
                event_type: stored.event_type.clone(),
                aggregate_id: stored.aggregate_id,
                user_id: stored.user_id,
                quest_id: stored.quest_id,
                correlation_id: stored.correlation_id,
                occurred_at: stored.occurred_at,
            },
            kind,
            platform: OnceLock::from(stored.platform.clone()),
        })
    }
}

impl DomainEvent for ProgressEvent {
    fn event_type(&self) -> &'static str {
        self.kind.event_type()
    }

    fn event_data(&self) -> serde_json::Value {
        self.kind.event_data()
    }

    fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }

    fn platform(&self) -> Option<&Platform> {
        self.platform.get()
    }
}
