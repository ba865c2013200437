//! Command handlers for the Quest Progress context.
//!
//! Each handler is one unit of work: read the snapshot, validate, drive the
//! aggregate, persist the snapshot, then drain the buffered events, stamp
//! them with the caller's platform and append them to the event store.

use cityquest_core::aggregate::AggregateRoot;
use cityquest_core::clock::Clock;
use cityquest_core::command::Command;
use cityquest_core::error::DomainError;
use cityquest_core::platform::Platform;
use cityquest_core::repository::{
    EventStore, LikeStore, ProgressRecord, ProgressRepository, QuestCatalog, StoredEvent,
};
use serde::Serialize;
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::domain::aggregates::QuestProgress;
use crate::domain::commands::{
    AbandonQuest, CompleteQuest, PauseQuest, RecordStepCheck, StartQuest, ToggleLike,
};
use crate::domain::events::StepCheck;

/// The persistence ports a command handler works against.
#[derive(Clone, Copy)]
pub struct ProgressPorts<'a> {
    /// Read-only quest catalog.
    pub quests: &'a dyn QuestCatalog,
    /// Progress snapshots.
    pub progress: &'a dyn ProgressRepository,
    /// Like flag and counter transactions.
    pub likes: &'a dyn LikeStore,
    /// Append-only event log.
    pub events: &'a dyn EventStore,
}

/// Outcome of a progress command.
#[derive(Debug, Clone)]
pub struct ProgressCommandResult {
    /// The progress aggregate that changed.
    pub aggregate_id: Uuid,
    /// The snapshot after the change; `None` once the progress was abandoned.
    pub progress: Option<ProgressRecord>,
    /// The events appended to the log.
    pub stored_events: Vec<StoredEvent>,
}

/// Outcome of a like toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LikeResult {
    /// The like flag after the toggle.
    pub liked: bool,
    /// The quest's like counter after the toggle.
    pub likes_count: i64,
}

/// Drains the aggregate's pending events, attaches the platform and appends
/// them in order.
async fn persist_events(
    aggregate: &mut QuestProgress,
    platform: &Platform,
    events: &dyn EventStore,
) -> Result<Vec<StoredEvent>, DomainError> {
    let pending = aggregate.pull();
    let mut stored_events = Vec::with_capacity(pending.len());
    for event in pending {
        event.attach_platform(platform.clone())?;
        let stored = event.to_stored_event();
        events.append(&stored).await?;
        stored_events.push(stored);
    }
    Ok(stored_events)
}

async fn load_progress(
    progress: &dyn ProgressRepository,
    user_id: Uuid,
    quest_id: Uuid,
) -> Result<QuestProgress, DomainError> {
    progress
        .find_by_user_and_quest(user_id, quest_id)
        .await?
        .map(QuestProgress::from_record)
        .ok_or(DomainError::ProgressNotFound { user_id, quest_id })
}

async fn finish(
    mut aggregate: QuestProgress,
    command: &dyn Command,
    ports: ProgressPorts<'_>,
) -> Result<ProgressCommandResult, DomainError> {
    ports
        .progress
        .save(aggregate.record(), aggregate.loaded_version())
        .await?;
    let stored_events = persist_events(&mut aggregate, command.platform(), ports.events).await?;
    Ok(ProgressCommandResult {
        aggregate_id: aggregate.aggregate_id(),
        progress: Some(aggregate.record().clone()),
        stored_events,
    })
}

/// Handles the `StartQuest` command: starts a fresh progress or resumes a
/// paused one.
///
/// # Errors
///
/// Returns `DomainError::QuestNotFound` if the quest is not in the catalog,
/// `DomainError::ActiveQuestExists` if the user already has an active quest,
/// `DomainError::InvalidTransition` if the progress was completed,
/// `DomainError::ConcurrencyConflict` if the progress changed meanwhile, and
/// `DomainError::Infrastructure` on persistence failures.
#[instrument(skip_all, fields(user_id = %command.user_id, quest_id = %command.quest_id))]
pub async fn handle_start_quest(
    command: &StartQuest,
    clock: &dyn Clock,
    ports: ProgressPorts<'_>,
) -> Result<ProgressCommandResult, DomainError> {
    let (user_id, quest_id) = (command.user_id, command.quest_id);

    if ports.quests.find_by_id(quest_id).await?.is_none() {
        return Err(DomainError::QuestNotFound(quest_id));
    }

    if let Some(active) = ports.progress.find_active_by_user(user_id).await? {
        warn!(active_quest_id = %active.quest_id, "start rejected, another quest is active");
        return Err(DomainError::ActiveQuestExists {
            user_id,
            active_quest_id: active.quest_id,
        });
    }

    let mut aggregate = match ports
        .progress
        .find_by_user_and_quest(user_id, quest_id)
        .await?
    {
        Some(record) => QuestProgress::from_record(record),
        None => QuestProgress::new(Uuid::new_v4(), user_id, quest_id, clock),
    };
    aggregate.start(command.correlation_id, clock)?;

    finish(aggregate, command, ports).await
}

/// Handles the `PauseQuest` command.
///
/// # Errors
///
/// Returns `DomainError::ProgressNotFound` if the user never started the
/// quest, `DomainError::InvalidTransition` unless it is active,
/// `DomainError::ConcurrencyConflict` if the progress changed meanwhile, and
/// `DomainError::Infrastructure` on persistence failures.
#[instrument(skip_all, fields(user_id = %command.user_id, quest_id = %command.quest_id))]
pub async fn handle_pause_quest(
    command: &PauseQuest,
    clock: &dyn Clock,
    ports: ProgressPorts<'_>,
) -> Result<ProgressCommandResult, DomainError> {
    let mut aggregate = load_progress(ports.progress, command.user_id, command.quest_id).await?;
    aggregate.pause(command.correlation_id, clock)?;
    finish(aggregate, command, ports).await
}

/// Handles the `CompleteQuest` command.
///
/// # Errors
///
/// Returns `DomainError::ProgressNotFound` if the user never started the
/// quest, `DomainError::InvalidTransition` unless it is active,
/// `DomainError::ConcurrencyConflict` if the progress changed meanwhile, and
/// `DomainError::Infrastructure` on persistence failures.
#[instrument(skip_all, fields(user_id = %command.user_id, quest_id = %command.quest_id))]
pub async fn handle_complete_quest(
    command: &CompleteQuest,
    clock: &dyn Clock,
    ports: ProgressPorts<'_>,
) -> Result<ProgressCommandResult, DomainError> {
    let mut aggregate = load_progress(ports.progress, command.user_id, command.quest_id).await?;
    aggregate.complete(command.correlation_id, clock)?;
    finish(aggregate, command, ports).await
}

/// Handles the `AbandonQuest` command: removes the snapshot and records the
/// abandonment in the event log.
///
/// # Errors
///
/// Returns `DomainError::ProgressNotFound` if the user never started the
/// quest, `DomainError::InvalidTransition` if it was completed,
/// `DomainError::ConcurrencyConflict` if the progress changed meanwhile, and
/// `DomainError::Infrastructure` on persistence failures.
#[instrument(skip_all, fields(user_id = %command.user_id, quest_id = %command.quest_id))]
pub async fn handle_abandon_quest(
    command: &AbandonQuest,
    clock: &dyn Clock,
    ports: ProgressPorts<'_>,
) -> Result<ProgressCommandResult, DomainError> {
    let mut aggregate = load_progress(ports.progress, command.user_id, command.quest_id).await?;
    let expected = aggregate
        .loaded_version()
        .ok_or(DomainError::ProgressNotFound {
            user_id: command.user_id,
            quest_id: command.quest_id,
        })?;
    aggregate.abandon(command.correlation_id, clock)?;

    ports
        .progress
        .delete(command.user_id, command.quest_id, expected)
        .await?;
    let stored_events = persist_events(&mut aggregate, command.platform(), ports.events).await?;

    Ok(ProgressCommandResult {
        aggregate_id: aggregate.aggregate_id(),
        progress: None,
        stored_events,
    })
}

/// Handles the `RecordStepCheck` command.
///
/// # Errors
///
/// Returns `DomainError::ProgressNotFound` if the user never started the
/// quest, `DomainError::InvalidTransition` unless it is active,
/// `DomainError::ConcurrencyConflict` if the progress changed meanwhile, and
/// `DomainError::Infrastructure` on persistence failures.
#[instrument(skip_all, fields(user_id = %command.user_id, quest_id = %command.quest_id))]
pub async fn handle_record_step_check(
    command: &RecordStepCheck,
    clock: &dyn Clock,
    ports: ProgressPorts<'_>,
) -> Result<ProgressCommandResult, DomainError> {
    let mut aggregate = load_progress(ports.progress, command.user_id, command.quest_id).await?;
    let check = StepCheck {
        client_latitude: command.client_latitude,
        client_longitude: command.client_longitude,
        distance_to_point: command.distance_to_point,
        check_passed: command.check_passed,
    };
    aggregate.record_step_check(check, command.correlation_id, clock)?;
    finish(aggregate, command, ports).await
}

/// Handles the `ToggleLike` command: flips the user's like and moves the
/// quest's counter by one in the same transaction.
///
/// # Errors
///
/// Returns `DomainError::QuestNotFound` if the quest is not in the catalog,
/// `DomainError::QuestNotStarted` if the user has no progress for it, and
/// `DomainError::Infrastructure` if any write fails, in which case nothing is
/// committed.
#[instrument(skip_all, fields(user_id = %command.user_id, quest_id = %command.quest_id))]
pub async fn handle_toggle_like(
    command: &ToggleLike,
    ports: ProgressPorts<'_>,
) -> Result<LikeResult, DomainError> {
    let (user_id, quest_id) = (command.user_id, command.quest_id);

    if ports.quests.find_by_id(quest_id).await?.is_none() {
        return Err(DomainError::QuestNotFound(quest_id));
    }
    if ports
        .progress
        .find_by_user_and_quest(user_id, quest_id)
        .await?
        .is_none()
    {
        return Err(DomainError::QuestNotStarted(quest_id));
    }

    let mut tx = ports.likes.begin().await?;
    // The row may have been abandoned since the check above.
    let Some(liked) = tx.flip_like(user_id, quest_id).await? else {
        return Err(DomainError::QuestNotStarted(quest_id));
    };
    if liked {
        tx.increment_likes_count(quest_id).await?;
    } else {
        tx.decrement_likes_count(quest_id).await?;
    }
    tx.commit().await?;

    let likes_count = ports
        .quests
        .find_by_id(quest_id)
        .await?
        .map_or(0, |quest| quest.likes_count);

    Ok(LikeResult { liked, likes_count })
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use cityquest_core::error::DomainError;
    use cityquest_core::platform::Platform;
    use cityquest_core::repository::{EventStore, ProgressFilter, ProgressVersion};
    use cityquest_core::status::QuestStatus;
    use uuid::Uuid;

    use super::*;
    use crate::domain::events::{
        QUEST_ABANDONED_EVENT_TYPE, QUEST_COMPLETED_EVENT_TYPE, QUEST_PAUSED_EVENT_TYPE,
        QUEST_RESUMED_EVENT_TYPE, QUEST_STARTED_EVENT_TYPE, QUEST_STEP_CHECKED_EVENT_TYPE,
    };
    use cityquest_test_support::{
        FailingEventStore, FixedClock, InMemoryProgressStore, RecordingEventStore, quest_summary,
    };

    struct Fixture {
        store: InMemoryProgressStore,
        events: RecordingEventStore,
        clock: FixedClock,
        user_id: Uuid,
    }

    impl Fixture {
        fn new(quest_ids: &[Uuid]) -> Self {
            let store = InMemoryProgressStore::new();
            for (i, id) in quest_ids.iter().enumerate() {
                store.add_quest(quest_summary(*id, &format!("Quest {i}")));
            }
            Self {
                store,
                events: RecordingEventStore::new(),
                clock: FixedClock(Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap()),
                user_id: Uuid::new_v4(),
            }
        }

        fn ports(&self) -> ProgressPorts<'_> {
            ProgressPorts {
                quests: &self.store,
                progress: &self.store,
                likes: &self.store,
                events: &self.events,
            }
        }

        async fn start(&self, quest_id: Uuid) -> Result<ProgressCommandResult, DomainError> {
            let command = StartQuest {
                correlation_id: Uuid::new_v4(),
                user_id: self.user_id,
                quest_id,
                platform: Platform::web("Firefox", "121.0", "Linux"),
            };
            handle_start_quest(&command, &self.clock, self.ports()).await
        }

        async fn pause(&self, quest_id: Uuid) -> Result<ProgressCommandResult, DomainError> {
            let command = PauseQuest {
                correlation_id: Uuid::new_v4(),
                user_id: self.user_id,
                quest_id,
                platform: Platform::unknown(),
            };
            handle_pause_quest(&command, &self.clock, self.ports()).await
        }

        async fn complete(&self, quest_id: Uuid) -> Result<ProgressCommandResult, DomainError> {
            let command = CompleteQuest {
                correlation_id: Uuid::new_v4(),
                user_id: self.user_id,
                quest_id,
                platform: Platform::unknown(),
            };
            handle_complete_quest(&command, &self.clock, self.ports()).await
        }

        async fn abandon(&self, quest_id: Uuid) -> Result<ProgressCommandResult, DomainError> {
            let command = AbandonQuest {
                correlation_id: Uuid::new_v4(),
                user_id: self.user_id,
                quest_id,
                platform: Platform::unknown(),
            };
            handle_abandon_quest(&command, &self.clock, self.ports()).await
        }

        async fn toggle_like(&self, quest_id: Uuid) -> Result<LikeResult, DomainError> {
            let command = ToggleLike {
                correlation_id: Uuid::new_v4(),
                user_id: self.user_id,
                quest_id,
                platform: Platform::unknown(),
            };
            handle_toggle_like(&command, self.ports()).await
        }

        fn event_types(&self) -> Vec<String> {
            self.events
                .appended_events()
                .into_iter()
                .map(|e| e.event_type)
                .collect()
        }
    }

    #[tokio::test]
    async fn test_handle_start_quest_creates_active_progress() {
        // Arrange
        let quest_id = Uuid::new_v4();
        let fx = Fixture::new(&[quest_id]);
        let correlation_id = Uuid::new_v4();
        let platform = Platform::ios("1.4.0", "17.2", "iPhone");
        let command = StartQuest {
            correlation_id,
            user_id: fx.user_id,
            quest_id,
            platform: platform.clone(),
        };

        // Act
        let result = handle_start_quest(&command, &fx.clock, fx.ports())
            .await
            .unwrap();

        // Assert
        let stored = fx.store.record(fx.user_id, quest_id).unwrap();
        assert_eq!(stored.status, QuestStatus::Active);
        assert_eq!(stored.created_at, fx.clock.0);
        assert!(!stored.is_liked);
        assert_eq!(result.progress, Some(stored.clone()));
        assert_eq!(result.aggregate_id, stored.id);

        let appended = fx.events.appended_events();
        assert_eq!(appended.len(), 1);
        let event = &appended[0];
        assert_eq!(event.event_type, QUEST_STARTED_EVENT_TYPE);
        assert_eq!(event.aggregate_id, stored.id);
        assert_eq!(event.user_id, fx.user_id);
        assert_eq!(event.quest_id, quest_id);
        assert_eq!(event.correlation_id, correlation_id);
        assert_eq!(event.occurred_at, fx.clock.0);
        assert_eq!(event.platform, platform);
        assert_eq!(event.event_data, serde_json::json!({}));
        assert_eq!(result.stored_events, appended);
    }

    #[tokio::test]
    async fn test_handle_start_quest_rejects_unknown_quest() {
        let fx = Fixture::new(&[]);
        let quest_id = Uuid::new_v4();

        let result = fx.start(quest_id).await;

        match result.unwrap_err() {
            DomainError::QuestNotFound(id) => assert_eq!(id, quest_id),
            other => panic!("expected QuestNotFound, got {other:?}"),
        }
        assert!(fx.events.appended_events().is_empty());
    }

    #[tokio::test]
    async fn test_handle_start_quest_rejects_second_active_quest() {
        // Arrange
        let (q1, q2) = (Uuid::new_v4(), Uuid::new_v4());
        let fx = Fixture::new(&[q1, q2]);
        fx.start(q1).await.unwrap();

        // Act
        let result = fx.start(q2).await;

        // Assert
        match result.unwrap_err() {
            DomainError::ActiveQuestExists {
                user_id,
                active_quest_id,
            } => {
                assert_eq!(user_id, fx.user_id);
                assert_eq!(active_quest_id, q1);
            }
            other => panic!("expected ActiveQuestExists, got {other:?}"),
        }
        assert!(fx.store.record(fx.user_id, q2).is_none());
        assert_eq!(fx.event_types(), vec![QUEST_STARTED_EVENT_TYPE]);
    }

    #[tokio::test]
    async fn test_handle_start_quest_on_already_active_quest_reports_it() {
        let quest_id = Uuid::new_v4();
        let fx = Fixture::new(&[quest_id]);
        fx.start(quest_id).await.unwrap();

        let result = fx.start(quest_id).await;

        assert!(matches!(
            result,
            Err(DomainError::ActiveQuestExists { active_quest_id, .. }) if active_quest_id == quest_id
        ));
    }

    #[tokio::test]
    async fn test_start_pause_start_resumes_the_same_progress() {
        // Arrange
        let quest_id = Uuid::new_v4();
        let fx = Fixture::new(&[quest_id]);
        let first = fx.start(quest_id).await.unwrap();
        fx.pause(quest_id).await.unwrap();

        // Act
        let resumed = fx.start(quest_id).await.unwrap();

        // Assert
        assert_eq!(resumed.aggregate_id, first.aggregate_id);
        assert_eq!(
            fx.store.record(fx.user_id, quest_id).unwrap().status,
            QuestStatus::Active
        );
        assert_eq!(
            fx.event_types(),
            vec![
                QUEST_STARTED_EVENT_TYPE,
                QUEST_PAUSED_EVENT_TYPE,
                QUEST_RESUMED_EVENT_TYPE,
            ]
        );
    }

    #[tokio::test]
    async fn test_pausing_frees_the_active_slot() {
        let (q1, q2) = (Uuid::new_v4(), Uuid::new_v4());
        let fx = Fixture::new(&[q1, q2]);
        fx.start(q1).await.unwrap();
        fx.pause(q1).await.unwrap();

        let result = fx.start(q2).await;

        assert!(result.is_ok());
        assert_eq!(
            fx.store.record(fx.user_id, q1).unwrap().status,
            QuestStatus::Paused
        );
    }

    #[tokio::test]
    async fn test_handle_pause_quest_without_progress_is_not_found() {
        let quest_id = Uuid::new_v4();
        let fx = Fixture::new(&[quest_id]);

        let result = fx.pause(quest_id).await;

        match result.unwrap_err() {
            DomainError::ProgressNotFound { user_id, quest_id: q } => {
                assert_eq!(user_id, fx.user_id);
                assert_eq!(q, quest_id);
            }
            other => panic!("expected ProgressNotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_completed_quest_cannot_be_paused() {
        // Arrange
        let quest_id = Uuid::new_v4();
        let fx = Fixture::new(&[quest_id]);
        fx.start(quest_id).await.unwrap();
        let completed = fx.complete(quest_id).await.unwrap();

        // Act
        let result = fx.pause(quest_id).await;

        // Assert
        match result.unwrap_err() {
            DomainError::InvalidTransition {
                quest_id: q,
                from,
                to,
            } => {
                assert_eq!(q, quest_id);
                assert_eq!(from, QuestStatus::Completed);
                assert_eq!(to, QuestStatus::Paused);
            }
            other => panic!("expected InvalidTransition, got {other:?}"),
        }
        let stored = fx.store.record(fx.user_id, quest_id).unwrap();
        assert_eq!(stored.status, QuestStatus::Completed);
        assert_eq!(stored.completed_at, Some(fx.clock.0));
        assert_eq!(completed.progress, Some(stored));
        assert_eq!(
            fx.event_types(),
            vec![QUEST_STARTED_EVENT_TYPE, QUEST_COMPLETED_EVENT_TYPE]
        );
    }

    #[tokio::test]
    async fn test_completed_quest_cannot_be_restarted() {
        let quest_id = Uuid::new_v4();
        let fx = Fixture::new(&[quest_id]);
        fx.start(quest_id).await.unwrap();
        fx.complete(quest_id).await.unwrap();

        let result = fx.start(quest_id).await;

        assert!(matches!(
            result,
            Err(DomainError::InvalidTransition {
                from: QuestStatus::Completed,
                to: QuestStatus::Active,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_handle_abandon_quest_deletes_row_and_releases_like() {
        // Arrange
        let quest_id = Uuid::new_v4();
        let fx = Fixture::new(&[quest_id]);
        fx.start(quest_id).await.unwrap();
        fx.toggle_like(quest_id).await.unwrap();
        assert_eq!(fx.store.quest(quest_id).unwrap().likes_count, 1);

        // Act
        let result = fx.abandon(quest_id).await.unwrap();

        // Assert
        assert!(result.progress.is_none());
        assert!(fx.store.record(fx.user_id, quest_id).is_none());
        assert_eq!(fx.store.quest(quest_id).unwrap().likes_count, 0);
        assert_eq!(
            fx.event_types(),
            vec![QUEST_STARTED_EVENT_TYPE, QUEST_ABANDONED_EVENT_TYPE]
        );
    }

    #[tokio::test]
    async fn test_abandoned_quest_can_be_started_again() {
        let quest_id = Uuid::new_v4();
        let fx = Fixture::new(&[quest_id]);
        let first = fx.start(quest_id).await.unwrap();
        fx.abandon(quest_id).await.unwrap();

        let second = fx.start(quest_id).await.unwrap();

        assert_ne!(second.aggregate_id, first.aggregate_id);
        assert_eq!(
            fx.store.record(fx.user_id, quest_id).unwrap().status,
            QuestStatus::Active
        );
    }

    #[tokio::test]
    async fn test_handle_record_step_check_appends_payload() {
        // Arrange
        let quest_id = Uuid::new_v4();
        let fx = Fixture::new(&[quest_id]);
        fx.start(quest_id).await.unwrap();
        let command = RecordStepCheck {
            correlation_id: Uuid::new_v4(),
            user_id: fx.user_id,
            quest_id,
            client_latitude: 43.2389,
            client_longitude: 76.8897,
            distance_to_point: 31.0,
            check_passed: false,
            platform: Platform::android("2.0.1", "14", "Pixel 8"),
        };

        // Act
        let result = handle_record_step_check(&command, &fx.clock, fx.ports())
            .await
            .unwrap();

        // Assert
        assert_eq!(result.stored_events.len(), 1);
        let event = &result.stored_events[0];
        assert_eq!(event.event_type, QUEST_STEP_CHECKED_EVENT_TYPE);
        assert_eq!(event.platform, Platform::android("2.0.1", "14", "Pixel 8"));
        assert_eq!(
            event.event_data,
            serde_json::json!({
                "client_latitude": 43.2389,
                "client_longitude": 76.8897,
                "distance_to_point": 31.0,
                "check_passed": false,
            })
        );
        assert_eq!(
            fx.store.record(fx.user_id, quest_id).unwrap().status,
            QuestStatus::Active
        );
    }

    #[tokio::test]
    async fn test_event_store_failure_is_propagated() {
        // Arrange
        let quest_id = Uuid::new_v4();
        let store = InMemoryProgressStore::new().with_quest(quest_summary(quest_id, "Harbour"));
        let clock = FixedClock(Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap());
        let ports = ProgressPorts {
            quests: &store,
            progress: &store,
            likes: &store,
            events: &FailingEventStore,
        };
        let command = StartQuest {
            correlation_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            quest_id,
            platform: Platform::unknown(),
        };

        // Act
        let result = handle_start_quest(&command, &clock, ports).await;

        // Assert
        assert!(matches!(result, Err(DomainError::Infrastructure(_))));
        assert!(FailingEventStore.load_by_quest_id(quest_id).await.is_err());
    }

    #[tokio::test]
    async fn test_like_requires_started_quest_then_toggles() {
        // Arrange
        let quest_id = Uuid::new_v4();
        let fx = Fixture::new(&[quest_id]);

        // Act
        let before_start = fx.toggle_like(quest_id).await;
        fx.start(quest_id).await.unwrap();
        let liked = fx.toggle_like(quest_id).await.unwrap();
        let unliked = fx.toggle_like(quest_id).await.unwrap();

        // Assert
        match before_start.unwrap_err() {
            DomainError::QuestNotStarted(id) => assert_eq!(id, quest_id),
            other => panic!("expected QuestNotStarted, got {other:?}"),
        }
        assert_eq!(
            liked,
            LikeResult {
                liked: true,
                likes_count: 1
            }
        );
        assert_eq!(
            unliked,
            LikeResult {
                liked: false,
                likes_count: 0
            }
        );
        assert!(!fx.store.record(fx.user_id, quest_id).unwrap().is_liked);
    }

    #[tokio::test]
    async fn test_like_on_unknown_quest_is_not_found() {
        let fx = Fixture::new(&[]);
        let quest_id = Uuid::new_v4();

        let result = fx.toggle_like(quest_id).await;

        assert!(matches!(result, Err(DomainError::QuestNotFound(id)) if id == quest_id));
    }

    #[tokio::test]
    async fn test_like_counter_failure_rolls_back_flag() {
        // Arrange
        let quest_id = Uuid::new_v4();
        let fx = Fixture::new(&[quest_id]);
        fx.start(quest_id).await.unwrap();
        fx.store.fail_counter_writes();

        // Act
        let result = fx.toggle_like(quest_id).await;

        // Assert
        assert!(matches!(result, Err(DomainError::Infrastructure(_))));
        assert!(!fx.store.record(fx.user_id, quest_id).unwrap().is_liked);
        assert_eq!(fx.store.quest(quest_id).unwrap().likes_count, 0);
    }

    #[tokio::test]
    async fn test_like_survives_pause_and_complete() {
        let quest_id = Uuid::new_v4();
        let fx = Fixture::new(&[quest_id]);
        fx.start(quest_id).await.unwrap();
        fx.toggle_like(quest_id).await.unwrap();

        fx.pause(quest_id).await.unwrap();
        fx.start(quest_id).await.unwrap();
        fx.complete(quest_id).await.unwrap();

        let stored = fx.store.record(fx.user_id, quest_id).unwrap();
        assert!(stored.is_liked);
        assert_eq!(fx.store.quest(quest_id).unwrap().likes_count, 1);
    }

    /// Answers reads with a snapshot taken earlier; writes reach the live
    /// store.
    struct StaleReads<'a> {
        live: &'a InMemoryProgressStore,
        snapshot: ProgressRecord,
    }

    #[async_trait::async_trait]
    impl ProgressRepository for StaleReads<'_> {
        async fn find_by_user_and_quest(
            &self,
            _user_id: Uuid,
            _quest_id: Uuid,
        ) -> Result<Option<ProgressRecord>, DomainError> {
            Ok(Some(self.snapshot.clone()))
        }

        async fn find_active_by_user(
            &self,
            _user_id: Uuid,
        ) -> Result<Option<ProgressRecord>, DomainError> {
            Ok(None)
        }

        async fn find_by_user_with_filters(
            &self,
            user_id: Uuid,
            filter: ProgressFilter,
        ) -> Result<Vec<ProgressRecord>, DomainError> {
            self.live.find_by_user_with_filters(user_id, filter).await
        }

        async fn save(
            &self,
            record: &ProgressRecord,
            expected: Option<ProgressVersion>,
        ) -> Result<(), DomainError> {
            self.live.save(record, expected).await
        }

        async fn delete(
            &self,
            user_id: Uuid,
            quest_id: Uuid,
            expected: ProgressVersion,
        ) -> Result<(), DomainError> {
            self.live.delete(user_id, quest_id, expected).await
        }
    }

    #[tokio::test]
    async fn test_pause_loaded_before_concurrent_complete_is_rejected() {
        // Arrange
        let quest_id = Uuid::new_v4();
        let fx = Fixture::new(&[quest_id]);
        fx.start(quest_id).await.unwrap();
        let snapshot = fx.store.record(fx.user_id, quest_id).unwrap();
        fx.complete(quest_id).await.unwrap();
        let stale = StaleReads {
            live: &fx.store,
            snapshot,
        };
        let ports = ProgressPorts {
            progress: &stale,
            ..fx.ports()
        };
        let command = PauseQuest {
            correlation_id: Uuid::new_v4(),
            user_id: fx.user_id,
            quest_id,
            platform: Platform::unknown(),
        };

        // Act
        let result = handle_pause_quest(&command, &fx.clock, ports).await;

        // Assert
        match result.unwrap_err() {
            DomainError::ConcurrencyConflict { quest_id: q, .. } => assert_eq!(q, quest_id),
            other => panic!("expected ConcurrencyConflict, got {other:?}"),
        }
        let stored = fx.store.record(fx.user_id, quest_id).unwrap();
        assert_eq!(stored.status, QuestStatus::Completed);
        assert_eq!(
            fx.event_types(),
            vec![QUEST_STARTED_EVENT_TYPE, QUEST_COMPLETED_EVENT_TYPE]
        );
    }

    #[tokio::test]
    async fn test_abandon_loaded_before_concurrent_complete_keeps_row() {
        // Arrange
        let quest_id = Uuid::new_v4();
        let fx = Fixture::new(&[quest_id]);
        fx.start(quest_id).await.unwrap();
        let snapshot = fx.store.record(fx.user_id, quest_id).unwrap();
        fx.complete(quest_id).await.unwrap();
        let stale = StaleReads {
            live: &fx.store,
            snapshot,
        };
        let ports = ProgressPorts {
            progress: &stale,
            ..fx.ports()
        };
        let command = AbandonQuest {
            correlation_id: Uuid::new_v4(),
            user_id: fx.user_id,
            quest_id,
            platform: Platform::unknown(),
        };

        // Act
        let result = handle_abandon_quest(&command, &fx.clock, ports).await;

        // Assert
        assert!(matches!(
            result,
            Err(DomainError::ConcurrencyConflict { .. })
        ));
        assert_eq!(
            fx.store.record(fx.user_id, quest_id).unwrap().status,
            QuestStatus::Completed
        );
        assert!(!fx.event_types().contains(&QUEST_ABANDONED_EVENT_TYPE.to_owned()));
    }
}
