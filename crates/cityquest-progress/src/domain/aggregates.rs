//! Aggregate roots for the Quest Progress context.

use cityquest_core::aggregate::AggregateRoot;
use cityquest_core::clock::Clock;
use cityquest_core::error::DomainError;
use cityquest_core::repository::{ProgressRecord, ProgressVersion};
use cityquest_core::status::QuestStatus;
use uuid::Uuid;

use super::events::{ProgressEvent, ProgressEventKind, StepCheck};
use super::transitions::{TransitionKind, next_status};

/// The aggregate root for one user's progress through one quest.
#[derive(Debug)]
pub struct QuestProgress {
    state: ProgressRecord,
    /// The stored row this aggregate was rebuilt from; `None` when fresh.
    loaded: Option<ProgressVersion>,
    /// Events produced since the last [`AggregateRoot::pull`].
    pending_events: Vec<ProgressEvent>,
}

impl QuestProgress {
    /// Creates a fresh, not yet started progress.
    #[must_use]
    pub fn new(id: Uuid, user_id: Uuid, quest_id: Uuid, clock: &dyn Clock) -> Self {
        let now = clock.now();
        Self {
            state: ProgressRecord {
                id,
                user_id,
                quest_id,
                status: QuestStatus::New,
                is_liked: false,
                completed_at: None,
                created_at: now,
                updated_at: now,
            },
            loaded: None,
            pending_events: Vec::new(),
        }
    }

    /// Rebuilds the aggregate from its persisted snapshot.
    #[must_use]
    pub fn from_record(record: ProgressRecord) -> Self {
        Self {
            loaded: Some(ProgressVersion::of(&record)),
            state: record,
            pending_events: Vec::new(),
        }
    }

    /// The version of the stored row this aggregate was rebuilt from, which
    /// a write must still find in place.
    #[must_use]
    pub fn loaded_version(&self) -> Option<ProgressVersion> {
        self.loaded
    }

    /// The current snapshot.
    #[must_use]
    pub fn record(&self) -> &ProgressRecord {
        &self.state
    }

    /// The current status.
    #[must_use]
    pub fn status(&self) -> QuestStatus {
        self.state.status
    }

    /// Starts a fresh progress, or resumes a paused one.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidTransition` when the progress is already
    /// active or completed.
    pub fn start(&mut self, correlation_id: Uuid, clock: &dyn Clock) -> Result<(), DomainError> {
        if self.state.status == QuestStatus::Paused {
            return self.resume(correlation_id, clock);
        }
        self.transition(
            TransitionKind::Start,
            ProgressEventKind::QuestStarted,
            correlation_id,
            clock,
        )
    }

    /// Resumes a paused progress.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidTransition` unless the progress is paused.
    pub fn resume(&mut self, correlation_id: Uuid, clock: &dyn Clock) -> Result<(), DomainError> {
        self.transition(
            TransitionKind::Resume,
            ProgressEventKind::QuestResumed,
            correlation_id,
            clock,
        )
    }

    /// Puts an active progress on hold.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidTransition` unless the progress is active.
    pub fn pause(&mut self, correlation_id: Uuid, clock: &dyn Clock) -> Result<(), DomainError> {
        self.transition(
            TransitionKind::Pause,
            ProgressEventKind::QuestPaused,
            correlation_id,
            clock,
        )
    }

    /// Finishes an active progress.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidTransition` unless the progress is active.
    pub fn complete(&mut self, correlation_id: Uuid, clock: &dyn Clock) -> Result<(), DomainError> {
        self.transition(
            TransitionKind::Complete,
            ProgressEventKind::QuestCompleted,
            correlation_id,
            clock,
        )
    }

    /// Drops an active or paused progress, returning it to `new`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidTransition` for a new or completed
    /// progress.
    pub fn abandon(&mut self, correlation_id: Uuid, clock: &dyn Clock) -> Result<(), DomainError> {
        self.transition(
            TransitionKind::Abandon,
            ProgressEventKind::QuestAbandoned,
            correlation_id,
            clock,
        )
    }

    /// Records a step verification on an active progress.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidTransition` unless the progress is active.
    pub fn record_step_check(
        &mut self,
        check: StepCheck,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        self.transition(
            TransitionKind::StepCheck,
            ProgressEventKind::StepChecked(check),
            correlation_id,
            clock,
        )
    }

    fn transition(
        &mut self,
        kind: TransitionKind,
        event_kind: ProgressEventKind,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        let from = self.state.status;
        if next_status(from, kind).is_none() {
            return Err(DomainError::InvalidTransition {
                quest_id: self.state.quest_id,
                from,
                to: kind.target(),
            });
        }

        let event = ProgressEvent::new(
            self.state.id,
            self.state.user_id,
            self.state.quest_id,
            correlation_id,
            clock.now(),
            event_kind,
        );
        self.apply(event);
        Ok(())
    }
}

/// Folds one event into a snapshot.
///
/// An event whose transition is not legal from the current status leaves the
/// status untouched.
#[must_use]
pub fn reduce(state: &ProgressRecord, event: &ProgressEvent) -> ProgressRecord {
    let occurred_at = event.metadata.occurred_at;
    let status = next_status(state.status, event.kind.transition()).unwrap_or(state.status);
    let completed_at = if status == QuestStatus::Completed {
        Some(occurred_at)
    } else {
        state.completed_at
    };

    ProgressRecord {
        status,
        completed_at,
        updated_at: occurred_at,
        ..state.clone()
    }
}

impl AggregateRoot for QuestProgress {
    type Event = ProgressEvent;

    fn aggregate_id(&self) -> Uuid {
        self.state.id
    }

    fn apply(&mut self, event: Self::Event) {
        self.state = reduce(&self.state, &event);
        self.pending_events.push(event);
    }

    fn pending_events(&self) -> &[Self::Event] {
        &self.pending_events
    }

    fn pull(&mut self) -> Vec<Self::Event> {
        std::mem::take(&mut self.pending_events)
    }
}
