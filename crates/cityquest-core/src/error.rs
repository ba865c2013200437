//! Domain error types.

use thiserror::Error;
use uuid::Uuid;

use crate::status::QuestStatus;

/// Top-level domain error type.
#[derive(Debug, Error)]
pub enum DomainError {
    /// The referenced quest does not exist in the catalog.
    #[error("quest not found: {0}")]
    QuestNotFound(Uuid),

    /// No progress exists for the user and quest.
    #[error("progress not found for user {user_id} and quest {quest_id}")]
    ProgressNotFound {
        /// The user that was looked up.
        user_id: Uuid,
        /// The quest that was looked up.
        quest_id: Uuid,
    },

    /// The user already has a different quest in progress.
    #[error(
        "user {user_id} already has an active quest {active_quest_id}; pause it before starting a new one"
    )]
    ActiveQuestExists {
        /// The user owning the active quest.
        user_id: Uuid,
        /// The quest that is currently active.
        active_quest_id: Uuid,
    },

    /// The snapshot changed between being read and being written.
    #[error("progress for user {user_id} and quest {quest_id} was changed concurrently")]
    ConcurrencyConflict {
        /// The user owning the progress.
        user_id: Uuid,
        /// The quest the progress refers to.
        quest_id: Uuid,
    },

    /// The requested status transition is not allowed.
    #[error("cannot transition quest {quest_id} from status \"{from}\" to \"{to}\"")]
    InvalidTransition {
        /// The quest whose progress was being changed.
        quest_id: Uuid,
        /// Status at the time of the attempt.
        from: QuestStatus,
        /// Status the caller attempted to reach.
        to: QuestStatus,
    },

    /// A like was attempted on a quest the user never started.
    #[error("quest {0} must be started before it can be liked")]
    QuestNotStarted(Uuid),

    /// The event log contains a discriminator this build does not know.
    ///
    /// This is a code/schema mismatch, not a user error.
    #[error("unknown event type in event log: {0}")]
    UnknownEventType(String),

    /// A validation error in domain logic.
    #[error("validation error: {0}")]
    Validation(String),

    /// An infrastructure/persistence error.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}
