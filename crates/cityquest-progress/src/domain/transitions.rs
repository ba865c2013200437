//! Status transition table.

use cityquest_core::status::QuestStatus;

/// The kinds of change a progress aggregate can undergo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionKind {
    /// First start of a fresh progress.
    Start,
    /// Continue a paused progress.
    Resume,
    /// Put an active progress on hold.
    Pause,
    /// Finish an active progress.
    Complete,
    /// Drop the progress entirely.
    Abandon,
    /// Record a geofenced step verification.
    StepCheck,
}

/// Every legal `(from, kind) -> to` move. Anything absent is rejected.
pub const TRANSITIONS: &[(QuestStatus, TransitionKind, QuestStatus)] = &[
    (QuestStatus::New, TransitionKind::Start, QuestStatus::Active),
    (QuestStatus::Paused, TransitionKind::Resume, QuestStatus::Active),
    (QuestStatus::Active, TransitionKind::Pause, QuestStatus::Paused),
    (QuestStatus::Active, TransitionKind::Complete, QuestStatus::Completed),
    (QuestStatus::Active, TransitionKind::Abandon, QuestStatus::New),
    (QuestStatus::Paused, TransitionKind::Abandon, QuestStatus::New),
    (QuestStatus::Active, TransitionKind::StepCheck, QuestStatus::Active),
];

impl TransitionKind {
    /// The status this kind of transition aims for, used to describe a
    /// rejected attempt.
    #[must_use]
    pub fn target(self) -> QuestStatus {
        match self {
            Self::Start | Self::Resume | Self::StepCheck => QuestStatus::Active,
            Self::Pause => QuestStatus::Paused,
            Self::Complete => QuestStatus::Completed,
            Self::Abandon => QuestStatus::New,
        }
    }
}

/// Looks up the status reached from `from` via `kind`.
#[must_use]
pub fn next_status(from: QuestStatus, kind: TransitionKind) -> Option<QuestStatus> {
    TRANSITIONS
        .iter()
        .find(|(source, k, _)| *source == from && *k == kind)
        .map(|(_, _, to)| *to)
}
