//! Names of the database objects the store relies on.
//!
//! The tables themselves are created by the workspace migrations.

/// Partial unique index allowing one active progress per user.
pub const ONE_ACTIVE_PER_USER_INDEX: &str = "uq_user_quest_progress_one_active";
