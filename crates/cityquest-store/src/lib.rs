//! CityQuest Store — `PostgreSQL` implementations of the persistence ports.

use cityquest_core::error::DomainError;

pub mod pg_event_store;
pub mod pg_progress_store;
pub mod schema;

pub use pg_event_store::PgEventStore;
pub use pg_progress_store::PgProgressStore;

/// Wraps a driver error into the domain's infrastructure variant.
#[allow(clippy::needless_pass_by_value)]
pub(crate) fn db_error(error: sqlx::Error) -> DomainError {
    DomainError::Infrastructure(format!("database error: {error}"))
}
