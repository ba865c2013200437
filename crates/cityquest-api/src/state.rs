//! Shared application state.

use std::sync::Arc;

use cityquest_core::clock::Clock;
use cityquest_core::repository::{EventStore, LikeStore, ProgressRepository, QuestCatalog};
use cityquest_progress::application::command_handlers::ProgressPorts;
use cityquest_store::{PgEventStore, PgProgressStore};
use sqlx::PgPool;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Clock for event timestamps.
    pub clock: Arc<dyn Clock + Send + Sync>,
    /// Read-only quest catalog.
    pub quests: Arc<dyn QuestCatalog>,
    /// Progress snapshots.
    pub progress: Arc<dyn ProgressRepository>,
    /// Like flag and counter transactions.
    pub likes: Arc<dyn LikeStore>,
    /// Append-only progress event log.
    pub event_store: Arc<dyn EventStore>,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(
        clock: Arc<dyn Clock + Send + Sync>,
        quests: Arc<dyn QuestCatalog>,
        progress: Arc<dyn ProgressRepository>,
        likes: Arc<dyn LikeStore>,
        event_store: Arc<dyn EventStore>,
    ) -> Self {
        Self {
            clock,
            quests,
            progress,
            likes,
            event_store,
        }
    }

    /// Application state backed by `PostgreSQL`.
    #[must_use]
    pub fn with_pool(pool: PgPool, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        let store = Arc::new(PgProgressStore::new(pool.clone()));
        Self::new(
            clock,
            store.clone(),
            store.clone(),
            store,
            Arc::new(PgEventStore::new(pool)),
        )
    }

    /// Borrows the ports in the shape the command handlers take.
    #[must_use]
    pub fn ports(&self) -> ProgressPorts<'_> {
        ProgressPorts {
            quests: self.quests.as_ref(),
            progress: self.progress.as_ref(),
            likes: self.likes.as_ref(),
            events: self.event_store.as_ref(),
        }
    }
}
