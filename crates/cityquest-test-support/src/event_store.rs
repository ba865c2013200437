//! Test event stores — mock `EventStore` implementations for tests.

use std::sync::Mutex;

use async_trait::async_trait;
use cityquest_core::error::DomainError;
use cityquest_core::repository::{EventStore, StoredEvent};
use uuid::Uuid;

/// An event store that keeps every appended event in memory and answers
/// loads from that log.
#[derive(Debug, Default)]
pub struct RecordingEventStore {
    appended: Mutex<Vec<StoredEvent>>,
}

impl RecordingEventStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with `events`, as if they had been
    /// appended in order.
    #[must_use]
    pub fn with_events(events: Vec<StoredEvent>) -> Self {
        Self {
            appended: Mutex::new(events),
        }
    }

    /// Returns a snapshot of all events that were appended.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn appended_events(&self) -> Vec<StoredEvent> {
        self.appended.lock().unwrap().clone()
    }

    fn load_where(&self, predicate: impl Fn(&StoredEvent) -> bool) -> Vec<StoredEvent> {
        let mut events: Vec<StoredEvent> = self
            .appended
            .lock()
            .unwrap()
            .iter()
            .filter(|e| predicate(e))
            .cloned()
            .collect();
        // Stable: ties keep append order.
        events.sort_by_key(|e| e.occurred_at);
        events
    }
}

#[async_trait]
impl EventStore for RecordingEventStore {
    async fn append(&self, event: &StoredEvent) -> Result<(), DomainError> {
        self.appended.lock().unwrap().push(event.clone());
        Ok(())
    }

    async fn load_by_aggregate_id(
        &self,
        aggregate_id: Uuid,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        Ok(self.load_where(|e| e.aggregate_id == aggregate_id))
    }

    async fn load_by_user_id(&self, user_id: Uuid) -> Result<Vec<StoredEvent>, DomainError> {
        Ok(self.load_where(|e| e.user_id == user_id))
    }

    async fn load_by_quest_id(&self, quest_id: Uuid) -> Result<Vec<StoredEvent>, DomainError> {
        Ok(self.load_where(|e| e.quest_id == quest_id))
    }
}

/// An event store that always returns an infrastructure error. Useful for
/// testing error-handling paths.
#[derive(Debug)]
pub struct FailingEventStore;

#[async_trait]
impl EventStore for FailingEventStore {
    async fn append(&self, _event: &StoredEvent) -> Result<(), DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }

    async fn load_by_aggregate_id(
        &self,
        _aggregate_id: Uuid,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }

    async fn load_by_user_id(&self, _user_id: Uuid) -> Result<Vec<StoredEvent>, DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }

    async fn load_by_quest_id(&self, _quest_id: Uuid) -> Result<Vec<StoredEvent>, DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }
}
