//! Aggregate root abstraction.

use uuid::Uuid;

use crate::event::DomainEvent;

/// Trait for aggregate roots that buffer the events they emit.
///
/// State is never rebuilt by folding the full history; an aggregate is loaded
/// from its materialized snapshot and only the events produced since then are
/// held in memory until the caller drains them with [`AggregateRoot::pull`].
pub trait AggregateRoot: Send + Sync {
    /// The event type this aggregate produces.
    type Event: DomainEvent;

    /// Returns the aggregate identifier.
    fn aggregate_id(&self) -> Uuid;

    /// Reduce an event into the current state and buffer it.
    fn apply(&mut self, event: Self::Event);

    /// Returns events produced since the last drain.
    fn pending_events(&self) -> &[Self::Event];

    /// Drains the pending buffer. A second immediate call returns an empty
    /// vector.
    fn pull(&mut self) -> Vec<Self::Event>;
}
