//! Shared test doubles and utilities for CityQuest.

mod clock;
mod event_store;
mod progress_store;

pub use clock::FixedClock;
pub use event_store::{FailingEventStore, RecordingEventStore};
pub use progress_store::{InMemoryProgressStore, quest_summary};
