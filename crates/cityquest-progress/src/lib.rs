//! CityQuest — Quest Progress bounded context.
//!
//! Responsible for a user's progress through a quest: the status state
//! machine, the audit trail of transitions, and the engagement-gated like.

pub mod application;
pub mod domain;
