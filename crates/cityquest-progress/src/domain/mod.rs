//! Domain model for the Quest Progress context.

pub mod aggregates;
pub mod commands;
pub mod events;
pub mod transitions;
