//! Application services for the Quest Progress context.

pub mod command_handlers;
pub mod query_handlers;
