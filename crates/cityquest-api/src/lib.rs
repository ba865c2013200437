//! CityQuest API — HTTP surface over the Quest Progress context.

pub mod config;
pub mod error;
pub mod extract;
pub mod routes;
pub mod state;
pub mod telemetry;
