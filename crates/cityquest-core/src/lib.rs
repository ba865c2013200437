//! CityQuest Core — shared domain abstractions.
//!
//! This crate defines the fundamental traits and types that the progress
//! context, the persistence layer and the API depend on. It contains no
//! infrastructure code.

pub mod aggregate;
pub mod clock;
pub mod command;
pub mod error;
pub mod event;
pub mod platform;
pub mod repository;
pub mod status;
