//! Command abstractions.

use uuid::Uuid;

use crate::platform::Platform;

/// Trait that all commands implement.
pub trait Command: Send + Sync + std::fmt::Debug {
    /// The type name for this command (for logging/routing).
    fn command_type(&self) -> &'static str;

    /// Correlation ID to trace this command through the system.
    fn correlation_id(&self) -> Uuid;

    /// The client platform the command was issued from.
    ///
    /// Resolved by the caller before the command is built; handlers never
    /// inspect request state themselves.
    fn platform(&self) -> &Platform;
}
