//! Registry error types

use thiserror::Error;

/// Errors surfaced by registry backends.
///
/// Every error propagates synchronously to the caller of the failing
/// operation; backends never retry internally and never swallow
/// failures into empty results.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Endpoint list or backend properties are unusable.
    ///
    /// Surfaced at first use rather than at `init`, which does no I/O.
    #[error("invalid registry configuration: {0}")]
    Configuration(String),

    /// The instance record was invalid, or the registry client handle
    /// could not be opened.
    #[error("failed to register instance: {0}")]
    Registration(String),

    /// A query could not be served, either because no client handle
    /// exists yet or because the registry returned a transport error.
    #[error("instance query failed: {0}")]
    Query(String),

    /// An operation was invoked out of lifecycle order.
    #[error("`{operation}` requires {requires}")]
    NotInitialized {
        operation: &'static str,
        requires: &'static str,
    },
}

impl RegistryError {
    /// Shorthand for lifecycle-order violations.
    pub fn not_initialized(operation: &'static str, requires: &'static str) -> Self {
        RegistryError::NotInitialized {
            operation,
            requires,
        }
    }
}

/// Result type for registry operations
pub type Result<T> = std::result::Result<T, RegistryError>;
