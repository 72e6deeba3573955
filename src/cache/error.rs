//! Error types for cache operations

use thiserror::Error;

/// Errors that can occur while reading or writing cached objects
///
/// A missing entry is never an error: lookups report it as
/// [`Lookup::Absent`](super::Lookup::Absent).
#[derive(Debug, Error)]
pub enum CacheError {
    /// The persistent tier failed to read or write
    #[error("Storage I/O failed: {0}")]
    Storage(#[from] std::io::Error),

    /// A value or entry envelope could not be encoded or decoded
    #[error("Serialization failed: {message}")]
    Serialization { message: String },
}

impl CacheError {
    /// Creates a serialization error from any displayable cause
    pub fn serialization(cause: impl std::fmt::Display) -> Self {
        CacheError::Serialization {
            message: cause.to_string(),
        }
    }

    /// Returns true if this error came from the persistent tier
    pub fn is_storage(&self) -> bool {
        matches!(self, CacheError::Storage(_))
    }
}
