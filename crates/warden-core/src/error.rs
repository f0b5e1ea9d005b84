//! Error types and result aliases for Warden.
//!
//! This module defines the shared error types used across all Warden
//! components. Errors are structured for programmatic handling; the API
//! layer maps each variant onto an HTTP status.

use std::fmt;

/// The result type used throughout Warden.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in Warden operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An invalid identifier was provided.
    #[error("invalid identifier: {message}")]
    InvalidId {
        /// Description of what made the ID invalid.
        message: String,
    },

    /// Invalid input was provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A tenant-scoped lookup failed.
    ///
    /// Deliberately does not distinguish "absent" from "belongs to another
    /// organization" so cross-tenant existence is never leaked.
    #[error("{resource_type} not found or not accessible: {id}")]
    NotAccessible {
        /// The type of resource that was requested.
        resource_type: &'static str,
        /// The identifier that was looked up.
        id: String,
    },

    /// The requested entity is legitimately absent within the caller's
    /// own organization.
    #[error("not found: {0}")]
    NotFound(String),

    /// Authentication or signature verification failed.
    ///
    /// Carries no detail by design: the caller must not learn whether the
    /// failure was a missing secret, a malformed header, or a digest
    /// mismatch.
    #[error("unauthorized")]
    Unauthorized,

    /// A serialization or deserialization error occurred.
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of the serialization failure.
        message: String,
    },

    /// A storage operation failed.
    #[error("storage error: {message}")]
    Storage {
        /// Description of the storage failure.
        message: String,
        /// The underlying cause, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// An internal error occurred that should not happen in normal
    /// operation.
    #[error("internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl Error {
    /// Creates a tenant-scoped "not found or not accessible" error.
    #[must_use]
    pub fn not_accessible(resource_type: &'static str, id: impl fmt::Display) -> Self {
        Self::NotAccessible {
            resource_type,
            id: id.to_string(),
        }
    }

    /// Creates a new storage error with the given message.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Creates a serialization error from a `serde_json` failure.
    #[must_use]
    pub fn serialization(err: &serde_json::Error) -> Self {
        Self::Serialization {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_accessible_message_does_not_distinguish_absence_from_foreign() {
        let err = Error::not_accessible("alarm zone", "01J0000000000000000000000");
        assert_eq!(
            err.to_string(),
            "alarm zone not found or not accessible: 01J0000000000000000000000"
        );
    }

    #[test]
    fn unauthorized_is_uniform() {
        assert_eq!(Error::Unauthorized.to_string(), "unauthorized");
    }
}
