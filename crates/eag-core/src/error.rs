//! Error types for the sync system
//!
//! This module defines all error types used throughout the crate, and the
//! per-call failure classification the apply driver acts on.

use thiserror::Error;

/// Result type alias for sync operations
pub type Result<T> = std::result::Result<T, Error>;

/// How the apply driver must treat a failed registry call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureClass {
    /// Network-level failure that a caller could retry (timeouts, 5xx, 429)
    TransientNetwork,
    /// The target registry rejected a create because the name is taken
    Conflict,
    /// Anything else; the run must stop
    Fatal,
}

/// Core error type for the sync system
#[derive(Error, Debug)]
pub enum Error {
    /// None of a record's identifier candidates is a hardware address
    #[error("No valid hardware address for device '{name}'")]
    NoValidIdentifier {
        /// Display name of the offending record
        name: String,
    },

    /// Create rejected by the target registry's name uniqueness constraint
    #[error("Duplicate name in target registry: '{name}' ({message})")]
    DuplicateTargetName {
        /// Display name that collided
        name: String,
        /// Message returned by the registry
        message: String,
    },

    /// Connection failures, timeouts, rate limiting, server-side errors
    #[error("Transient network error: {0}")]
    TransientNetwork(String),

    /// Authentication errors
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Response that does not match what the adapter expects
    #[error("Unexpected response from {registry}: {message}")]
    UnexpectedResponse {
        /// Registry name
        registry: String,
        /// Error message
        message: String,
    },

    /// Registry-specific error
    #[error("Registry error ({registry}): {message}")]
    Registry {
        /// Registry name
        registry: String,
        /// Error message
        message: String,
    },

    /// Session store-related errors
    #[error("Session store error: {0}")]
    SessionStore(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Filesystem and other I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a "no valid identifier" error for a named record
    pub fn no_valid_identifier(name: impl Into<String>) -> Self {
        Self::NoValidIdentifier { name: name.into() }
    }

    /// Create a duplicate-name conflict error
    pub fn duplicate_name(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DuplicateTargetName {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create a transient network error
    pub fn transient(msg: impl Into<String>) -> Self {
        Self::TransientNetwork(msg.into())
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create an unexpected-response error
    pub fn unexpected(registry: impl Into<String>, message: impl Into<String>) -> Self {
        Self::UnexpectedResponse {
            registry: registry.into(),
            message: message.into(),
        }
    }

    /// Create a registry-specific error
    pub fn registry(registry: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Registry {
            registry: registry.into(),
            message: message.into(),
        }
    }

    /// Create a session store error
    pub fn session_store(msg: impl Into<String>) -> Self {
        Self::SessionStore(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Classify this error for the apply driver
    ///
    /// Only [`Error::DuplicateTargetName`] is a `Conflict` and only
    /// [`Error::TransientNetwork`] is transient. Everything else is fatal.
    pub fn class(&self) -> FailureClass {
        match self {
            Error::DuplicateTargetName { .. } => FailureClass::Conflict,
            Error::TransientNetwork(_) => FailureClass::TransientNetwork,
            _ => FailureClass::Fatal,
        }
    }

    /// Shorthand for `self.class() == FailureClass::Conflict`
    pub fn is_conflict(&self) -> bool {
        self.class() == FailureClass::Conflict
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
