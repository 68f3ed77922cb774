//! Unified error types for the ubox workspace.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum UboxError {
    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A configuration file could not be parsed or holds an invalid value.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// A required resource was not found.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Type of the missing resource.
        kind: &'static str,
        /// Identifier of the missing resource.
        id: String,
    },

    /// A resource that must be unique already exists.
    #[error("{kind} already exists: {id}")]
    AlreadyExists {
        /// Type of the conflicting resource.
        kind: &'static str,
        /// Identifier of the conflicting resource.
        id: String,
    },

    /// The resource carries a protection marker and cannot be removed.
    #[error("{kind} is protected: {id}")]
    Protected {
        /// Type of the protected resource.
        kind: &'static str,
        /// Identifier of the protected resource.
        id: String,
    },

    /// A user-supplied name does not satisfy the naming rules.
    #[error("invalid name: {name}")]
    InvalidName {
        /// The rejected name.
        name: String,
    },

    /// Serialization or deserialization failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },
}

impl UboxError {
    /// Builds an [`UboxError::Io`] for the given path.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, UboxError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_names_kind_and_id() {
        let err = UboxError::NotFound {
            kind: "container",
            id: "abc".into(),
        };
        assert_eq!(err.to_string(), "container not found: abc");
    }

    #[test]
    fn io_helper_keeps_path() {
        let err = UboxError::io("/tmp/x", std::io::Error::other("boom"));
        assert!(err.to_string().starts_with("I/O error at /tmp/x"));
    }
}
