//! Error types for the Ceph state reconciler
//!
//! Provides structured error types for the session layer, wire codecs,
//! keyring extraction, and reconciliation.

use thiserror::Error;

/// Unified error type for the reconciler
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Transport / Protocol Errors
    // =========================================================================
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("API error: status {status}, body: {body}")]
    Protocol { status: u16, body: String },

    #[error("Resource not found: {kind}/{name}")]
    NotFound { kind: String, name: String },

    #[error("Authentication failed: status {status}")]
    Auth { status: u16 },

    // =========================================================================
    // Decode Errors
    // =========================================================================
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Unexpected {kind} response shape: {detail}")]
    UnexpectedShape { kind: String, detail: String },

    #[error("No key found in keyring export for {entity}")]
    KeyNotFound { entity: String },

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("State file parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Build the error for a non-2xx response, mapping 404 onto the
    /// distinguished not-found class used to drive re-creation.
    pub fn from_status(kind: &str, name: &str, status: u16, body: String) -> Self {
        if status == 404 {
            Error::NotFound {
                kind: kind.to_string(),
                name: name.to_string(),
            }
        } else {
            Error::Protocol { status, body }
        }
    }

    /// Check whether this error means "the remote object does not exist".
    ///
    /// Covers both the decoded [`Error::NotFound`] class and a raw
    /// protocol failure with status 404 (e.g. from a DELETE).
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::NotFound { .. } | Error::Protocol { status: 404, .. }
        )
    }

    /// Check if this error is transient (the remote was never reached)
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Transport(_))
    }
}

/// Result type alias for the reconciler
pub type Result<T> = std::result::Result<T, Error>;
