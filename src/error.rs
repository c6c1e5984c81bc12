//! Error types for the CNI plugin side.
//!
//! The daemon keeps its own taxonomy ([`crate::neutron::NeutronError`] and
//! [`crate::daemon::ManagerError`]); this enum covers everything the
//! short-lived plugin process can run into. Each variant names the failing
//! phase so a daemon that is unreachable is distinguishable from a daemon
//! that answered with an error, a delegate failure, or a bad configuration
//! document.

use thiserror::Error;

/// Result type alias for plugin operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the CNI plugin and orchestrator
#[derive(Debug, Error)]
pub enum Error {
    /// Bad configuration document or CNI environment
    #[error("{0}")]
    Config(String),

    /// The daemon socket could not be reached or the exchange broke off
    #[error("daemon request failed: {0}")]
    DaemonUnreachable(String),

    /// The daemon answered with its error envelope
    #[error("daemon error: {0}")]
    Daemon(String),

    /// The daemon answered non-2xx without a usable error envelope
    #[error("daemon returned status {status}: {body}")]
    DaemonStatus { status: u16, body: String },

    /// Verify found the resource missing
    #[error("{0}")]
    NotFound(String),

    /// The delegated plugin could not be found, spawned, or failed
    #[error("{0}")]
    Delegate(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unreachable_message_names_the_phase() {
        let err = Error::DaemonUnreachable("connection refused".to_string());
        assert!(err.to_string().contains("daemon request failed"));
    }

    #[test]
    fn test_daemon_error_carries_upstream_message() {
        let err = Error::Daemon("bad network_id".to_string());
        assert_eq!(err.to_string(), "daemon error: bad network_id");
    }

    #[test]
    fn test_status_fallback_includes_code_and_body() {
        let err = Error::DaemonStatus {
            status: 500,
            body: "internal server error".to_string(),
        };
        assert!(err.to_string().contains("500"));
        assert!(err.to_string().contains("internal server error"));
    }
}
