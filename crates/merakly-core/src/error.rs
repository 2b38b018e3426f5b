// ── Core error types ──
//
// Session-level errors. Transport detail stays inside `merakly-api`;
// the `From<merakly_api::Error>` impl keeps the three gateway kinds
// distinguishable and folds setup failures into `Config`.

use merakly_api::Resource;
use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    // ── Gateway errors ───────────────────────────────────────────────
    #[error("API key rejected: {reason}")]
    CredentialRejected { reason: String },

    #[error("Failed to fetch {resource}: {message}")]
    FetchFailed {
        resource: Resource,
        message: String,
        /// HTTP status reported by the backend, if any.
        status: Option<u16>,
        timed_out: bool,
    },

    #[error("Backend unavailable at {url}: {reason}")]
    TransportUnavailable { url: String, reason: String },

    // ── Selection errors ─────────────────────────────────────────────
    #[error("Organization not found: {identifier}")]
    OrganizationNotFound { identifier: String },

    #[error("Network not found: {identifier}")]
    NetworkNotFound { identifier: String },

    #[error("Cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: String,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    /// Returns `true` if a fetch exceeded the request timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::FetchFailed { timed_out: true, .. })
    }

    /// The resource a `FetchFailed` error refers to.
    pub fn resource(&self) -> Option<Resource> {
        match self {
            Self::FetchFailed { resource, .. } => Some(*resource),
            _ => None,
        }
    }
}

// ── Conversion from gateway errors ───────────────────────────────────

impl From<merakly_api::Error> for CoreError {
    fn from(err: merakly_api::Error) -> Self {
        let timed_out = err.is_timeout();
        let status = err.status();
        match err {
            merakly_api::Error::CredentialRejected { reason } => {
                CoreError::CredentialRejected { reason }
            }
            merakly_api::Error::FetchFailed { resource, source } => CoreError::FetchFailed {
                resource,
                message: source.to_string(),
                status,
                timed_out,
            },
            merakly_api::Error::TransportUnavailable { url, reason } => {
                CoreError::TransportUnavailable { url, reason }
            }
            merakly_api::Error::Client(message) => CoreError::Config { message },
            merakly_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid backend URL: {e}"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use merakly_api::BridgeError;

    use super::*;

    #[test]
    fn fetch_failure_keeps_status_and_timeout() {
        let api = merakly_api::Error::FetchFailed {
            resource: Resource::Events,
            source: BridgeError::Timeout { timeout_secs: 30 },
        };
        let err = CoreError::from(api);
        assert!(err.is_timeout());
        assert_eq!(err.resource(), Some(Resource::Events));

        let api = merakly_api::Error::FetchFailed {
            resource: Resource::Networks,
            source: BridgeError::Status {
                status: 502,
                message: "bad gateway".into(),
            },
        };
        match CoreError::from(api) {
            CoreError::FetchFailed {
                status, timed_out, ..
            } => {
                assert_eq!(status, Some(502));
                assert!(!timed_out);
            }
            other => panic!("expected FetchFailed, got {other:?}"),
        }
    }

    #[test]
    fn setup_errors_become_config() {
        let err = CoreError::from(merakly_api::Error::Client("no TLS backend".into()));
        assert!(matches!(err, CoreError::Config { .. }));
    }
}
