use std::fmt;

use thiserror::Error;

use crate::bridge::BridgeError;

/// The backend resource a gateway call was fetching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Organizations,
    Networks,
    Events,
    Details,
}

impl Resource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Organizations => "organizations",
            Self::Networks => "networks",
            Self::Events => "events",
            Self::Details => "details",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Top-level error type for the `merakly-api` crate.
///
/// Every gateway operation fails with one of three distinguishable kinds
/// (`CredentialRejected`, `FetchFailed`, `TransportUnavailable`) so callers
/// can decide whether to block the funnel or keep the last good state.
/// `merakly-core` maps these into session-level diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Gateway taxonomy ────────────────────────────────────────────
    /// The backend refused the API key, or the key was empty.
    #[error("API key rejected: {reason}")]
    CredentialRejected { reason: String },

    /// A read endpoint answered with a failure status, timed out, or
    /// returned a body that does not match the expected shape.
    #[error("failed to fetch {resource}: {source}")]
    FetchFailed {
        resource: Resource,
        #[source]
        source: BridgeError,
    },

    /// The backend could not be reached at all.
    #[error("backend unavailable at {url}: {reason}")]
    TransportUnavailable { url: String, reason: String },

    // ── Setup ───────────────────────────────────────────────────────
    /// HTTP client construction failed.
    #[error("{0}")]
    Client(String),

    /// The configured backend URL is malformed.
    #[error("invalid backend URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl Error {
    /// Classify a bridge failure for a read endpoint.
    pub(crate) fn fetch(resource: Resource, err: BridgeError) -> Self {
        match err {
            BridgeError::Unreachable { url, reason } => Self::TransportUnavailable { url, reason },
            other => Self::FetchFailed {
                resource,
                source: other,
            },
        }
    }

    /// Classify a bridge failure for the credential endpoint.
    pub(crate) fn credential(err: BridgeError) -> Self {
        match err {
            BridgeError::Unreachable { url, reason } => Self::TransportUnavailable { url, reason },
            BridgeError::Status { status, message } => Self::CredentialRejected {
                reason: if message.is_empty() {
                    format!("HTTP {status}")
                } else {
                    format!("HTTP {status}: {message}")
                },
            },
            other => Self::CredentialRejected {
                reason: other.to_string(),
            },
        }
    }

    /// The resource a `FetchFailed` error refers to.
    pub fn resource(&self) -> Option<Resource> {
        match self {
            Self::FetchFailed { resource, .. } => Some(*resource),
            _ => None,
        }
    }

    /// HTTP status reported by the backend, if the failure carried one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::FetchFailed {
                source: BridgeError::Status { status, .. },
                ..
            } => Some(*status),
            _ => None,
        }
    }

    /// Returns `true` if the request exceeded the transport timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::FetchFailed {
                source: BridgeError::Timeout { .. },
                ..
            }
        )
    }

    /// Returns `true` if the backend process could not be reached.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::TransportUnavailable { .. })
    }
}
