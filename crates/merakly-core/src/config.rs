// ── Runtime session configuration ──
//
// Describes *where* the backend lives and how hard to hit it. Carries the
// API key in memory only; the CLI builds a `SessionConfig` from its
// profile and hands it in. Core never reads config files.

use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use merakly_api::transport::{DEFAULT_BACKEND_URL, DEFAULT_TIMEOUT};

/// Default bound on concurrent event requests during a fan-out.
pub const DEFAULT_MAX_IN_FLIGHT: usize = 8;

/// Upper limit accepted for `max_in_flight`.
pub const MAX_IN_FLIGHT_LIMIT: usize = 16;

/// Configuration for one session against a backend proxy.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Backend base URL (e.g., `http://localhost:8000`).
    pub backend_url: Url,
    /// API key to submit, if already known.
    pub api_key: Option<SecretString>,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Maximum outstanding event requests during a fan-out.
    max_in_flight: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            backend_url: default_backend_url(),
            api_key: None,
            timeout: DEFAULT_TIMEOUT,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
        }
    }
}

impl SessionConfig {
    pub fn new(backend_url: Url) -> Self {
        Self {
            backend_url,
            ..Self::default()
        }
    }

    pub fn with_api_key(mut self, key: SecretString) -> Self {
        self.api_key = Some(key);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the fan-out bound, clamped to `1..=16`.
    pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = max_in_flight.clamp(1, MAX_IN_FLIGHT_LIMIT);
        self
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight
    }
}

fn default_backend_url() -> Url {
    Url::parse(DEFAULT_BACKEND_URL).expect("default backend URL is valid")
}
