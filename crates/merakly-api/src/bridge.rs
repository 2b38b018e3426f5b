// Process-boundary request bridge
//
// The UI side never talks to the network directly. It hands a verb, a path
// and an optional payload to a `Bridge`, and gets parsed JSON back or a
// classified rejection. `HttpBridge` is the production implementation over
// `reqwest`; tests substitute scripted bridges.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, trace};
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;

/// Maximum number of body characters kept in a status rejection message.
const BODY_PREVIEW_CHARS: usize = 200;

/// Why a bridge request was rejected.
#[derive(Debug, Clone, Error)]
pub enum BridgeError {
    /// The backend answered with a non-2xx status.
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// Connection refused, DNS failure, or similar: nothing answered.
    #[error("backend unreachable at {url}: {reason}")]
    Unreachable { url: String, reason: String },

    /// The request exceeded the transport timeout.
    #[error("request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// The response body could not be decoded into the expected shape.
    #[error("unexpected response body: {message}")]
    Deserialization { message: String, body: String },

    /// Any other transport failure (request construction, body read, ...).
    #[error("transport error: {0}")]
    Transport(String),
}

/// The two primitives a presentation layer is allowed to use.
///
/// Both reject when the underlying transport reports a non-success status.
#[async_trait]
pub trait Bridge: Send + Sync {
    /// `GET {path}` with optional query parameters.
    async fn get(&self, path: &str, params: &[(&str, &str)]) -> Result<Value, BridgeError>;

    /// `POST {path}` with a JSON body.
    async fn post(&self, path: &str, body: &Value) -> Result<Value, BridgeError>;
}

/// `reqwest`-backed bridge against a fixed backend base URL.
pub struct HttpBridge {
    http: reqwest::Client,
    base_url: Url,
    timeout_secs: u64,
}

impl HttpBridge {
    /// Create a bridge from a `TransportConfig`.
    ///
    /// `base_url` is the backend root, e.g. `http://localhost:8000`.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self {
            http,
            base_url,
            timeout_secs: transport.timeout.as_secs(),
        })
    }

    /// Create a bridge with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self {
            http,
            base_url,
            timeout_secs: TransportConfig::default().timeout.as_secs(),
        }
    }

    /// The backend base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Join an absolute endpoint path onto the base URL, keeping any
    /// path prefix the base carries.
    fn endpoint_url(&self, path: &str) -> Result<Url, BridgeError> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let path = path.trim_start_matches('/');
        Url::parse(&format!("{base}/{path}"))
            .map_err(|e| BridgeError::Transport(format!("invalid endpoint URL: {e}")))
    }

    fn classify(&self, url: &Url, err: &reqwest::Error) -> BridgeError {
        if err.is_timeout() {
            BridgeError::Timeout {
                timeout_secs: self.timeout_secs,
            }
        } else if err.is_connect() {
            BridgeError::Unreachable {
                url: url.to_string(),
                reason: err.to_string(),
            }
        } else {
            BridgeError::Transport(err.to_string())
        }
    }

    /// Check the status, then decode the JSON body.
    async fn read(&self, url: &Url, resp: reqwest::Response) -> Result<Value, BridgeError> {
        let status = resp.status();
        trace!(%status, %url, "backend responded");

        let body = resp.text().await.map_err(|e| self.classify(url, &e))?;

        if !status.is_success() {
            return Err(BridgeError::Status {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        serde_json::from_str(&body).map_err(|e| BridgeError::Deserialization {
            message: format!("{e} (body preview: {:?})", preview(&body)),
            body,
        })
    }
}

#[async_trait]
impl Bridge for HttpBridge {
    async fn get(&self, path: &str, params: &[(&str, &str)]) -> Result<Value, BridgeError> {
        let url = self.endpoint_url(path)?;
        debug!("GET {}", url);

        let resp = self
            .http
            .get(url.clone())
            .query(params)
            .send()
            .await
            .map_err(|e| self.classify(&url, &e))?;

        self.read(&url, resp).await
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value, BridgeError> {
        let url = self.endpoint_url(path)?;
        debug!("POST {}", url);

        let resp = self
            .http
            .post(url.clone())
            .json(body)
            .send()
            .await
            .map_err(|e| self.classify(&url, &e))?;

        self.read(&url, resp).await
    }
}

/// The backend reports failures as `{"detail": "..."}`; fall back to a
/// preview of the raw body for anything else.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| match v.get("detail") {
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
            None => None,
        })
        .unwrap_or_else(|| preview(body))
}

fn preview(body: &str) -> String {
    body.chars().take(BODY_PREVIEW_CHARS).collect()
}
