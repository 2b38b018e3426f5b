// Backend gateway client
//
// One method per backend endpoint. The credential is stored server-side
// after `submit_credential`, so the read endpoints carry no auth material.
// Events have no batch endpoint: callers fan out `list_network_events`
// once per network.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::debug;
use url::Url;

use crate::bridge::{Bridge, BridgeError, HttpBridge};
use crate::error::{Error, Resource};
use crate::models::{CredentialAck, EventRecord, Network, NetworkDetail, Organization};
use crate::transport::TransportConfig;

/// Throwaway base used only to percent-encode path segments.
const SEGMENT_BASE: &str = "http://segments.invalid/";

/// Function-per-endpoint client over a [`Bridge`].
///
/// Cheaply cloneable; every operation is idempotent and safe to retry.
#[derive(Clone)]
pub struct GatewayClient {
    bridge: Arc<dyn Bridge>,
}

impl GatewayClient {
    /// Wrap an existing bridge.
    pub fn new(bridge: Arc<dyn Bridge>) -> Self {
        Self { bridge }
    }

    /// Build an HTTP-backed client for the backend at `base_url`.
    pub fn connect(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let bridge = HttpBridge::new(base_url, transport)?;
        Ok(Self::new(Arc::new(bridge)))
    }

    /// Hand the API key to the backend.
    ///
    /// `POST /set_api_key` with `{"api_key": "..."}`. An empty key is
    /// rejected locally without a request.
    pub async fn submit_credential(&self, key: &SecretString) -> Result<CredentialAck, Error> {
        let secret = key.expose_secret();
        if secret.trim().is_empty() {
            return Err(Error::CredentialRejected {
                reason: "API key is empty".into(),
            });
        }

        debug!("submitting API key");
        let value = self
            .bridge
            .post("/set_api_key", &json!({ "api_key": secret }))
            .await
            .map_err(Error::credential)?;

        // Any 2xx counts as acceptance; a non-object ack is tolerated.
        Ok(serde_json::from_value(value).unwrap_or_default())
    }

    /// List organizations visible to the submitted key.
    ///
    /// `GET /organizations`
    pub async fn list_organizations(&self) -> Result<Vec<Organization>, Error> {
        debug!("listing organizations");
        self.get(Resource::Organizations, "/organizations").await
    }

    /// List networks of one organization.
    ///
    /// `GET /networks/{orgId}`
    pub async fn list_networks(&self, org_id: &str) -> Result<Vec<Network>, Error> {
        debug!(org_id, "listing networks");
        let path = endpoint(&["networks", org_id]);
        self.get(Resource::Networks, &path).await
    }

    /// Fetch the flattened event batch of one network.
    ///
    /// `GET /networks/{networkId}/events`
    pub async fn list_network_events(&self, network_id: &str) -> Result<Vec<EventRecord>, Error> {
        debug!(network_id, "listing network events");
        let path = endpoint(&["networks", network_id, "events"]);
        self.get(Resource::Events, &path).await
    }

    /// Fetch client details for many networks in one call.
    ///
    /// `POST /networks/details` with `{"network_ids": [...]}`
    pub async fn list_network_details(
        &self,
        network_ids: &[String],
    ) -> Result<Vec<NetworkDetail>, Error> {
        debug!(count = network_ids.len(), "listing network details");
        let value = self
            .bridge
            .post("/networks/details", &json!({ "network_ids": network_ids }))
            .await
            .map_err(|e| Error::fetch(Resource::Details, e))?;
        decode(Resource::Details, value)
    }

    // ── Request helpers ──────────────────────────────────────────────

    async fn get<T: DeserializeOwned>(&self, resource: Resource, path: &str) -> Result<T, Error> {
        let value = self
            .bridge
            .get(path, &[])
            .await
            .map_err(|e| Error::fetch(resource, e))?;
        decode(resource, value)
    }
}

fn decode<T: DeserializeOwned>(resource: Resource, value: Value) -> Result<T, Error> {
    T::deserialize(&value).map_err(|e| Error::FetchFailed {
        resource,
        source: BridgeError::Deserialization {
            message: e.to_string(),
            body: value.to_string(),
        },
    })
}

/// Build an absolute path from raw segments, percent-encoding each one.
fn endpoint(segments: &[&str]) -> String {
    let mut url = Url::parse(SEGMENT_BASE).expect("static segment base is a valid URL");
    if let Ok(mut path) = url.path_segments_mut() {
        path.clear().extend(segments);
    }
    url.path().to_owned()
}
