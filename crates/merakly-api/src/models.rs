// Backend response types
//
// Models for the backend proxy's JSON payloads. Dashboard objects carry
// many more fields than the UI needs; the common ones are modelled
// explicitly and everything else lands in `extra`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ── Credential ───────────────────────────────────────────────────────

/// Acknowledgement returned by `POST /set_api_key`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CredentialAck {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ── Organization ─────────────────────────────────────────────────────

/// A dashboard organization from `GET /organizations`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Organization {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            extra: Map::new(),
        }
    }
}

// ── Network ──────────────────────────────────────────────────────────

/// A network belonging to one organization, from `GET /networks/{orgId}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Network {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "organizationId")]
    pub organization_id: Option<String>,
    #[serde(default, rename = "productTypes")]
    pub product_types: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Network {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            organization_id: None,
            product_types: Vec::new(),
            extra: Map::new(),
        }
    }
}

// ── Event ────────────────────────────────────────────────────────────

/// One flattened network event from `GET /networks/{networkId}/events`.
///
/// The field set is open: the backend emits the well-known keys below plus
/// whatever vendor-specific extras it chooses (`event_data`,
/// `product_type`, ...). Nothing in the payload is guaranteed unique.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventRecord {
    fields: Map<String, Value>,
}

impl EventRecord {
    pub const OCCURRED_AT: &'static str = "occurred_at";
    pub const NETWORK_ID: &'static str = "network_id";
    pub const TYPE: &'static str = "type";
    pub const DESCRIPTION: &'static str = "description";
    pub const CATEGORY: &'static str = "category";

    pub fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// Raw value of a field, if present.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// All `(name, value)` pairs.
    pub fn fields(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }

    /// All field values.
    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.fields.values()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn str_field(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(Value::as_str)
    }

    pub fn occurred_at(&self) -> Option<&str> {
        self.str_field(Self::OCCURRED_AT)
    }

    pub fn network_id(&self) -> Option<&str> {
        self.str_field(Self::NETWORK_ID)
    }

    pub fn event_type(&self) -> Option<&str> {
        self.str_field(Self::TYPE)
    }

    pub fn description(&self) -> Option<&str> {
        self.str_field(Self::DESCRIPTION)
    }

    pub fn category(&self) -> Option<&str> {
        self.str_field(Self::CATEGORY)
    }

    /// Consume the record, returning the underlying field map.
    pub fn into_fields(self) -> Map<String, Value> {
        self.fields
    }
}

impl From<Map<String, Value>> for EventRecord {
    fn from(fields: Map<String, Value>) -> Self {
        Self::new(fields)
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for EventRecord {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

// ── Network details ──────────────────────────────────────────────────

/// First/last sighting of a client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientTimestamps {
    #[serde(default)]
    pub first_seen: Option<Value>,
    #[serde(default)]
    pub last_seen: Option<Value>,
}

/// One client row from `POST /networks/details`, joined with the
/// access point it was last seen on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkDetail {
    #[serde(default)]
    pub client_mac: Option<String>,
    #[serde(default)]
    pub client_user_id: Option<String>,
    #[serde(default)]
    pub client_timestamps: ClientTimestamps,
    #[serde(default)]
    pub network_id: Option<String>,
    #[serde(default)]
    pub wap_name: Option<String>,
    #[serde(default)]
    pub mr_device_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn event_record_keeps_vendor_fields() {
        let record: EventRecord = serde_json::from_value(json!({
            "occurred_at": "2024-06-15T10:30:00Z",
            "type": "association",
            "ssid_number": 3,
            "event_data": { "rssi": "41" },
            "product_type": "wireless"
        }))
        .expect("object decodes");

        assert_eq!(record.occurred_at(), Some("2024-06-15T10:30:00Z"));
        assert_eq!(record.event_type(), Some("association"));
        assert_eq!(record.get("ssid_number"), Some(&json!(3)));
        assert_eq!(record.len(), 5);
    }

    #[test]
    fn non_object_event_is_rejected() {
        assert!(serde_json::from_value::<EventRecord>(json!("nope")).is_err());
    }

    #[test]
    fn network_detail_tolerates_nulls() {
        let detail: NetworkDetail = serde_json::from_value(json!({
            "client_mac": "aa:bb:cc:dd:ee:ff",
            "client_user_id": null,
            "client_timestamps": { "first_seen": 1_718_000_000, "last_seen": null },
            "network_id": "N_1",
            "wap_name": null,
            "mr_device_name": "MR46"
        }))
        .expect("detail decodes");

        assert_eq!(detail.client_mac.as_deref(), Some("aa:bb:cc:dd:ee:ff"));
        assert!(detail.client_user_id.is_none());
        assert_eq!(detail.client_timestamps.first_seen, Some(json!(1_718_000_000)));
        assert_eq!(detail.mr_device_name.as_deref(), Some("MR46"));
    }
}
