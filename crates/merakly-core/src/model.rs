// ── Domain model ──
//
// Wire types are re-exported from `merakly-api` unchanged; core adds the
// row identity the event table needs.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub use merakly_api::{
    ClientTimestamps, CredentialAck, EventRecord, Network, NetworkDetail, Organization,
};

use crate::error::CoreError;

/// Stable identity of one loaded event row.
///
/// Events carry no unique key of their own (two events may share a
/// timestamp), so a row is identified by the network it was requested for
/// and its position within that network's batch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RowId {
    pub network_id: Arc<str>,
    pub index: usize,
}

impl RowId {
    pub fn new(network_id: impl Into<Arc<str>>, index: usize) -> Self {
        Self {
            network_id: network_id.into(),
            index,
        }
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.network_id, self.index)
    }
}

impl FromStr for RowId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CoreError::Config {
            message: format!("invalid row id '{s}' (expected NETWORK_ID#INDEX)"),
        };
        let (network_id, index) = s.rsplit_once('#').ok_or_else(invalid)?;
        if network_id.is_empty() {
            return Err(invalid());
        }
        let index = index.parse().map_err(|_| invalid())?;
        Ok(Self::new(network_id, index))
    }
}

/// One row of the loaded event sequence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventRow {
    pub id: RowId,
    pub record: EventRecord,
}

impl EventRow {
    /// Tag a network's batch with row identities, preserving order.
    pub fn from_batch(network_id: &str, batch: Vec<EventRecord>) -> Vec<Self> {
        let network_id: Arc<str> = Arc::from(network_id);
        batch
            .into_iter()
            .enumerate()
            .map(|(index, record)| Self {
                id: RowId::new(Arc::clone(&network_id), index),
                record,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn row_id_round_trips_through_text() {
        let id = RowId::new("L_6468#x", 12);
        assert_eq!(id.to_string(), "L_6468#x#12");
        assert_eq!("L_6468#x#12".parse::<RowId>(), Ok(id));
        assert!("12".parse::<RowId>().is_err());
        assert!("#3".parse::<RowId>().is_err());
        assert!("N_1#x".parse::<RowId>().is_err());
    }

    #[test]
    fn rows_with_equal_timestamps_stay_distinct() {
        let record: EventRecord = [("occurred_at", json!("2024-06-15T10:30:00Z"))]
            .into_iter()
            .collect();
        let rows = EventRow::from_batch("N_1", vec![record.clone(), record]);
        assert_eq!(rows.len(), 2);
        assert_ne!(rows[0].id, rows[1].id);
        assert_eq!(rows[1].id.to_string(), "N_1#1");
    }
}
