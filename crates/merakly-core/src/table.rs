//! Event table engine: free-text filter plus stable column sort.
//!
//! The engine never mutates the loaded events. It keeps a derived view as
//! a list of indices into the current event set and recomputes it whenever
//! the events, the sort key, the sort direction, or the query change.
//! Lower-cased search text is prepared once per event set, so a keystroke
//! costs one filter pass and one sort over indices.

use std::borrow::Cow;
use std::cmp::Ordering;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

use crate::model::{EventRow, RowId};

// ── Column catalogue ─────────────────────────────────────────────────

/// The fixed columns of the event table, in display order.
///
/// Sorting is not limited to these: any field name present in the
/// records is a valid sort key.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, EnumString, IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum EventColumn {
    OccurredAt,
    NetworkId,
    Type,
    Description,
    Category,
    ClientId,
    ClientDescription,
    ClientMac,
    DeviceSerial,
    DeviceName,
    SsidNumber,
}

impl EventColumn {
    /// Record field this column reads.
    pub fn field(self) -> &'static str {
        self.into()
    }

    /// Column header label.
    pub fn header(self) -> &'static str {
        match self {
            Self::OccurredAt => "Occurred At",
            Self::NetworkId => "Network ID",
            Self::Type => "Event Type",
            Self::Description => "Description",
            Self::Category => "Category",
            Self::ClientId => "Client ID",
            Self::ClientDescription => "Client Description",
            Self::ClientMac => "Client MAC",
            Self::DeviceSerial => "Device Serial",
            Self::DeviceName => "Device Name",
            Self::SsidNumber => "SSID Number",
        }
    }

    pub fn all() -> impl Iterator<Item = Self> {
        Self::iter()
    }
}

// ── Sort / filter configuration ──────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn toggled(self) -> Self {
        match self {
            Self::Ascending => Self::Descending,
            Self::Descending => Self::Ascending,
        }
    }

    /// Arrow shown next to the active column header.
    pub fn indicator(self) -> &'static str {
        match self {
            Self::Ascending => "▲",
            Self::Descending => "▼",
        }
    }
}

/// Sort key, direction, and search query driving the derived view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortFilterConfig {
    pub sort_key: Option<String>,
    pub sort_direction: SortDirection,
    pub search_query: String,
}

impl SortFilterConfig {
    /// Header click: the same key flips direction, a new key starts
    /// ascending.
    pub fn request_sort(&mut self, key: impl Into<String>) {
        let key = key.into();
        if self.sort_key.as_deref() == Some(key.as_str()) {
            self.sort_direction = self.sort_direction.toggled();
        } else {
            self.sort_key = Some(key);
            self.sort_direction = SortDirection::Ascending;
        }
    }
}

// ── Engine ───────────────────────────────────────────────────────────

/// Derived, filtered, and sorted view over an event set.
#[derive(Debug, Clone, Default)]
pub struct EventTable {
    events: Arc<[EventRow]>,
    /// Per row, the lower-cased text of every field value.
    haystacks: Vec<Box<[String]>>,
    config: SortFilterConfig,
    view: Vec<usize>,
}

impl EventTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: SortFilterConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Replace the event set. The sort/filter configuration is kept.
    pub fn set_events(&mut self, events: Arc<[EventRow]>) {
        self.haystacks = events
            .iter()
            .map(|row| {
                row.record
                    .values()
                    .map(|v| cell_text(v).to_lowercase())
                    .collect()
            })
            .collect();
        self.events = events;
        self.recompute();
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.config.search_query = query.into();
        self.recompute();
    }

    pub fn request_sort(&mut self, key: impl Into<String>) {
        self.config.request_sort(key);
        self.recompute();
    }

    pub fn set_sort(&mut self, key: Option<String>, direction: SortDirection) {
        self.config.sort_key = key;
        self.config.sort_direction = direction;
        self.recompute();
    }

    pub fn clear_sort(&mut self) {
        self.set_sort(None, SortDirection::Ascending);
    }

    pub fn config(&self) -> &SortFilterConfig {
        &self.config
    }

    /// The full, unfiltered event set.
    pub fn events(&self) -> &Arc<[EventRow]> {
        &self.events
    }

    /// Rows of the derived view, in display order.
    pub fn view(&self) -> impl ExactSizeIterator<Item = &EventRow> + '_ {
        self.view.iter().map(|&i| &self.events[i])
    }

    /// Number of rows in the derived view.
    pub fn len(&self) -> usize {
        self.view.len()
    }

    pub fn is_empty(&self) -> bool {
        self.view.is_empty()
    }

    /// Number of loaded events, ignoring the filter.
    pub fn total(&self) -> usize {
        self.events.len()
    }

    /// Look up a loaded row by identity, whether or not it is visible.
    pub fn row(&self, id: &RowId) -> Option<&EventRow> {
        self.events.iter().find(|row| &row.id == id)
    }

    fn recompute(&mut self) {
        let query = self.config.search_query.to_lowercase();
        let mut view: Vec<usize> = self
            .haystacks
            .iter()
            .enumerate()
            .filter(|(_, fields)| query.is_empty() || fields.iter().any(|f| f.contains(&query)))
            .map(|(i, _)| i)
            .collect();

        if let Some(key) = self.config.sort_key.as_deref() {
            let direction = self.config.sort_direction;
            let events = &self.events;
            view.sort_by(|&a, &b| {
                let ord = compare_values(events[a].record.get(key), events[b].record.get(key));
                match direction {
                    SortDirection::Ascending => ord,
                    SortDirection::Descending => ord.reverse(),
                }
            });
        }

        self.view = view;
    }
}

/// Derive the visible rows for `events` under `config` in one pass.
pub fn derive_view<'a>(events: &'a [EventRow], config: &SortFilterConfig) -> Vec<&'a EventRow> {
    let mut table = EventTable::with_config(config.clone());
    table.set_events(Arc::from(events.to_vec()));
    table.view.iter().map(|&i| &events[i]).collect()
}

// ── Value helpers ────────────────────────────────────────────────────

/// Text shown for a field value. Null renders empty; nested values render
/// as compact JSON.
pub fn cell_text(value: &Value) -> Cow<'_, str> {
    match value {
        // Null renders empty, so the query "null" does not match it
        Value::Null => Cow::Borrowed(""),
        Value::String(s) => Cow::Borrowed(s.as_str()),
        Value::Bool(b) => Cow::Owned(b.to_string()),
        Value::Number(n) => Cow::Owned(n.to_string()),
        Value::Array(_) | Value::Object(_) => Cow::Owned(value.to_string()),
    }
}

/// Natural ordering of two field values.
///
/// Values are ranked by kind first: missing or null, then booleans, then
/// numbers, then everything else by text. Within a rank numbers compare
/// numerically and booleans as `false < true`.
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let a = a.unwrap_or(&Value::Null);
    let b = b.unwrap_or(&Value::Null);
    rank(a).cmp(&rank(b)).then_with(|| match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or(f64::NAN);
            let y = y.as_f64().unwrap_or(f64::NAN);
            x.total_cmp(&y)
        }
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Null, Value::Null) => Ordering::Equal,
        (x, y) => cell_text(x).cmp(&cell_text(y)),
    })
}

fn rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) | Value::Array(_) | Value::Object(_) => 3,
    }
}
