//! Session logic between `merakly-api` and presentation shells.
//!
//! - **[`Session`]**: owns the one [`SelectionState`] of a session and
//!   walks it through the funnel (credential → organization → networks →
//!   events). Snapshots are published over a `tokio::sync::watch` channel.
//!
//! - **[`EventTable`]**: derived, filtered and sorted view over the loaded
//!   events. Never mutates the event set it is given.
//!
//! - **[`ordered_fan_out`]**: bounded parallel requests whose results come
//!   back in key order, used for the per-network event fetch.

pub mod config;
pub mod error;
pub mod fanout;
pub mod model;
pub mod session;
pub mod table;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{DEFAULT_MAX_IN_FLIGHT, MAX_IN_FLIGHT_LIMIT, SessionConfig};
pub use error::CoreError;
pub use fanout::{Generation, ordered_fan_out};
pub use model::{
    ClientTimestamps, CredentialAck, EventRecord, EventRow, Network, NetworkDetail, Organization,
    RowId,
};
pub use session::{
    AcceptedSession, FunnelState, LoadOutcome, OrganizationScope, Panel, PanelErrors, Phase,
    SelectionState, Session,
};
pub use table::{EventColumn, EventTable, SortDirection, SortFilterConfig, cell_text, derive_view};

pub use merakly_api::Resource;
