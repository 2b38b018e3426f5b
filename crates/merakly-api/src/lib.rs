// merakly-api: Async client for the local backend proxy that fronts the Meraki dashboard

pub mod bridge;
pub mod error;
pub mod gateway;
pub mod models;
pub mod transport;

pub use bridge::{Bridge, BridgeError, HttpBridge};
pub use error::{Error, Resource};
pub use gateway::GatewayClient;
pub use models::{
    ClientTimestamps, CredentialAck, EventRecord, Network, NetworkDetail, Organization,
};
pub use transport::TransportConfig;
