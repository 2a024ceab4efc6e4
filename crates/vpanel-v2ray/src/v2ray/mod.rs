//! # v2ray credential stores
//!
//! Keeps a configuration document and a roster document in step for the two
//! protocols served by the local v2ray daemon.
//!
//! ## Capabilities
//!
//! - **vmess**: one shared inbound; each credential adds a client id
//! - **shadowsocks**: one inbound per credential on an allocated port,
//!   with the firewall opened and closed alongside
//! - Create, edit, delete, list and lookup by identity
//! - Consistency report across the document pair
//!
//! ## Architecture
//!
//! - `types`: inbound shapes (unknown keys preserved)
//! - `document`: loading and committing the document pair
//! - `layout`: per-protocol mapping of credentials onto inbounds
//! - `store`: [`FileRecordStore`], generic over the layout
//! - `consistency`: [`ConsistencyReport`]

pub mod consistency;
pub mod document;
pub mod layout;
pub mod store;
pub mod types;

pub use consistency::ConsistencyReport;
pub use document::{DocumentPair, JsonDocument};
pub use layout::{InboundLayout, PerCredentialInbound, PortPolicy, SharedInbound};
pub use store::{EditOutcome, FileRecordStore, ShadowsocksStore, StoreConfig, VmessStore};
