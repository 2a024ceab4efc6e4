//! SoftEther JSON-RPC integration.
//!
//! - `types`: connection config, RPC envelope, method parameters and results
//! - `api_client`: correlated JSON-RPC calls over HTTPS
//! - `service`: [`SstpStore`], the SSTP credential store on top of the client
//!
//! Every call carries a fresh UUID v4 id and the response must echo it.
//! Nothing is retried.

pub mod api_client;
pub mod service;
pub mod types;

pub use api_client::SoftEtherApiClient;
pub use service::SstpStore;
pub use types::*;
