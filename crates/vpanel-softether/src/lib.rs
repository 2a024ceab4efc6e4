//! # VPanel – SoftEther
//!
//! SSTP accounts kept in a SoftEther VPN Server hub, managed through its
//! JSON-RPC administration endpoint.

pub mod softether;

pub use softether::*;
