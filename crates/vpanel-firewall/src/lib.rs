//! # VPanel – Firewall
//!
//! Opens and closes the ports assigned to per-credential inbounds.

pub mod firewall;

pub use firewall::*;
