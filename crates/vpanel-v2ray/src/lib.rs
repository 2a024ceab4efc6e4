//! # VPanel – v2ray
//!
//! File-backed credential stores for the protocols served by the local
//! v2ray daemon.

pub mod v2ray;

pub use v2ray::*;
