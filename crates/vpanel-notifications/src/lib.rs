//! # VPanel – Notifications
//!
//! Push notifications sent after successful provisioning changes.

pub mod gotify;

pub use gotify::*;
