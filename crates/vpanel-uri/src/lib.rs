//! # VPanel – URI
//!
//! Renders stored credentials as the descriptor strings client apps import,
//! and decodes them back for verification.

pub mod uri;

pub use uri::*;
