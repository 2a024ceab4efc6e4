//! Device-locked wrapper understood by V2Box.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use vpanel_core::{ProvisionError, ProvisionResult};

pub const LOCKED_SCHEME: &str = "v2box://locked=";

pub fn lock(plain: &str) -> String {
    format!("{}{}", LOCKED_SCHEME, STANDARD.encode(plain))
}

/// The plain descriptor inside a locked one.
pub fn unlock(locked: &str) -> ProvisionResult<String> {
    let body = locked
        .strip_prefix(LOCKED_SCHEME)
        .ok_or_else(|| ProvisionError::InvalidDescriptor("missing v2box://locked= prefix".into()))?;
    let plain = STANDARD.decode(body.trim()).map_err(|e| {
        ProvisionError::InvalidDescriptor(format!("locked body is not base64: {}", e))
    })?;
    String::from_utf8(plain)
        .map_err(|_| ProvisionError::InvalidDescriptor("locked body is not UTF-8".into()))
}
