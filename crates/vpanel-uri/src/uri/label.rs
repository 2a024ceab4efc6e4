//! Render context and the display label shown by client apps.

use serde::{Deserialize, Serialize};
use vpanel_core::validation::MIN_SECRET_LEN;
use vpanel_core::{ProvisionError, ProvisionResult};

/// Server facts every descriptor embeds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderContext {
    /// Public hostname clients connect to.
    pub hostname: String,
    pub region: String,
    /// Port of the shared vmess inbound.
    pub vmess_port: u16,
}

impl RenderContext {
    pub fn new(hostname: impl Into<String>, region: impl Into<String>, vmess_port: u16) -> Self {
        Self {
            hostname: hostname.into(),
            region: region.into(),
            vmess_port,
        }
    }

    /// Hostname up to the first `.`.
    pub fn subdomain(&self) -> &str {
        self.hostname.split('.').next().unwrap_or_default()
    }
}

const LOCKED_OPEN: &str = " [locked:";

/// `valid before (<expire>) <subdomain>-<region>-<last4>`.
pub fn display_label(
    ctx: &RenderContext,
    expire_date: &str,
    identity: &str,
) -> ProvisionResult<String> {
    let chars: Vec<char> = identity.chars().collect();
    if chars.len() < MIN_SECRET_LEN {
        return Err(ProvisionError::InvalidCredential(format!(
            "identity needs at least {} characters for its label",
            MIN_SECRET_LEN
        )));
    }
    let last4: String = chars[chars.len() - MIN_SECRET_LEN..].iter().collect();
    Ok(format!(
        "valid before ({}) {}-{}-{}",
        expire_date,
        ctx.subdomain(),
        ctx.region,
        last4
    ))
}

pub fn locked_label(base: &str, device_id: &str) -> String {
    format!("{}{}{}]", base, LOCKED_OPEN, device_id)
}

/// Device id carried by a locked label, if any.
pub fn locked_device(label: &str) -> Option<&str> {
    let inner = label.strip_suffix(']')?;
    let at = inner.rfind(LOCKED_OPEN)?;
    Some(&inner[at + LOCKED_OPEN.len()..])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> RenderContext {
        RenderContext::new("vpn.example.com", "de", 443)
    }

    #[test]
    fn label_uses_subdomain_and_last_four() {
        assert_eq!(
            display_label(&ctx(), "2025-12-31", "abc123").unwrap(),
            "valid before (2025-12-31) vpn-de-c123"
        );
    }

    #[test]
    fn bare_hostname_is_its_own_subdomain() {
        let ctx = RenderContext::new("localhost", "lab", 443);
        assert_eq!(display_label(&ctx, "", "wxyz").unwrap(), "valid before () localhost-lab-wxyz");
    }

    #[test]
    fn short_identity_is_rejected() {
        let err = display_label(&ctx(), "2025-12-31", "abc").unwrap_err();
        assert!(matches!(err, ProvisionError::InvalidCredential(_)));
    }

    #[test]
    fn locked_suffix_round_trips() {
        let label = locked_label("valid before (x) a-b-cdef", "PHONE-1");
        assert_eq!(label, "valid before (x) a-b-cdef [locked:PHONE-1]");
        assert_eq!(locked_device(&label), Some("PHONE-1"));
        assert_eq!(locked_device("valid before (x) a-b-cdef"), None);
    }
}
