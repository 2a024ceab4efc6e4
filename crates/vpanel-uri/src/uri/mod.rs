//! Connection descriptor codec.
//!
//! - `vmess`: `vmess://` + base64 JSON
//! - `shadowsocks`: `ss://` + base64 user info, endpoint and escaped label
//! - `locked`: `v2box://locked=` + base64 of a plain descriptor
//! - `label`: [`RenderContext`] and the display label
//! - `escape`: query escaping and HTML-safe JSON
//!
//! Output is byte-for-byte stable; client apps parse it.
//!
//! ```text
//! render(ctx, Protocol::Shadowsocks, &credential, DescriptorForm::Plain)
//!   => ss://YWVzLTEyOC1nY206YWJjMTIz@vpn.example.com:10000#valid+before+...
//! ```

pub mod escape;
pub mod label;
pub mod locked;
pub mod shadowsocks;
pub mod vmess;

pub use label::{display_label, locked_device, RenderContext};
pub use locked::{lock, unlock, LOCKED_SCHEME};
pub use shadowsocks::{decode_shadowsocks, shadowsocks_uri, ShadowsocksDescriptor};
pub use vmess::{decode_vmess, vmess_uri, VmessDescriptor};

use serde::{Deserialize, Serialize};
use vpanel_core::{Credential, Protocol, ProvisionError, ProvisionResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DescriptorForm {
    #[default]
    Plain,
    /// Bound to the credential's device; fails without a binding.
    Locked,
}

pub fn render(
    ctx: &RenderContext,
    protocol: Protocol,
    credential: &Credential,
    form: DescriptorForm,
) -> ProvisionResult<String> {
    match (protocol, form) {
        (Protocol::Vmess, DescriptorForm::Plain) => vmess_uri(ctx, credential),
        (Protocol::Vmess, DescriptorForm::Locked) => {
            Ok(lock(&vmess::vmess_bound_uri(ctx, credential)?))
        }
        (Protocol::Shadowsocks, DescriptorForm::Plain) => shadowsocks_uri(ctx, credential),
        (Protocol::Shadowsocks, DescriptorForm::Locked) => {
            Ok(lock(&shadowsocks::shadowsocks_bound_uri(ctx, credential)?))
        }
        (Protocol::Sstp, _) => Err(ProvisionError::Unsupported(
            "sstp accounts have no connection descriptor".into(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> RenderContext {
        RenderContext::new("vpn.example.com", "de", 443)
    }

    fn bound() -> Credential {
        Credential {
            id: "3b2a6c1e-9d4f-4a7b-8e21-5f0c9d7a1b42".into(),
            password: "abc123".into(),
            port: 10000,
            device_id: "DEV1".into(),
            expire_date: "2025-12-31".into(),
            ..Default::default()
        }
    }

    #[test]
    fn locked_vmess_recovers_device() {
        let uri = render(&ctx(), Protocol::Vmess, &bound(), DescriptorForm::Locked).unwrap();
        assert!(uri.starts_with(LOCKED_SCHEME));
        let d = decode_vmess(&unlock(&uri).unwrap()).unwrap();
        assert_eq!(d.device_id, "DEV1");
        assert_eq!(locked_device(&d.ps), Some("DEV1"));
    }

    #[test]
    fn locked_shadowsocks_recovers_device_and_secret() {
        let uri = render(&ctx(), Protocol::Shadowsocks, &bound(), DescriptorForm::Locked).unwrap();
        let d = decode_shadowsocks(&unlock(&uri).unwrap()).unwrap();
        assert_eq!(d.password, "abc123");
        assert_eq!(d.port, 10000);
        assert_eq!(locked_device(&d.label), Some("DEV1"));
    }

    #[test]
    fn locked_needs_binding_plain_does_not() {
        let unbound = Credential { device_id: "  ".into(), ..bound() };
        for protocol in [Protocol::Vmess, Protocol::Shadowsocks] {
            let err = render(&ctx(), protocol, &unbound, DescriptorForm::Locked).unwrap_err();
            assert!(matches!(err, ProvisionError::MissingDeviceBinding));
            assert!(render(&ctx(), protocol, &unbound, DescriptorForm::Plain).is_ok());
        }
    }

    #[test]
    fn sstp_has_no_descriptor() {
        let err = render(&ctx(), Protocol::Sstp, &bound(), DescriptorForm::Plain).unwrap_err();
        assert!(matches!(err, ProvisionError::Unsupported(_)));
    }
}
