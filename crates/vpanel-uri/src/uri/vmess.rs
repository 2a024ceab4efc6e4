//! `vmess://` descriptors: standard base64 of a JSON object.

use crate::uri::escape::to_html_safe_json;
use crate::uri::label::{display_label, locked_label, RenderContext};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use vpanel_core::{Credential, ProvisionError, ProvisionResult};

pub const VMESS_SCHEME: &str = "vmess://";

/// Descriptor body. Field order is the wire order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmessDescriptor {
    pub add: String,
    pub aid: String,
    pub alpn: String,
    #[serde(rename = "deviceID", default, skip_serializing_if = "String::is_empty")]
    pub device_id: String,
    pub fp: String,
    pub host: String,
    #[serde(default)]
    pub id: String,
    pub net: String,
    pub path: String,
    pub port: String,
    pub ps: String,
    pub scy: String,
    pub sni: String,
    pub tls: String,
    #[serde(rename = "type")]
    pub header_type: String,
    pub v: String,
}

impl VmessDescriptor {
    fn new(ctx: &RenderContext, credential: &Credential, ps: String) -> Self {
        Self {
            add: ctx.hostname.clone(),
            aid: "1".to_string(),
            alpn: String::new(),
            device_id: String::new(),
            fp: String::new(),
            host: "www.youtube.com".to_string(),
            id: credential.id.clone(),
            net: "tcp".to_string(),
            path: "/".to_string(),
            port: ctx.vmess_port.to_string(),
            ps,
            scy: "none".to_string(),
            sni: String::new(),
            tls: String::new(),
            header_type: "http".to_string(),
            v: "2".to_string(),
        }
    }

    pub fn encode(&self) -> ProvisionResult<String> {
        let json = to_html_safe_json(self)?;
        Ok(format!("{}{}", VMESS_SCHEME, STANDARD.encode(json)))
    }
}

pub fn vmess_uri(ctx: &RenderContext, credential: &Credential) -> ProvisionResult<String> {
    let ps = display_label(ctx, &credential.expire_date, &credential.id)?;
    VmessDescriptor::new(ctx, credential, ps).encode()
}

/// Plain descriptor carrying the device binding in `deviceID` and the label.
pub fn vmess_bound_uri(ctx: &RenderContext, credential: &Credential) -> ProvisionResult<String> {
    if !credential.has_device_binding() {
        return Err(ProvisionError::MissingDeviceBinding);
    }
    let device = credential.device_id.trim();
    let ps = locked_label(&display_label(ctx, &credential.expire_date, &credential.id)?, device);
    let mut descriptor = VmessDescriptor::new(ctx, credential, ps);
    descriptor.device_id = device.to_string();
    descriptor.encode()
}

pub fn decode_vmess(uri: &str) -> ProvisionResult<VmessDescriptor> {
    let body = uri
        .strip_prefix(VMESS_SCHEME)
        .ok_or_else(|| ProvisionError::InvalidDescriptor("missing vmess:// scheme".into()))?;
    let json = STANDARD.decode(body.trim()).map_err(|e| {
        ProvisionError::InvalidDescriptor(format!("vmess body is not base64: {}", e))
    })?;
    serde_json::from_slice(&json).map_err(|e| {
        ProvisionError::InvalidDescriptor(format!("vmess body is not a descriptor: {}", e))
    })
}
