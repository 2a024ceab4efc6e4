//! `ss://` descriptors in SIP002 form with a base64 user-info part.

use crate::uri::escape::{query_escape, query_unescape};
use crate::uri::label::{display_label, locked_label, RenderContext};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::Serialize;
use vpanel_core::{Credential, ProvisionError, ProvisionResult, SHADOWSOCKS_METHOD};

pub const SHADOWSOCKS_SCHEME: &str = "ss://";

/// Fields recovered from an `ss://` descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShadowsocksDescriptor {
    pub method: String,
    pub password: String,
    pub host: String,
    pub port: u16,
    pub label: String,
}

impl ShadowsocksDescriptor {
    pub fn encode(&self) -> String {
        let user_info = STANDARD.encode(format!("{}:{}", self.method, self.password));
        format!(
            "{}{}@{}:{}#{}",
            SHADOWSOCKS_SCHEME,
            user_info,
            self.host,
            self.port,
            query_escape(&self.label)
        )
    }
}

fn descriptor(
    ctx: &RenderContext,
    credential: &Credential,
    label: String,
) -> ProvisionResult<ShadowsocksDescriptor> {
    if credential.port == 0 {
        return Err(ProvisionError::InvalidCredential(
            "shadowsocks credential has no allocated port".into(),
        ));
    }
    Ok(ShadowsocksDescriptor {
        method: SHADOWSOCKS_METHOD.to_string(),
        password: credential.password.clone(),
        host: ctx.hostname.clone(),
        port: credential.port,
        label,
    })
}

pub fn shadowsocks_uri(ctx: &RenderContext, credential: &Credential) -> ProvisionResult<String> {
    let label = display_label(ctx, &credential.expire_date, &credential.password)?;
    Ok(descriptor(ctx, credential, label)?.encode())
}

/// Plain descriptor whose label names the bound device.
pub fn shadowsocks_bound_uri(
    ctx: &RenderContext,
    credential: &Credential,
) -> ProvisionResult<String> {
    if !credential.has_device_binding() {
        return Err(ProvisionError::MissingDeviceBinding);
    }
    let base = display_label(ctx, &credential.expire_date, &credential.password)?;
    let label = locked_label(&base, credential.device_id.trim());
    Ok(descriptor(ctx, credential, label)?.encode())
}

pub fn decode_shadowsocks(uri: &str) -> ProvisionResult<ShadowsocksDescriptor> {
    let invalid =
        |what: &str| ProvisionError::InvalidDescriptor(format!("shadowsocks descriptor: {}", what));

    let body = uri
        .strip_prefix(SHADOWSOCKS_SCHEME)
        .ok_or_else(|| invalid("missing ss:// scheme"))?;
    let (body, label) = match body.split_once('#') {
        Some((body, fragment)) => (body, query_unescape(fragment)?),
        None => (body, String::new()),
    };
    let (user_info, endpoint) = body.rsplit_once('@').ok_or_else(|| invalid("missing '@'"))?;
    let (host, port) = endpoint.rsplit_once(':').ok_or_else(|| invalid("missing port"))?;
    let port: u16 = port.parse().map_err(|_| invalid("port is not a number"))?;

    let decoded = STANDARD
        .decode(user_info)
        .map_err(|_| invalid("user info is not base64"))?;
    let decoded = String::from_utf8(decoded).map_err(|_| invalid("user info is not UTF-8"))?;
    let (method, password) = decoded
        .split_once(':')
        .ok_or_else(|| invalid("user info lacks method"))?;

    Ok(ShadowsocksDescriptor {
        method: method.to_string(),
        password: password.to_string(),
        host: host.to_string(),
        port,
        label,
    })
}
