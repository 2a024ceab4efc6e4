//! How each local protocol maps credentials onto the `inbounds` array.
//!
//! The store is generic over [`InboundLayout`]; the two implementations
//! cover the two shapes v2ray offers:
//!
//! - [`SharedInbound`]: vmess, one inbound whose client list grows
//! - [`PerCredentialInbound`]: shadowsocks, one inbound (and port) per credential

use crate::v2ray::types::{
    inbound_port, inbound_protocol, ShadowsocksInbound, VmessClient, SHADOWSOCKS_PROTOCOL,
    VMESS_PROTOCOL,
};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::Serialize;
use serde_json::{Map, Value};
use vpanel_core::{Credential, LocalProtocol, ProvisionError, ProvisionResult, DEFAULT_ALTER_ID};

/// Length of generated shadowsocks passwords.
pub const GENERATED_PASSWORD_LEN: usize = 16;

/// Where a credential's port comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortPolicy {
    /// Every credential uses the port of the shared inbound.
    Shared,
    /// Each credential gets a freshly allocated port with its own firewall rule.
    Dedicated,
}

pub trait InboundLayout: Send + Sync + 'static {
    const PROTOCOL: LocalProtocol;
    const PORT_POLICY: PortPolicy;

    /// Fill in identity material the caller left empty.
    fn prepare(credential: &mut Credential);

    /// Identities currently present in the configuration document.
    fn identities(inbounds: &[Value]) -> ProvisionResult<Vec<String>>;

    fn insert(inbounds: &mut Vec<Value>, credential: &Credential) -> ProvisionResult<()>;

    /// Rewrite the entry for `identity` with the settings of `credential`.
    /// Returns false when no entry carries `identity`.
    fn replace(
        inbounds: &mut [Value],
        identity: &str,
        credential: &Credential,
    ) -> ProvisionResult<bool>;

    /// Remove the entry for `identity`, returning the port it was served on.
    fn remove(inbounds: &mut Vec<Value>, identity: &str) -> ProvisionResult<Option<u16>>;

    /// Form of an identity that is safe to log and return in errors.
    fn display_identity(identity: &str) -> String;
}

/// Ports of every inbound, whatever its protocol.
pub fn occupied_ports(inbounds: &[Value]) -> Vec<u16> {
    inbounds.iter().filter_map(inbound_port).collect()
}

/// `****` followed by the last four characters.
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    let tail: String = chars[chars.len().saturating_sub(4)..].iter().collect();
    format!("****{}", tail)
}

fn encode<T: Serialize>(inbound: &T) -> ProvisionResult<Value> {
    serde_json::to_value(inbound).map_err(|e| ProvisionError::persistence("encoding inbound", e))
}

// ─── vmess ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default)]
pub struct SharedInbound;

impl SharedInbound {
    fn position(inbounds: &[Value]) -> ProvisionResult<usize> {
        inbounds
            .iter()
            .position(|entry| inbound_protocol(entry) == Some(VMESS_PROTOCOL))
            .ok_or_else(|| {
                ProvisionError::Persistence("configuration has no vmess inbound".into())
            })
    }

    fn malformed(what: &str) -> ProvisionError {
        ProvisionError::Persistence(format!("vmess inbound: {}", what))
    }

    /// `settings.clients` of the shared inbound; absent means empty.
    fn clients(entry: &Value) -> ProvisionResult<&[Value]> {
        match entry.pointer("/settings/clients") {
            None => Ok(&[]),
            Some(clients) => clients
                .as_array()
                .map(Vec::as_slice)
                .ok_or_else(|| Self::malformed("settings.clients is not an array")),
        }
    }

    /// `settings.clients` of the shared inbound, created when absent.
    fn clients_mut(entry: &mut Value) -> ProvisionResult<&mut Vec<Value>> {
        let settings = entry
            .as_object_mut()
            .ok_or_else(|| Self::malformed("entry is not an object"))?
            .entry("settings")
            .or_insert_with(|| Value::Object(Map::new()));
        settings
            .as_object_mut()
            .ok_or_else(|| Self::malformed("settings is not an object"))?
            .entry("clients")
            .or_insert_with(|| Value::Array(Vec::new()))
            .as_array_mut()
            .ok_or_else(|| Self::malformed("settings.clients is not an array"))
    }

    fn client_id(client: &Value) -> Option<&str> {
        client.get("id").and_then(Value::as_str)
    }
}

impl InboundLayout for SharedInbound {
    const PROTOCOL: LocalProtocol = LocalProtocol::Vmess;
    const PORT_POLICY: PortPolicy = PortPolicy::Shared;

    fn prepare(credential: &mut Credential) {
        if credential.id.trim().is_empty() {
            credential.id = uuid::Uuid::new_v4().to_string();
        }
        credential.alter_id = DEFAULT_ALTER_ID;
    }

    fn identities(inbounds: &[Value]) -> ProvisionResult<Vec<String>> {
        let at = Self::position(inbounds)?;
        Ok(Self::clients(&inbounds[at])?
            .iter()
            .filter_map(Self::client_id)
            .map(str::to_string)
            .collect())
    }

    fn insert(inbounds: &mut Vec<Value>, credential: &Credential) -> ProvisionResult<()> {
        let at = Self::position(inbounds)?;
        let client = encode(&VmessClient::new(credential.id.clone()))?;
        Self::clients_mut(&mut inbounds[at])?.push(client);
        Ok(())
    }

    fn replace(
        inbounds: &mut [Value],
        identity: &str,
        credential: &Credential,
    ) -> ProvisionResult<bool> {
        let at = Self::position(inbounds)?;
        let clients = Self::clients_mut(&mut inbounds[at])?;
        let Some(client) = clients
            .iter_mut()
            .filter(|c| Self::client_id(c) == Some(identity))
            .find_map(Value::as_object_mut)
        else {
            return Ok(false);
        };
        client.insert("id".into(), Value::String(credential.id.clone()));
        client.insert("alterId".into(), Value::from(DEFAULT_ALTER_ID));
        Ok(true)
    }

    fn remove(inbounds: &mut Vec<Value>, identity: &str) -> ProvisionResult<Option<u16>> {
        let at = Self::position(inbounds)?;
        let clients = Self::clients_mut(&mut inbounds[at])?;
        let before = clients.len();
        clients.retain(|c| Self::client_id(c) != Some(identity));
        if clients.len() == before {
            return Ok(None);
        }
        Ok(Some(inbound_port(&inbounds[at]).unwrap_or_default()))
    }

    fn display_identity(identity: &str) -> String {
        identity.to_string()
    }
}

// ─── shadowsocks ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default)]
pub struct PerCredentialInbound;

impl PerCredentialInbound {
    fn is_shadowsocks(entry: &Value) -> bool {
        inbound_protocol(entry) == Some(SHADOWSOCKS_PROTOCOL)
    }

    fn password(entry: &Value) -> Option<&str> {
        entry
            .get("settings")
            .and_then(|s| s.get("password"))
            .and_then(Value::as_str)
    }

    fn position(inbounds: &[Value], identity: &str) -> Option<usize> {
        inbounds.iter().position(|entry| {
            Self::is_shadowsocks(entry) && Self::password(entry) == Some(identity)
        })
    }
}

impl InboundLayout for PerCredentialInbound {
    const PROTOCOL: LocalProtocol = LocalProtocol::Shadowsocks;
    const PORT_POLICY: PortPolicy = PortPolicy::Dedicated;

    fn prepare(credential: &mut Credential) {
        if credential.password.is_empty() {
            credential.password = rand::thread_rng()
                .sample_iter(&Alphanumeric)
                .take(GENERATED_PASSWORD_LEN)
                .map(char::from)
                .collect();
        }
    }

    fn identities(inbounds: &[Value]) -> ProvisionResult<Vec<String>> {
        Ok(inbounds
            .iter()
            .filter(|entry| Self::is_shadowsocks(entry))
            .filter_map(|entry| Self::password(entry).map(str::to_string))
            .collect())
    }

    fn insert(inbounds: &mut Vec<Value>, credential: &Credential) -> ProvisionResult<()> {
        inbounds.push(encode(&ShadowsocksInbound::new(
            credential.port,
            credential.password.clone(),
        ))?);
        Ok(())
    }

    fn replace(
        inbounds: &mut [Value],
        identity: &str,
        credential: &Credential,
    ) -> ProvisionResult<bool> {
        let Some(at) = Self::position(inbounds, identity) else {
            return Ok(false);
        };
        let settings = inbounds[at]
            .get_mut("settings")
            .and_then(Value::as_object_mut);
        let Some(settings) = settings else {
            return Ok(false);
        };
        settings.insert("password".into(), Value::String(credential.password.clone()));
        Ok(true)
    }

    fn remove(inbounds: &mut Vec<Value>, identity: &str) -> ProvisionResult<Option<u16>> {
        Ok(Self::position(inbounds, identity).map(|at| {
            let removed = inbounds.remove(at);
            inbound_port(&removed).unwrap_or_default()
        }))
    }

    fn display_identity(identity: &str) -> String {
        mask_secret(identity)
    }
}
