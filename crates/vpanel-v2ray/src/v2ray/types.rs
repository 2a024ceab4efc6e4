//! Inbound shapes of the v2ray configuration documents.
//!
//! These shapes only build new entries. Existing entries are edited in place
//! on the raw [`Value`], so keys written by hand survive untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use vpanel_core::{DEFAULT_ALTER_ID, SHADOWSOCKS_METHOD};

pub const VMESS_PROTOCOL: &str = "vmess";
pub const SHADOWSOCKS_PROTOCOL: &str = "shadowsocks";

/// Listen address of every per-credential shadowsocks inbound.
pub const SHADOWSOCKS_LISTEN: &str = "0.0.0.0";
pub const SHADOWSOCKS_NETWORK: &str = "tcp,udp";
pub const SHADOWSOCKS_LEVEL: u32 = 1;

/// Entry of the shared vmess inbound's `settings.clients` list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VmessClient {
    pub id: String,
    #[serde(rename = "alterId", default)]
    pub alter_id: u32,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl VmessClient {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            alter_id: DEFAULT_ALTER_ID,
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShadowsocksSettings {
    pub method: String,
    pub password: String,
    #[serde(default)]
    pub network: String,
    #[serde(default)]
    pub level: u32,
    #[serde(default)]
    pub ota: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A dedicated inbound serving exactly one shadowsocks credential.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShadowsocksInbound {
    pub port: u16,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub listen: String,
    pub protocol: String,
    pub settings: ShadowsocksSettings,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ShadowsocksInbound {
    pub fn new(port: u16, password: impl Into<String>) -> Self {
        Self {
            port,
            listen: SHADOWSOCKS_LISTEN.to_string(),
            protocol: SHADOWSOCKS_PROTOCOL.to_string(),
            settings: ShadowsocksSettings {
                method: SHADOWSOCKS_METHOD.to_string(),
                password: password.into(),
                network: SHADOWSOCKS_NETWORK.to_string(),
                level: SHADOWSOCKS_LEVEL,
                ota: false,
                extra: Map::new(),
            },
            extra: Map::new(),
        }
    }
}

/// `protocol` field of a raw inbound entry.
pub fn inbound_protocol(entry: &Value) -> Option<&str> {
    entry.get("protocol").and_then(Value::as_str)
}

/// `port` field of a raw inbound entry, written as a number or a string.
pub fn inbound_port(entry: &Value) -> Option<u16> {
    match entry.get("port")? {
        Value::Number(n) => n.as_u64().and_then(|p| u16::try_from(p).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
