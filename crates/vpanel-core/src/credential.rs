//! The roster record ("client") kept for every provisioned account.

use crate::protocol::{LocalProtocol, Protocol};
use serde::{Deserialize, Serialize};
use std::fmt;

/// `alterId` written for every vmess client.
pub const DEFAULT_ALTER_ID: u32 = 1;

/// Cipher of every shadowsocks inbound and descriptor.
pub const SHADOWSOCKS_METHOD: &str = "aes-128-gcm";

/// One provisioned account as stored in a roster document.
///
/// Field names follow the roster JSON format; roster documents are written
/// with their keys sorted. Missing fields deserialize to their empty value;
/// an empty `device_id` means the credential is not bound to a device.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Credential {
    pub id: String,
    pub alter_id: u32,
    pub username: String,
    pub device_id: String,
    pub start_date: String,
    pub expire_date: String,
    /// Shadowsocks and SSTP secret.
    pub password: String,
    pub port: u16,
}

impl Credential {
    /// Value of the field that identifies this credential for `protocol`.
    pub fn identity(&self, protocol: Protocol) -> &str {
        match protocol {
            Protocol::Vmess => &self.id,
            Protocol::Shadowsocks => &self.password,
            Protocol::Sstp => &self.username,
        }
    }

    pub fn local_identity(&self, protocol: LocalProtocol) -> &str {
        self.identity(protocol.protocol())
    }

    pub fn has_device_binding(&self) -> bool {
        !self.device_id.trim().is_empty()
    }

    /// Exact comparison against a caller-supplied device id.
    pub fn device_matches(&self, device_id: &str) -> bool {
        self.device_id.trim() == device_id.trim()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("id", &self.id)
            .field("alter_id", &self.alter_id)
            .field("username", &self.username)
            .field("device_id", &self.device_id)
            .field("start_date", &self.start_date)
            .field("expire_date", &self.expire_date)
            .field("password", &if self.password.is_empty() { "" } else { "<redacted>" })
            .field("port", &self.port)
            .finish()
    }
}
