//! Protocol selector.
//!
//! Every request names one of three fixed protocols. Two are served from a
//! pair of local v2ray documents, the third from a remote SoftEther hub.

use crate::error::{ProvisionError, ProvisionResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// The provisioned tunnel protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// One shared inbound owning a growing list of client ids.
    Vmess,
    /// One inbound per credential, each on its own allocated port.
    Shadowsocks,
    /// Users live in a remote SoftEther hub.
    Sstp,
}

/// Where a protocol's records are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    LocalFiles,
    Remote,
}

/// The protocols backed by a local document pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocalProtocol {
    Vmess,
    Shadowsocks,
}

impl Protocol {
    pub const ALL: [Protocol; 3] = [Protocol::Vmess, Protocol::Shadowsocks, Protocol::Sstp];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vmess => "vmess",
            Self::Shadowsocks => "shadowsocks",
            Self::Sstp => "sstp",
        }
    }

    /// Numeric tag used by existing panel forms.
    pub fn tag(&self) -> u8 {
        match self {
            Self::Vmess => 1,
            Self::Shadowsocks => 2,
            Self::Sstp => 3,
        }
    }

    pub fn backend(&self) -> BackendKind {
        match self {
            Self::Vmess | Self::Shadowsocks => BackendKind::LocalFiles,
            Self::Sstp => BackendKind::Remote,
        }
    }

    pub fn local(&self) -> Option<LocalProtocol> {
        match self {
            Self::Vmess => Some(LocalProtocol::Vmess),
            Self::Shadowsocks => Some(LocalProtocol::Shadowsocks),
            Self::Sstp => None,
        }
    }

    /// Name of the field that uniquely identifies a credential.
    pub fn identity_field(&self) -> &'static str {
        match self {
            Self::Vmess => "id",
            Self::Shadowsocks => "password",
            Self::Sstp => "name",
        }
    }

    /// Scheme prefix of the plain descriptor.
    pub fn descriptor_scheme(&self) -> Option<&'static str> {
        match self {
            Self::Vmess => Some("vmess://"),
            Self::Shadowsocks => Some("ss://"),
            Self::Sstp => None,
        }
    }

    pub fn documents(&self, layout: &DocumentLayout) -> Option<DocumentPaths> {
        self.local().map(|local| local.documents(layout))
    }
}

impl LocalProtocol {
    pub fn protocol(&self) -> Protocol {
        match self {
            Self::Vmess => Protocol::Vmess,
            Self::Shadowsocks => Protocol::Shadowsocks,
        }
    }

    /// `(configuration, roster)` file names.
    pub fn file_names(&self) -> (&'static str, &'static str) {
        match self {
            Self::Vmess => ("vmess.json", "vmess_users.json"),
            Self::Shadowsocks => ("shadowsocks.json", "shadowsocks_users.json"),
        }
    }

    pub fn documents(&self, layout: &DocumentLayout) -> DocumentPaths {
        let (config, roster) = self.file_names();
        DocumentPaths {
            config: layout.config_dir.join(config),
            roster: layout.roster_dir.join(roster),
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for LocalProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.protocol().fmt(f)
    }
}

impl FromStr for Protocol {
    type Err = ProvisionError;

    fn from_str(s: &str) -> ProvisionResult<Self> {
        let tag = s.trim().to_ascii_lowercase();
        match tag.as_str() {
            "1" | "vmess" => Ok(Self::Vmess),
            "2" | "shadowsocks" => Ok(Self::Shadowsocks),
            "3" | "sstp" => Ok(Self::Sstp),
            _ => Err(ProvisionError::InvalidProtocol(s.to_string())),
        }
    }
}

/// Directories holding the proxy configuration and roster documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentLayout {
    pub config_dir: PathBuf,
    pub roster_dir: PathBuf,
}

impl DocumentLayout {
    pub fn new(config_dir: impl AsRef<Path>, roster_dir: impl AsRef<Path>) -> Self {
        Self {
            config_dir: config_dir.as_ref().to_path_buf(),
            roster_dir: roster_dir.as_ref().to_path_buf(),
        }
    }
}

/// The document pair of one local protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentPaths {
    pub config: PathBuf,
    pub roster: PathBuf,
}
