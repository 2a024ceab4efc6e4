//! # VPanel
//!
//! Credential provisioning for a VPN server that serves vmess and
//! shadowsocks through a local v2ray daemon and SSTP through a SoftEther hub.
//!
//! - `config`: [`PanelConfig`] loaded from TOML with environment overrides
//! - `logging`: subscriber setup for the binary
//! - `service`: [`ProvisioningService`], one entry point for every protocol

pub mod config;
pub mod logging;
pub mod service;

pub use config::{load_config, load_config_from_str, ConfigError, PanelConfig};
pub use logging::init_logging;
pub use service::ProvisioningService;

pub use vpanel_core::{Credential, ErrorKind, Protocol, ProvisionError, ProvisionResult};
pub use vpanel_uri::{DescriptorForm, RenderContext};
pub use vpanel_v2ray::{ConsistencyReport, EditOutcome};
