//! Panel configuration.
//!
//! Loaded from a TOML file, then overridden by environment variables for
//! secrets, then validated. Every field has a default, so an empty file is
//! a valid (if not very useful) configuration.
//!
//! Environment overrides:
//! - `VPANEL_SOFTETHER_PASSWORD`: SoftEther administrator password
//! - `VPANEL_GOTIFY_KEYS`: comma-separated Gotify application keys

use log::debug;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use vpanel_core::DocumentLayout;
use vpanel_firewall::UfwConfig;
use vpanel_notifications::GotifyConfig;
use vpanel_softether::SoftEtherConfig;

pub const ENV_SOFTETHER_PASSWORD: &str = "VPANEL_SOFTETHER_PASSWORD";
pub const ENV_GOTIFY_KEYS: &str = "VPANEL_GOTIFY_KEYS";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

impl From<ConfigError> for String {
    fn from(e: ConfigError) -> Self {
        e.to_string()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelConfig {
    pub server: ServerConfig,
    pub v2ray: V2rayConfig,
    pub softether: SoftEtherConfig,
    pub firewall: FirewallConfig,
    pub notifications: GotifyConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Public hostname written into descriptors.
    pub hostname: String,
    /// Region label shown in descriptor names.
    pub region: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            hostname: "127.0.0.1".to_string(),
            region: "127.0.0.1".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct V2rayConfig {
    /// Port of the shared vmess inbound.
    pub port: u16,
    pub config_dir: PathBuf,
    pub roster_dir: PathBuf,
}

impl Default for V2rayConfig {
    fn default() -> Self {
        Self {
            port: 443,
            config_dir: PathBuf::from("test/"),
            roster_dir: PathBuf::from("test/"),
        }
    }
}

impl V2rayConfig {
    pub fn layout(&self) -> DocumentLayout {
        DocumentLayout::new(&self.config_dir, &self.roster_dir)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FirewallConfig {
    /// When false, ports are never touched.
    pub enabled: bool,
    pub binary: String,
    pub use_sudo: bool,
}

impl Default for FirewallConfig {
    fn default() -> Self {
        let ufw = UfwConfig::default();
        Self {
            enabled: true,
            binary: ufw.binary,
            use_sudo: ufw.use_sudo,
        }
    }
}

impl FirewallConfig {
    pub fn ufw(&self) -> UfwConfig {
        UfwConfig {
            binary: self.binary.clone(),
            use_sudo: self.use_sudo,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is unset.
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Load, override from the process environment, and validate.
pub fn load_config(path: &Path) -> Result<PanelConfig, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config = load_config_from_str(&contents)?;
    debug!("loaded configuration from {}", path.display());
    Ok(config)
}

pub fn load_config_from_str(contents: &str) -> Result<PanelConfig, ConfigError> {
    let mut config: PanelConfig = toml::from_str(contents)?;
    apply_env_overrides(&mut config);
    config.validate()?;
    Ok(config)
}

/// Defaults plus environment overrides, for running without a file.
pub fn default_config() -> Result<PanelConfig, ConfigError> {
    let mut config = PanelConfig::default();
    apply_env_overrides(&mut config);
    config.validate()?;
    Ok(config)
}

pub fn apply_env_overrides(config: &mut PanelConfig) {
    apply_overrides_from(config, |key| std::env::var(key).ok());
}

/// Apply overrides read through `lookup`.
pub fn apply_overrides_from(config: &mut PanelConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(password) = lookup(ENV_SOFTETHER_PASSWORD) {
        debug!("overriding softether.admin_password from {}", ENV_SOFTETHER_PASSWORD);
        config.softether.admin_password = password;
    }
    if let Some(keys) = lookup(ENV_GOTIFY_KEYS) {
        debug!("overriding notifications.api_keys from {}", ENV_GOTIFY_KEYS);
        config.notifications.api_keys = keys
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .collect();
    }
}

impl PanelConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.hostname.trim().is_empty() {
            return Err(ConfigError::Invalid("server.hostname must not be empty".into()));
        }
        if self.v2ray.port == 0 {
            return Err(ConfigError::Invalid("v2ray.port must be between 1 and 65535".into()));
        }
        if self.softether.hub.trim().is_empty() {
            return Err(ConfigError::Invalid("softether.hub must not be empty".into()));
        }
        if self.softether.timeout_secs == 0 {
            return Err(ConfigError::Invalid("softether.timeout_secs must be positive".into()));
        }
        if self.notifications.enabled {
            if self.notifications.server.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "notifications.server is required when notifications are enabled".into(),
                ));
            }
            if self.notifications.api_keys.is_empty() {
                return Err(ConfigError::Invalid(
                    "notifications need at least one api key when enabled".into(),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn parse(raw: &str) -> PanelConfig {
        toml::from_str(raw).unwrap()
    }

    #[test]
    fn empty_file_gives_defaults() {
        let cfg = load_config_from_str("").unwrap();
        assert_eq!(cfg.server.hostname, "127.0.0.1");
        assert_eq!(cfg.v2ray.port, 443);
        assert_eq!(cfg.v2ray.config_dir, PathBuf::from("test/"));
        assert_eq!(cfg.softether.server_url, "https://localhost:5555/api");
        assert_eq!(cfg.softether.hub, "default");
        assert_eq!(cfg.softether.timeout_secs, 10);
        assert!(!cfg.softether.verify_tls);
        assert!(cfg.firewall.enabled);
        assert_eq!(cfg.firewall.binary, "ufw");
        assert!(!cfg.notifications.enabled);
        assert_eq!(cfg.notifications.priority, 5);
        assert_eq!(cfg.logging.level, "info");
    }

    #[test]
    fn sections_override_defaults() {
        let cfg = parse(
            r#"
            [server]
            hostname = "vpn.example.com"
            region = "de"

            [v2ray]
            port = 8443
            config_dir = "/etc/v2ray"
            roster_dir = "/var/lib/vpanel"

            [softether]
            server_url = "https://10.0.0.2:5555/api"
            hub = "VPN"
            verify_tls = true

            [firewall]
            enabled = false
            use_sudo = true

            [notifications]
            enabled = true
            server = "push.example.com"
            api_keys = ["k1"]
            priority = 8

            [logging]
            level = "debug"
            json = true
            "#,
        );
        cfg.validate().unwrap();
        assert_eq!(cfg.server.region, "de");
        assert_eq!(cfg.v2ray.layout().roster_dir, PathBuf::from("/var/lib/vpanel"));
        assert_eq!(cfg.softether.hub, "VPN");
        assert_eq!(cfg.softether.timeout_secs, 10);
        assert!(!cfg.firewall.enabled);
        assert_eq!(cfg.firewall.ufw().binary, "ufw");
        assert!(cfg.firewall.ufw().use_sudo);
        assert_eq!(cfg.notifications.api_keys, vec!["k1"]);
        assert!(cfg.logging.json);
    }

    #[test]
    fn secrets_come_from_environment() {
        let env: HashMap<&str, &str> = [
            (ENV_SOFTETHER_PASSWORD, "from-env"),
            (ENV_GOTIFY_KEYS, "a, b,,c "),
        ]
        .into_iter()
        .collect();
        let mut cfg = PanelConfig::default();
        apply_overrides_from(&mut cfg, |k| env.get(k).map(|v| v.to_string()));
        assert_eq!(cfg.softether.admin_password, "from-env");
        assert_eq!(cfg.notifications.api_keys, vec!["a", "b", "c"]);
    }

    #[test]
    fn validation_rejects_bad_values() {
        let cases = [
            "[server]\nhostname = \"\"",
            "[v2ray]\nport = 0",
            "[softether]\nhub = \" \"",
            "[softether]\ntimeout_secs = 0",
            "[notifications]\nenabled = true\napi_keys = [\"k\"]",
            "[notifications]\nenabled = true\nserver = \"push.example.com\"",
        ];
        for raw in cases {
            let err = parse(raw).validate().unwrap_err();
            assert!(matches!(err, ConfigError::Invalid(_)), "{raw}");
        }
    }

    #[test]
    fn malformed_toml_is_parse_error() {
        assert!(matches!(load_config_from_str("[server"), Err(ConfigError::Parse(_))));
        assert!(matches!(
            load_config_from_str("[v2ray]\nport = 70000"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn missing_file_is_read_error() {
        let err = load_config(Path::new("/nonexistent/vpanel.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
