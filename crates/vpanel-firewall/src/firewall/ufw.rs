//! `ufw` backend.

use super::{check_port, Firewall, Transport};
use async_trait::async_trait;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use vpanel_core::{ProvisionError, ProvisionResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UfwConfig {
    /// Program to run, `ufw` from `PATH` by default.
    pub binary: String,
    /// Prefix every invocation with `sudo`.
    pub use_sudo: bool,
}

impl Default for UfwConfig {
    fn default() -> Self {
        Self {
            binary: "ufw".to_string(),
            use_sudo: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleAction {
    Allow,
    Delete,
}

#[derive(Debug, Clone, Default)]
pub struct UfwFirewall {
    config: UfwConfig,
}

impl UfwFirewall {
    pub fn new(config: UfwConfig) -> Self {
        Self { config }
    }

    /// Program and arguments for one rule change.
    pub fn rule_command(
        &self,
        action: RuleAction,
        port: u16,
        transport: Transport,
    ) -> (String, Vec<String>) {
        let rule = format!("{}/{}", port, transport.as_str());
        let mut args = Vec::new();
        let program = if self.config.use_sudo {
            args.push(self.config.binary.clone());
            "sudo".to_string()
        } else {
            self.config.binary.clone()
        };
        if action == RuleAction::Delete {
            args.push("delete".to_string());
        }
        args.push("allow".to_string());
        args.push(rule);
        (program, args)
    }

    async fn apply(
        &self,
        action: RuleAction,
        port: u16,
        transport: Transport,
    ) -> ProvisionResult<()> {
        let (program, args) = self.rule_command(action, port, transport);
        let verb = match action {
            RuleAction::Allow => "allow",
            RuleAction::Delete => "delete",
        };

        let output = Command::new(&program)
            .args(&args)
            .output()
            .await
            .map_err(|e| {
                ProvisionError::Firewall(format!(
                    "failed to run {} for {} {}/{}: {}",
                    program, verb, port, transport.as_str(), e
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ProvisionError::Firewall(format!(
                "failed to {} {}/{}: {} ({})",
                verb,
                port,
                transport.as_str(),
                stderr.trim(),
                output.status
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Firewall for UfwFirewall {
    async fn open_port(&self, port: u16) -> ProvisionResult<()> {
        check_port(port)?;
        self.apply(RuleAction::Allow, port, Transport::Tcp).await?;
        if let Err(e) = self.apply(RuleAction::Allow, port, Transport::Udp).await {
            // Leave no half-open port behind.
            if let Err(rollback) = self.apply(RuleAction::Delete, port, Transport::Tcp).await {
                warn!("could not roll back tcp rule for port {}: {}", port, rollback);
            }
            return Err(e);
        }
        info!("allowed port {} for TCP and UDP", port);
        Ok(())
    }

    async fn close_port(&self, port: u16) -> ProvisionResult<()> {
        check_port(port)?;
        for transport in Transport::BOTH {
            self.apply(RuleAction::Delete, port, transport).await?;
        }
        info!("deleted port {} rules for TCP and UDP", port);
        Ok(())
    }
}
