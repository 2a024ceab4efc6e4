//! Provisioning facade.
//!
//! Resolves the backend for a [`Protocol`], runs the operation, and sends a
//! notification after every successful mutation. Notifications never affect
//! the result of the call.

use crate::config::{ConfigError, PanelConfig};
use log::{info, warn};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use vpanel_core::{Credential, Protocol, ProvisionError, ProvisionResult};
use vpanel_firewall::{NoopFirewall, SharedFirewall, UfwFirewall};
use vpanel_notifications::{dispatch, notifier_from_config, SharedNotifier};
use vpanel_softether::SstpStore;
use vpanel_uri::{render, DescriptorForm, RenderContext};
use vpanel_v2ray::layout::mask_secret;
use vpanel_v2ray::{ConsistencyReport, EditOutcome, ShadowsocksStore, VmessStore};

pub struct ProvisioningService {
    vmess: VmessStore,
    shadowsocks: ShadowsocksStore,
    sstp: SstpStore,
    render: RenderContext,
    notifier: SharedNotifier,
    pending: Mutex<Vec<JoinHandle<()>>>,
}

impl ProvisioningService {
    pub fn new(
        vmess: VmessStore,
        shadowsocks: ShadowsocksStore,
        sstp: SstpStore,
        render: RenderContext,
        notifier: SharedNotifier,
    ) -> Self {
        Self {
            vmess,
            shadowsocks,
            sstp,
            render,
            notifier,
            pending: Mutex::new(Vec::new()),
        }
    }

    pub fn from_config(config: &PanelConfig) -> Result<Self, ConfigError> {
        let firewall: SharedFirewall = if config.firewall.enabled {
            Arc::new(UfwFirewall::new(config.firewall.ufw()))
        } else {
            Arc::new(NoopFirewall)
        };
        let layout = config.v2ray.layout();
        let sstp = SstpStore::from_config(&config.softether)
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        let notifier = notifier_from_config(&config.notifications)
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        Ok(Self::new(
            VmessStore::from_layout(&layout, config.v2ray.port, firewall.clone()),
            ShadowsocksStore::from_layout(&layout, config.v2ray.port, firewall),
            sstp,
            RenderContext::new(
                &config.server.hostname,
                &config.server.region,
                config.v2ray.port,
            ),
            notifier,
        ))
    }

    // ─── Mutations ──────────────────────────────────────────────────────────

    pub async fn create(
        &self,
        protocol: Protocol,
        credential: Credential,
    ) -> ProvisionResult<Credential> {
        let stored = match protocol {
            Protocol::Vmess => self.vmess.create(credential).await?,
            Protocol::Shadowsocks => self.shadowsocks.create(credential).await?,
            Protocol::Sstp => self.sstp.create(credential).await?,
        };
        self.announce(protocol, "created", &stored);
        Ok(stored)
    }

    pub async fn edit(
        &self,
        protocol: Protocol,
        identity: &str,
        updated: Credential,
    ) -> ProvisionResult<EditOutcome> {
        let outcome = match protocol {
            Protocol::Vmess => self.vmess.edit(identity, updated).await?,
            Protocol::Shadowsocks => self.shadowsocks.edit(identity, updated).await?,
            Protocol::Sstp => {
                let current = self.sstp.edit(identity, updated).await?;
                EditOutcome {
                    previous: current.clone(),
                    current,
                }
            }
        };
        self.announce(protocol, "edited", &outcome.current);
        Ok(outcome)
    }

    pub async fn delete(
        &self,
        protocol: Protocol,
        identity: &str,
        device_id: &str,
    ) -> ProvisionResult<Credential> {
        let removed = match protocol {
            Protocol::Vmess => self.vmess.delete(identity, device_id).await?,
            Protocol::Shadowsocks => self.shadowsocks.delete(identity, device_id).await?,
            Protocol::Sstp => self.sstp.delete(identity, device_id).await?,
        };
        self.announce(protocol, "deleted", &removed);
        Ok(removed)
    }

    // ─── Reads ──────────────────────────────────────────────────────────────

    pub async fn list(&self, protocol: Protocol) -> ProvisionResult<Vec<Credential>> {
        match protocol {
            Protocol::Vmess => self.vmess.list().await,
            Protocol::Shadowsocks => self.shadowsocks.list().await,
            Protocol::Sstp => self.sstp.list().await,
        }
    }

    pub async fn get(&self, protocol: Protocol, identity: &str) -> ProvisionResult<Credential> {
        match protocol {
            Protocol::Vmess => self.vmess.get(identity).await,
            Protocol::Shadowsocks => self.shadowsocks.get(identity).await,
            Protocol::Sstp => self.sstp.get(identity).await,
        }
    }

    /// Descriptor of a stored credential.
    pub async fn descriptor(
        &self,
        protocol: Protocol,
        identity: &str,
        form: DescriptorForm,
    ) -> ProvisionResult<String> {
        if protocol.descriptor_scheme().is_none() {
            return Err(ProvisionError::Unsupported(format!(
                "{} accounts have no connection descriptor",
                protocol
            )));
        }
        let credential = self.get(protocol, identity).await?;
        render(&self.render, protocol, &credential, form)
    }

    pub async fn check_consistency(&self) -> ProvisionResult<Vec<ConsistencyReport>> {
        Ok(vec![
            self.vmess.check_consistency().await?,
            self.shadowsocks.check_consistency().await?,
        ])
    }

    /// Log every document pair that is out of step. Nothing is repaired.
    pub async fn startup_check(&self) -> ProvisionResult<Vec<ConsistencyReport>> {
        let reports = self.check_consistency().await?;
        for report in &reports {
            if report.is_consistent() {
                info!(
                    "{} documents consistent ({} entries)",
                    report.protocol, report.roster_entries
                );
            } else {
                warn!(
                    "{} documents inconsistent: {} inbound entries, {} roster entries",
                    report.protocol, report.inbound_entries, report.roster_entries
                );
                warn!(
                    "{} missing from roster {:?}, missing from config {:?}",
                    report.protocol, report.missing_from_roster, report.missing_from_config
                );
            }
        }
        Ok(reports)
    }

    fn announce(&self, protocol: Protocol, action: &str, credential: &Credential) {
        let title = format!("{} credential {}", protocol, action);
        let message = describe(protocol, credential);
        let handle = dispatch(self.notifier.clone(), title, message);
        if let Ok(mut pending) = self.pending.lock() {
            pending.retain(|h| !h.is_finished());
            pending.push(handle);
        }
    }

    /// Wait for every notification sent so far.
    pub async fn flush_notifications(&self) {
        let handles = match self.pending.lock() {
            Ok(mut pending) => std::mem::take(&mut *pending),
            Err(_) => return,
        };
        for handle in handles {
            if let Err(e) = handle.await {
                warn!("notification task failed: {}", e);
            }
        }
    }
}

/// Secret-free summary of a credential.
pub fn describe(protocol: Protocol, credential: &Credential) -> String {
    let identity = match protocol {
        Protocol::Vmess => credential.id.clone(),
        Protocol::Shadowsocks => mask_secret(&credential.password),
        Protocol::Sstp => credential.username.clone(),
    };
    let mut parts = vec![identity];
    if !credential.username.is_empty() && protocol != Protocol::Sstp {
        parts.push(format!("user {}", credential.username));
    }
    if !credential.expire_date.is_empty() {
        parts.push(format!("expires {}", credential.expire_date));
    }
    if credential.port != 0 {
        parts.push(format!("port {}", credential.port));
    }
    parts.join(", ")
}
