//! File-backed credential store.
//!
//! Every mutation holds the store's write lock across the whole
//! read-modify-write span, including the firewall call, so at most one
//! mutation per protocol is in flight. Reads share the lock.

use crate::v2ray::consistency::ConsistencyReport;
use crate::v2ray::document::DocumentPair;
use crate::v2ray::layout::{
    occupied_ports, InboundLayout, PerCredentialInbound, PortPolicy, SharedInbound,
};
use log::{error, info, warn};
use serde::Serialize;
use std::marker::PhantomData;
use tokio::sync::RwLock;
use vpanel_core::validation::validate_credential;
use vpanel_core::{
    next_free_port, Credential, DocumentLayout, DocumentPaths, ProvisionError, ProvisionResult,
    PORT_RANGE_BASE,
};
use vpanel_firewall::SharedFirewall;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub paths: DocumentPaths,
    /// Port of the shared vmess inbound, recorded on every vmess credential.
    pub shared_port: u16,
}

/// Result of an edit: the record before and after.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EditOutcome {
    pub previous: Credential,
    pub current: Credential,
}

pub type VmessStore = FileRecordStore<SharedInbound>;
pub type ShadowsocksStore = FileRecordStore<PerCredentialInbound>;

pub struct FileRecordStore<L> {
    config: StoreConfig,
    firewall: SharedFirewall,
    lock: RwLock<()>,
    _layout: PhantomData<fn() -> L>,
}

/// Where an identity was found in a loaded pair.
struct Located {
    roster_index: usize,
}

impl<L: InboundLayout> FileRecordStore<L> {
    pub fn new(config: StoreConfig, firewall: SharedFirewall) -> Self {
        Self {
            config,
            firewall,
            lock: RwLock::new(()),
            _layout: PhantomData,
        }
    }

    pub fn from_layout(
        layout: &DocumentLayout,
        shared_port: u16,
        firewall: SharedFirewall,
    ) -> Self {
        Self::new(
            StoreConfig {
                paths: L::PROTOCOL.documents(layout),
                shared_port,
            },
            firewall,
        )
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    // ─── Mutations ──────────────────────────────────────────────────────────

    /// Add a credential to both documents and return it as stored.
    pub async fn create(&self, mut credential: Credential) -> ProvisionResult<Credential> {
        L::prepare(&mut credential);
        validate_credential(L::PROTOCOL.protocol(), &credential)?;

        let _guard = self.lock.write().await;
        let mut pair = DocumentPair::load(&self.config.paths).await?;
        let mut inbounds = pair.config.inbounds()?;
        let mut clients = pair.roster.clients()?;

        let identity = credential.local_identity(L::PROTOCOL).to_string();
        let display = L::display_identity(&identity);
        if L::identities(&inbounds)?.contains(&identity)
            || clients.iter().any(|c| c.local_identity(L::PROTOCOL) == identity)
        {
            return Err(ProvisionError::DuplicateCredential(display));
        }

        credential.port = match L::PORT_POLICY {
            PortPolicy::Shared => self.config.shared_port,
            PortPolicy::Dedicated => {
                let taken = occupied_ports(&inbounds)
                    .into_iter()
                    .chain(std::iter::once(self.config.shared_port));
                next_free_port(taken).ok_or(ProvisionError::PortRangeExhausted(PORT_RANGE_BASE))?
            }
        };

        L::insert(&mut inbounds, &credential)?;
        clients.push(credential.clone());
        pair.config.set_inbounds(inbounds);
        pair.roster.set_clients(&clients)?;

        let dedicated = L::PORT_POLICY == PortPolicy::Dedicated;
        if dedicated {
            self.firewall.open_port(credential.port).await?;
        }

        if let Err(e) = pair.commit().await {
            error!(
                "writing new {} credential {} failed: {}",
                L::PROTOCOL,
                display,
                e
            );
            if dedicated {
                if let Err(close) = self.firewall.close_port(credential.port).await {
                    warn!("could not close port {} again: {}", credential.port, close);
                }
            }
            return Err(e);
        }

        info!(
            "created {} credential {} on port {}",
            L::PROTOCOL,
            display,
            credential.port
        );
        Ok(credential)
    }

    /// Replace the credential carrying `identity`, keeping its port.
    pub async fn edit(&self, identity: &str, updated: Credential) -> ProvisionResult<EditOutcome> {
        validate_credential(L::PROTOCOL.protocol(), &updated)?;

        let _guard = self.lock.write().await;
        let mut pair = DocumentPair::load(&self.config.paths).await?;
        let mut inbounds = pair.config.inbounds()?;
        let mut clients = pair.roster.clients()?;

        let Located { roster_index } = Self::locate(&inbounds, &clients, identity)?;
        let previous = clients[roster_index].clone();

        let new_identity = updated.local_identity(L::PROTOCOL).to_string();
        if new_identity != identity
            && (L::identities(&inbounds)?.contains(&new_identity)
                || clients.iter().any(|c| c.local_identity(L::PROTOCOL) == new_identity))
        {
            return Err(ProvisionError::DuplicateCredential(L::display_identity(
                &new_identity,
            )));
        }

        let mut current = updated;
        current.port = previous.port;
        current.alter_id = previous.alter_id;
        if !L::replace(&mut inbounds, identity, &current)? {
            return Err(Self::inconsistent(identity));
        }
        clients[roster_index] = current.clone();
        pair.config.set_inbounds(inbounds);
        pair.roster.set_clients(&clients)?;

        pair.commit().await.map_err(|e| {
            error!("writing edited {} credential failed: {}", L::PROTOCOL, e);
            e
        })?;

        info!(
            "edited {} credential {}",
            L::PROTOCOL,
            L::display_identity(&new_identity)
        );
        Ok(EditOutcome { previous, current })
    }

    /// Remove the credential carrying `identity`.
    ///
    /// The stored device binding must equal `device_id`; an unbound
    /// credential is removed only with an empty `device_id`.
    pub async fn delete(&self, identity: &str, device_id: &str) -> ProvisionResult<Credential> {
        let _guard = self.lock.write().await;
        let mut pair = DocumentPair::load(&self.config.paths).await?;
        let mut inbounds = pair.config.inbounds()?;
        let mut clients = pair.roster.clients()?;

        let display = L::display_identity(identity);
        let Located { roster_index } = Self::locate(&inbounds, &clients, identity)?;
        if !clients[roster_index].device_matches(device_id) {
            return Err(ProvisionError::Forbidden(format!(
                "device does not match the binding of {}",
                display
            )));
        }

        let released = L::remove(&mut inbounds, identity)?
            .ok_or_else(|| Self::inconsistent(identity))?;
        let removed = clients.remove(roster_index);
        pair.config.set_inbounds(inbounds);
        pair.roster.set_clients(&clients)?;

        pair.commit().await.map_err(|e| {
            error!(
                "writing after deleting {} credential {} failed: {}",
                L::PROTOCOL,
                display,
                e
            );
            e
        })?;

        if L::PORT_POLICY == PortPolicy::Dedicated {
            self.firewall.close_port(released).await.map_err(|e| {
                error!(
                    "{} credential {} deleted but port {} stays open: {}",
                    L::PROTOCOL,
                    display,
                    released,
                    e
                );
                e
            })?;
        }

        info!("deleted {} credential {}", L::PROTOCOL, display);
        Ok(removed)
    }

    // ─── Reads ──────────────────────────────────────────────────────────────

    /// Every credential in the roster.
    pub async fn list(&self) -> ProvisionResult<Vec<Credential>> {
        let _guard = self.lock.read().await;
        let pair = DocumentPair::load(&self.config.paths).await?;
        let clients = pair.roster.clients()?;
        let config = L::identities(&pair.config.inbounds()?)?;
        if config.len() != clients.len() {
            warn!(
                "{} documents disagree: {} inbound entries, {} roster entries",
                L::PROTOCOL,
                config.len(),
                clients.len()
            );
        }
        Ok(clients)
    }

    pub async fn get(&self, identity: &str) -> ProvisionResult<Credential> {
        self.list()
            .await?
            .into_iter()
            .find(|c| c.local_identity(L::PROTOCOL) == identity)
            .ok_or_else(|| ProvisionError::NotFound(L::display_identity(identity)))
    }

    /// Compare both documents without repairing anything.
    pub async fn check_consistency(&self) -> ProvisionResult<ConsistencyReport> {
        let _guard = self.lock.read().await;
        let pair = DocumentPair::load(&self.config.paths).await?;
        let config = L::identities(&pair.config.inbounds()?)?;
        let roster: Vec<String> = pair
            .roster
            .clients()?
            .iter()
            .map(|c| c.local_identity(L::PROTOCOL).to_string())
            .collect();
        Ok(ConsistencyReport::compare(
            L::PROTOCOL,
            &config,
            &roster,
            L::display_identity,
        ))
    }

    // ─── Helpers ────────────────────────────────────────────────────────────

    fn locate(
        inbounds: &[serde_json::Value],
        clients: &[Credential],
        identity: &str,
    ) -> ProvisionResult<Located> {
        let in_config = L::identities(inbounds)?.iter().any(|id| id == identity);
        let roster_index = clients
            .iter()
            .position(|c| c.local_identity(L::PROTOCOL) == identity);
        match (in_config, roster_index) {
            (true, Some(roster_index)) => Ok(Located { roster_index }),
            (false, None) => Err(ProvisionError::NotFound(L::display_identity(identity))),
            _ => Err(Self::inconsistent(identity)),
        }
    }

    fn inconsistent(identity: &str) -> ProvisionError {
        ProvisionError::Persistence(format!(
            "inconsistent {} documents: {} is present in only one of them",
            L::PROTOCOL,
            L::display_identity(identity)
        ))
    }
}
