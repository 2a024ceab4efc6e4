//! Firewall reconciler.
//!
//! Every call covers both transports (TCP and UDP) of one port. Failures are
//! always surfaced as [`ProvisionError::Firewall`]; nothing is swallowed.
//!
//! - `ufw`: the `ufw` command-line backend
//! - `NoopFirewall`: for hosts whose firewall is managed elsewhere
//! - `testing`: in-memory recorder (feature `test-util`)

pub mod ufw;
#[cfg(any(test, feature = "test-util"))]
pub mod testing;

use async_trait::async_trait;
use log::debug;
use std::sync::Arc;
use vpanel_core::{ProvisionError, ProvisionResult};

pub use ufw::{UfwConfig, UfwFirewall};
#[cfg(any(test, feature = "test-util"))]
pub use testing::{FirewallEvent, RecordingFirewall};

/// Transport a firewall rule applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Tcp,
    Udp,
}

impl Transport {
    pub const BOTH: [Transport; 2] = [Transport::Tcp, Transport::Udp];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tcp => "tcp",
            Self::Udp => "udp",
        }
    }
}

#[async_trait]
pub trait Firewall: Send + Sync {
    /// Allow inbound TCP and UDP traffic on `port`.
    async fn open_port(&self, port: u16) -> ProvisionResult<()>;

    /// Remove the TCP and UDP allow rules for `port`.
    async fn close_port(&self, port: u16) -> ProvisionResult<()>;
}

pub type SharedFirewall = Arc<dyn Firewall>;

/// Reject ports a rule can never be written for.
pub fn check_port(port: u16) -> ProvisionResult<()> {
    if port == 0 {
        return Err(ProvisionError::Firewall(
            "port number must be between 1 and 65535".into(),
        ));
    }
    Ok(())
}

/// Accepts every call; used when the host firewall is out of our hands.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopFirewall;

#[async_trait]
impl Firewall for NoopFirewall {
    async fn open_port(&self, port: u16) -> ProvisionResult<()> {
        check_port(port)?;
        debug!("firewall disabled, not opening port {}", port);
        Ok(())
    }

    async fn close_port(&self, port: u16) -> ProvisionResult<()> {
        check_port(port)?;
        debug!("firewall disabled, not closing port {}", port);
        Ok(())
    }
}
