//! In-memory firewall that records every call.

use super::{check_port, Firewall};
use async_trait::async_trait;
use std::sync::Mutex;
use vpanel_core::{ProvisionError, ProvisionResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FirewallEvent {
    Opened(u16),
    Closed(u16),
}

#[derive(Debug, Default)]
pub struct RecordingFirewall {
    events: Mutex<Vec<FirewallEvent>>,
    fail_all: bool,
}

impl RecordingFirewall {
    pub fn new() -> Self {
        Self::default()
    }

    /// A firewall whose every call fails after being recorded.
    pub fn failing() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            fail_all: true,
        }
    }

    pub fn events(&self) -> Vec<FirewallEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    fn record(&self, event: FirewallEvent) -> ProvisionResult<()> {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
        if self.fail_all {
            return Err(ProvisionError::Firewall(format!("injected failure on {:?}", event)));
        }
        Ok(())
    }
}

#[async_trait]
impl Firewall for RecordingFirewall {
    async fn open_port(&self, port: u16) -> ProvisionResult<()> {
        check_port(port)?;
        self.record(FirewallEvent::Opened(port))
    }

    async fn close_port(&self, port: u16) -> ProvisionResult<()> {
        check_port(port)?;
        self.record(FirewallEvent::Closed(port))
    }
}
