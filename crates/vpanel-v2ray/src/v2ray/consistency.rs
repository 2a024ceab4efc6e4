//! Cross-document consistency report.

use serde::Serialize;
use std::collections::BTreeSet;
use vpanel_core::LocalProtocol;

/// Differences between the identities of a configuration and its roster.
///
/// Identities are already in their display form, so a report is safe to log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsistencyReport {
    pub protocol: LocalProtocol,
    pub inbound_entries: usize,
    pub roster_entries: usize,
    /// Present in the configuration only.
    pub missing_from_roster: Vec<String>,
    /// Present in the roster only.
    pub missing_from_config: Vec<String>,
}

impl ConsistencyReport {
    pub fn compare(
        protocol: LocalProtocol,
        config: &[String],
        roster: &[String],
        display: fn(&str) -> String,
    ) -> Self {
        let in_config: BTreeSet<&str> = config.iter().map(String::as_str).collect();
        let in_roster: BTreeSet<&str> = roster.iter().map(String::as_str).collect();
        Self {
            protocol,
            inbound_entries: config.len(),
            roster_entries: roster.len(),
            missing_from_roster: in_config.difference(&in_roster).map(|id| display(id)).collect(),
            missing_from_config: in_roster.difference(&in_config).map(|id| display(id)).collect(),
        }
    }

    pub fn is_consistent(&self) -> bool {
        self.inbound_entries == self.roster_entries
            && self.missing_from_roster.is_empty()
            && self.missing_from_config.is_empty()
    }
}
