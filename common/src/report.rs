//! # Report Payload
//!
//! The flat, order-stable view of an inventory handed to a [`ReportSink`].

use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

use crate::error::PersistenceError;
use crate::network::host::HostRecord;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportEntry {
    pub address: Ipv4Addr,
    pub link_address: String,
    pub open_ports: Vec<u16>,
}

impl From<&HostRecord> for ReportEntry {
    fn from(host: &HostRecord) -> Self {
        Self {
            address: host.address,
            link_address: host.link_address.to_string(),
            // BTreeSet iteration keeps ports ascending
            open_ports: host.open_ports.iter().copied().collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReportPayload {
    pub entries: Vec<ReportEntry>,
}

impl ReportPayload {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> FromIterator<&'a HostRecord> for ReportPayload {
    fn from_iter<I: IntoIterator<Item = &'a HostRecord>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(ReportEntry::from).collect(),
        }
    }
}

/// Durable destination for a report.
pub trait ReportSink: Send + Sync {
    fn persist(&self, payload: &ReportPayload) -> Result<(), PersistenceError>;
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
