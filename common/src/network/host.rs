//! # Host Model
//!
//! Identity and value types for a host discovered during a session.

use std::collections::BTreeSet;
use std::fmt;
use std::net::Ipv4Addr;

use pnet::util::MacAddr;

use crate::error::CollaboratorError;

/// The unique key of a host inside one session.
pub type HostKey = Ipv4Addr;

/// Lifecycle of the port probe for a single host.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProbeState {
    #[default]
    NotProbed,
    ProbeInFlight,
    ProbeComplete,
    ProbeFailed,
}

impl ProbeState {
    pub fn is_settled(&self) -> bool {
        matches!(self, ProbeState::ProbeComplete | ProbeState::ProbeFailed)
    }
}

impl fmt::Display for ProbeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ProbeState::NotProbed => "not probed",
            ProbeState::ProbeInFlight => "probing",
            ProbeState::ProbeComplete => "complete",
            ProbeState::ProbeFailed => "failed",
        };
        f.write_str(label)
    }
}

/// A discovery reply: one address answering for one link address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostFound {
    pub address: HostKey,
    pub link_address: MacAddr,
}

impl HostFound {
    pub fn new(address: HostKey, link_address: MacAddr) -> Self {
        Self {
            address,
            link_address,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostRecord {
    pub address: HostKey,
    pub link_address: MacAddr,
    pub open_ports: BTreeSet<u16>,
    pub probe_state: ProbeState,
    /// Most recent probe failure, cleared by the next successful probe.
    pub last_error: Option<CollaboratorError>,
    /// Number of probes that have settled for this host.
    pub probe_count: u32,
}

impl From<HostFound> for HostRecord {
    fn from(found: HostFound) -> Self {
        Self {
            address: found.address,
            link_address: found.link_address,
            open_ports: BTreeSet::new(),
            probe_state: ProbeState::NotProbed,
            last_error: None,
            probe_count: 0,
        }
    }
}

impl HostRecord {
    /// Unions `ports` into the open set. Returns how many were new.
    pub fn merge_ports(&mut self, ports: impl IntoIterator<Item = u16>) -> usize {
        let before = self.open_ports.len();
        self.open_ports.extend(ports);
        self.open_ports.len() - before
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
