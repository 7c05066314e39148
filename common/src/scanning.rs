//! # Collaborator Contracts
//!
//! The coordinator never talks to sockets directly. It drives these traits,
//! and `netsweep-core` ships the concrete implementations (ARP sweep, TCP
//! connect probe, `pnet` interface listing). Tests substitute fakes.

use std::collections::BTreeSet;
use std::net::Ipv4Addr;

use async_trait::async_trait;
use pnet::ipnetwork::Ipv4Network;
use tokio::sync::mpsc::UnboundedSender;

use crate::error::{CollaboratorError, ConfigurationError};
use crate::network::host::HostFound;
use crate::network::ports::PortSet;
use crate::network::range;

/// Parameters of one discovery sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryRequest {
    pub interface: String,
    pub source: Ipv4Addr,
    pub subnet: Ipv4Network,
}

impl DiscoveryRequest {
    /// Parses raw user input. Nothing is checked against the system here.
    pub fn parse(interface: &str, source: &str, subnet: &str) -> Result<Self, ConfigurationError> {
        let interface = interface.trim();
        if interface.is_empty() {
            return Err(ConfigurationError::InvalidInterface(interface.to_string()));
        }
        Ok(Self {
            interface: interface.to_string(),
            source: range::parse_address(source)?,
            subnet: range::parse_subnet(subnet)?,
        })
    }
}

/// Sweeps a subnet and reports every host that answers.
#[async_trait]
pub trait HostDiscovery: Send + Sync {
    /// Pushes each reply into `found` and returns once the sweep is over.
    ///
    /// Implementations should stop early when `found` is closed.
    async fn discover(
        &self,
        request: &DiscoveryRequest,
        found: UnboundedSender<HostFound>,
    ) -> Result<(), CollaboratorError>;
}

/// Checks which ports of a single host accept TCP connections.
#[async_trait]
pub trait PortProber: Send + Sync {
    async fn probe(
        &self,
        interface: &str,
        target: Ipv4Addr,
        ports: &PortSet,
    ) -> Result<BTreeSet<u16>, CollaboratorError>;
}

/// Enumerates interface names usable for a sweep.
pub trait InterfaceSource: Send + Sync {
    fn list(&self) -> Result<Vec<String>, CollaboratorError>;
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
