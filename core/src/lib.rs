//! Scan-session engine: host discovery, port probing and the coordinator
//! that keeps their results consistent.

pub mod discovery;
pub mod network;
pub mod probe;
pub mod report;
pub mod session;
pub mod system;

use std::sync::Arc;

pub use session::{Coordinator, CoordinatorConfig};

/// A coordinator wired to the real network: ARP discovery, TCP connect
/// probes and the operating system's interface list.
pub fn system_coordinator(config: CoordinatorConfig, prober: probe::ProberConfig) -> Coordinator {
    Coordinator::new(
        config,
        Arc::new(discovery::ArpDiscovery::new()),
        Arc::new(probe::TcpConnectProber::with_config(prober)),
        Arc::new(system::SystemInterfaces),
    )
}
