//! # Host Discovery
//!
//! Concrete [`HostDiscovery`](netsweep_common::scanning::HostDiscovery)
//! implementations. Only ARP is supported: it needs raw socket access and
//! only finds hosts on the local link.

mod arp;

pub use arp::{ArpDiscovery, DiscoveryTiming};
