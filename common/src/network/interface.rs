use std::fmt;
use std::net::Ipv4Addr;

use pnet::datalink::NetworkInterface;
use pnet::ipnetwork::{IpNetwork, Ipv4Network};

pub trait NetworkInterfaceExtension {
    fn get_ipv4_nets(&self) -> Vec<Ipv4Network>;
    fn get_ipv4_addr(&self) -> Option<Ipv4Addr>;
}

impl NetworkInterfaceExtension for NetworkInterface {
    fn get_ipv4_nets(&self) -> Vec<Ipv4Network> {
        self.ips
            .iter()
            .filter_map(|ip| match ip {
                IpNetwork::V4(ipv4) => Some(*ipv4),
                IpNetwork::V6(_) => None,
            })
            .collect()
    }

    fn get_ipv4_addr(&self) -> Option<Ipv4Addr> {
        self.get_ipv4_nets()
            .into_iter()
            .map(|net| net.ip())
            .find(|ip| !ip.is_loopback())
    }
}

/// Reasons an interface cannot carry an ARP sweep.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ArpIssue {
    IsDown,
    IsLoopback,
    NoMacAddress,
    NotBroadcast,
    IsPointToPoint,
}

impl fmt::Display for ArpIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            ArpIssue::IsDown => "interface is down",
            ArpIssue::IsLoopback => "loopback interfaces do not answer ARP",
            ArpIssue::NoMacAddress => "interface has no MAC address",
            ArpIssue::NotBroadcast => "interface does not support broadcast",
            ArpIssue::IsPointToPoint => "point-to-point links have no ARP",
        };
        f.write_str(reason)
    }
}

pub fn check_arp_ready(interface: &NetworkInterface) -> Result<(), ArpIssue> {
    if !interface.is_up() {
        return Err(ArpIssue::IsDown);
    }
    if interface.is_loopback() {
        return Err(ArpIssue::IsLoopback);
    }
    if interface.mac.is_none() {
        return Err(ArpIssue::NoMacAddress);
    }
    if !interface.is_broadcast() {
        return Err(ArpIssue::NotBroadcast);
    }
    if interface.is_point_to_point() {
        return Err(ArpIssue::IsPointToPoint);
    }
    Ok(())
}

/// Keeps usable interfaces and orders wired-looking names first.
pub fn prioritize(interfaces: Vec<NetworkInterface>) -> Vec<NetworkInterface> {
    let mut interfaces: Vec<NetworkInterface> = interfaces
        .into_iter()
        .filter(|i| i.is_up() && !i.is_loopback() && !i.ips.is_empty())
        .collect();

    // Name heuristic: eth*/en* before wl*, tun*, docker*, ...
    interfaces.sort_by_key(|i| if i.name.starts_with('e') { 0 } else { 1 });
    interfaces
}

pub fn find_by_name<'a>(interfaces: &'a [NetworkInterface], name: &str) -> Option<&'a NetworkInterface> {
    interfaces.iter().find(|iface| iface.name == name)
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
