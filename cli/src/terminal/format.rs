use std::collections::BTreeSet;

use colored::*;
use netsweep_common::network::host::{HostRecord, ProbeState};
use netsweep_common::network::mac;
use pnet::util::MacAddr;

use super::colors;

pub type Detail = (String, ColoredString);

pub fn ipv4_to_detail(host: &HostRecord) -> Detail {
    ("IPv4".to_string(), host.address.to_string().color(colors::IPV4_ADDR))
}

pub fn mac_to_detail(link_address: MacAddr) -> Detail {
    let value = link_address.to_string().color(colors::MAC_ADDR);
    if mac::is_locally_administered(link_address) {
        ("MAC".to_string(), format!("{value} (random)").normal())
    } else {
        ("MAC".to_string(), value)
    }
}

pub fn vendor_to_detail(link_address: MacAddr) -> Option<Detail> {
    mac::get_vendor(link_address).map(|vendor| ("Vendor".to_string(), vendor.color(colors::SECONDARY)))
}

pub fn ports_to_detail(open_ports: &BTreeSet<u16>) -> Detail {
    if open_ports.is_empty() {
        return ("Ports".to_string(), "none open".color(colors::SEPARATOR));
    }
    let joined: String = open_ports
        .iter()
        .map(u16::to_string)
        .collect::<Vec<String>>()
        .join(", ");
    ("Ports".to_string(), joined.color(colors::PORT_OPEN).bold())
}

/// Only failed probes are worth a line of their own.
pub fn probe_to_detail(host: &HostRecord) -> Option<Detail> {
    if host.probe_state != ProbeState::ProbeFailed {
        return None;
    }
    let reason: String = host
        .last_error
        .as_ref()
        .map_or_else(|| host.probe_state.to_string(), ToString::to_string);
    Some(("Error".to_string(), reason.color(colors::ERROR)))
}

pub fn host_details(host: &HostRecord, with_ports: bool) -> Vec<Detail> {
    let mut details: Vec<Detail> = vec![ipv4_to_detail(host), mac_to_detail(host.link_address)];

    if let Some(vendor_detail) = vendor_to_detail(host.link_address) {
        details.push(vendor_detail);
    }

    if with_ports {
        details.push(ports_to_detail(&host.open_ports));
        if let Some(probe_detail) = probe_to_detail(host) {
            details.push(probe_detail);
        }
    }

    details
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
