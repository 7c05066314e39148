use std::net::Ipv4Addr;

use pnet::ipnetwork::Ipv4Network;

use crate::error::ConfigurationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ipv4Range {
    pub start_addr: Ipv4Addr,
    pub end_addr: Ipv4Addr,
}

impl Ipv4Range {
    pub fn new(start_addr: Ipv4Addr, end_addr: Ipv4Addr) -> Self {
        Self {
            start_addr,
            end_addr,
        }
    }

    pub fn to_iter(&self) -> impl Iterator<Item = Ipv4Addr> + use<> {
        let start: u32 = self.start_addr.into();
        let end: u32 = self.end_addr.into();
        (start..=end).map(Ipv4Addr::from)
    }

    pub fn len(&self) -> usize {
        let start: u32 = self.start_addr.into();
        let end: u32 = self.end_addr.into();
        end.saturating_sub(start) as usize + usize::from(start <= end)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Addresses worth probing inside `net`.
///
/// Network and broadcast addresses are stripped when the prefix leaves room
/// for at least one host; /31 and /32 are swept in full.
pub fn sweep_range(net: Ipv4Network) -> Ipv4Range {
    let net_u32: u32 = u32::from(net.network());
    let broadcast_u32: u32 = u32::from(net.broadcast());

    let start_u32 = net_u32.saturating_add(1);
    let end_u32 = broadcast_u32.saturating_sub(1);

    if net.prefix() < 31 && start_u32 <= end_u32 {
        Ipv4Range::new(Ipv4Addr::from(start_u32), Ipv4Addr::from(end_u32))
    } else {
        Ipv4Range::new(net.network(), net.broadcast())
    }
}

pub fn parse_address(input: &str) -> Result<Ipv4Addr, ConfigurationError> {
    input
        .trim()
        .parse::<Ipv4Addr>()
        .map_err(|e| ConfigurationError::InvalidAddress {
            input: input.to_string(),
            reason: e.to_string(),
        })
}

pub fn parse_subnet(input: &str) -> Result<Ipv4Network, ConfigurationError> {
    let invalid = |reason: String| ConfigurationError::InvalidSubnet {
        input: input.to_string(),
        reason,
    };
    let (addr, prefix) = input
        .trim()
        .split_once('/')
        .ok_or_else(|| invalid("expected <address>/<prefix>".to_string()))?;
    let addr: Ipv4Addr = addr.parse().map_err(|e: std::net::AddrParseError| invalid(e.to_string()))?;
    let prefix: u8 = prefix
        .parse()
        .map_err(|e: std::num::ParseIntError| invalid(e.to_string()))?;
    Ipv4Network::new(addr, prefix).map_err(|e| invalid(e.to_string()))
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
