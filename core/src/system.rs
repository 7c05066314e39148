use pnet::datalink::{self, NetworkInterface};

use netsweep_common::error::CollaboratorError;
use netsweep_common::network::interface;
use netsweep_common::scanning::InterfaceSource;

/// Interfaces reported by the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemInterfaces;

impl SystemInterfaces {
    /// Usable interfaces, wired-looking names first.
    pub fn detailed(&self) -> Result<Vec<NetworkInterface>, CollaboratorError> {
        let interfaces = interface::prioritize(datalink::interfaces());
        if interfaces.is_empty() {
            return Err(CollaboratorError::NoInterfacesAvailable);
        }
        Ok(interfaces)
    }
}

/// Every interface counts as existing, even one that is down or has no
/// address yet. Whether it can carry a sweep is up to the discovery.
fn names(interfaces: Vec<NetworkInterface>) -> Result<Vec<String>, CollaboratorError> {
    if interfaces.is_empty() {
        return Err(CollaboratorError::NoInterfacesAvailable);
    }
    Ok(interfaces.into_iter().map(|intf| intf.name).collect())
}

impl InterfaceSource for SystemInterfaces {
    fn list(&self) -> Result<Vec<String>, CollaboratorError> {
        names(datalink::interfaces())
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
