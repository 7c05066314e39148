use std::sync::OnceLock;

use mac_oui::Oui;
use pnet::util::MacAddr;
use tracing::warn;

static OUI_DB: OnceLock<Option<Oui>> = OnceLock::new();

/// Loads the **Organizationally unique identifier** database once.
fn get_oui_db() -> Option<&'static Oui> {
    OUI_DB
        .get_or_init(|| match Oui::default() {
            Ok(db) => Some(db),
            Err(e) => {
                warn!("OUI database unavailable, vendor names disabled: {e}");
                None
            }
        })
        .as_ref()
}

/// Identify the vendor behind a link address.
pub fn get_vendor(mac: MacAddr) -> Option<String> {
    let db = get_oui_db()?;
    match db.lookup_by_mac(&mac.to_string()) {
        Ok(Some(entry)) => Some(entry.company_name.clone()),
        _ => None,
    }
}

/// Locally administered addresses (randomised phone MACs, VMs) never resolve.
pub fn is_locally_administered(mac: MacAddr) -> bool {
    mac.0 & 0b0000_0010 != 0
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
