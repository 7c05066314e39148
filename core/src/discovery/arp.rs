//! An ARP sweep over a single IPv4 subnet.
//!
//! This requires **root privileges** (or `CAP_NET_RAW`) to open a Layer 2
//! channel on the chosen interface.

use std::collections::HashSet;
use std::net::Ipv4Addr;
use std::time::Duration;

use async_trait::async_trait;
use pnet::datalink::{self, DataLinkSender, NetworkInterface};
use pnet::util::MacAddr;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tracing::{debug, warn};

use netsweep_common::error::CollaboratorError;
use netsweep_common::network::host::HostFound;
use netsweep_common::network::interface;
use netsweep_common::network::range;
use netsweep_common::scanning::{DiscoveryRequest, HostDiscovery};
use netsweep_common::utils::timing::ScanTimer;
use netsweep_protocols::{arp, ethernet};

use crate::network::channel;

const MAX_CHANNEL_TIME: Duration = Duration::from_millis(7_500);
const MIN_CHANNEL_TIME: Duration = Duration::from_millis(2_500);
const MAX_SILENCE: Duration = Duration::from_millis(500);

/// How long the sweep keeps listening for replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscoveryTiming {
    pub max_time: Duration,
    pub min_time: Duration,
    pub max_silence: Duration,
}

impl Default for DiscoveryTiming {
    fn default() -> Self {
        Self {
            max_time: MAX_CHANNEL_TIME,
            min_time: MIN_CHANNEL_TIME,
            max_silence: MAX_SILENCE,
        }
    }
}

impl DiscoveryTiming {
    fn timer(&self) -> ScanTimer {
        ScanTimer::new(self.max_time, self.min_time, self.max_silence)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ArpDiscovery {
    timing: DiscoveryTiming,
}

impl ArpDiscovery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timing(timing: DiscoveryTiming) -> Self {
        Self { timing }
    }
}

#[async_trait]
impl HostDiscovery for ArpDiscovery {
    async fn discover(
        &self,
        request: &DiscoveryRequest,
        found: UnboundedSender<HostFound>,
    ) -> Result<(), CollaboratorError> {
        let intf = resolve_interface(&request.interface)?;
        let src_mac = intf.mac.ok_or_else(|| unavailable(&intf.name, "interface has no MAC address"))?;

        let mut handle = channel::start_capture(&intf)
            .map_err(|e| CollaboratorError::from_io(&e, &format!("opening capture on {}", intf.name)))?;

        let mut sweep = ArpSweep {
            request,
            targets: range::sweep_range(request.subnet).to_iter().filter(|ip| *ip != request.source).collect(),
            answered: HashSet::new(),
            timer: self.timing.timer(),
            found,
        };

        sweep.send_requests(handle.tx.as_mut(), src_mac)?;
        sweep.listen(&mut handle.rx, self.timing.max_time).await;

        debug!(
            interface = %intf.name,
            answered = sweep.answered.len(),
            "ARP sweep over"
        );
        Ok(())
    }
}

struct ArpSweep<'a> {
    request: &'a DiscoveryRequest,
    targets: Vec<Ipv4Addr>,
    answered: HashSet<Ipv4Addr>,
    timer: ScanTimer,
    found: UnboundedSender<HostFound>,
}

impl ArpSweep<'_> {
    fn send_requests(&self, tx: &mut dyn DataLinkSender, src_mac: MacAddr) -> Result<(), CollaboratorError> {
        let mut sent = 0usize;
        for target in &self.targets {
            let packet = arp::create_request(src_mac, self.request.source, *target)
                .map_err(|e| CollaboratorError::InvalidParameters(e.to_string()))?;

            match tx.send_to(&packet, None) {
                Some(Ok(())) => sent += 1,
                Some(Err(e)) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                    return Err(CollaboratorError::from_io(&e, "sending ARP request"));
                }
                Some(Err(e)) => warn!("ARP request to {target} not sent: {e}"),
                None => warn!("ARP request to {target} not sent: no buffer space"),
            }
        }
        debug!(sent, targets = self.targets.len(), "ARP requests sent");
        Ok(())
    }

    async fn listen(&mut self, rx: &mut UnboundedReceiver<Vec<u8>>, max_time: Duration) {
        let scan_deadline = tokio::time::sleep(max_time);
        tokio::pin!(scan_deadline);

        while self.should_continue() {
            let silence_timeout = tokio::time::sleep(self.timer.next_wait());

            tokio::select! {
                frame = rx.recv() => {
                    match frame {
                        Some(bytes) => {
                            if !self.process_frame(&bytes) {
                                break;
                            }
                        }
                        None => break,
                    }
                }

                _ = &mut scan_deadline => break,

                _ = silence_timeout => {
                    if self.timer.should_break_on_timeout() {
                        break;
                    }
                }
            }
        }
    }

    /// Returns `false` once nobody is listening for results anymore.
    fn process_frame(&mut self, bytes: &[u8]) -> bool {
        let Some(host) = reply_from_frame(bytes, self.request) else {
            return true;
        };
        if !self.answered.insert(host.address) {
            return true;
        }
        self.timer.mark_seen();
        self.found.send(host).is_ok()
    }

    fn should_continue(&self) -> bool {
        let time_left = !self.timer.is_expired();
        let work_remains = self.targets.len() > self.answered.len();
        time_left && work_remains && !self.found.is_closed()
    }
}

/// Decodes `bytes` as an ARP reply from a host inside the swept subnet.
fn reply_from_frame(bytes: &[u8], request: &DiscoveryRequest) -> Option<HostFound> {
    let eth_frame = ethernet::get_packet_from_u8(bytes).ok()?;
    let reply = arp::parse_reply(&eth_frame).ok()?;

    if reply.sender_addr == request.source || !request.subnet.contains(reply.sender_addr) {
        return None;
    }
    Some(HostFound::new(reply.sender_addr, reply.sender_mac))
}

fn resolve_interface(name: &str) -> Result<NetworkInterface, CollaboratorError> {
    let interfaces = datalink::interfaces();
    let intf = interface::find_by_name(&interfaces, name)
        .cloned()
        .ok_or_else(|| unavailable(name, "no such interface"))?;
    interface::check_arp_ready(&intf).map_err(|issue| unavailable(name, &issue.to_string()))?;
    Ok(intf)
}

fn unavailable(name: &str, reason: &str) -> CollaboratorError {
    CollaboratorError::InterfaceUnavailable {
        name: name.to_string(),
        reason: reason.to_string(),
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
