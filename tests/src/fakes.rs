use std::collections::{BTreeSet, HashMap, VecDeque};
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use netsweep_common::error::{CollaboratorError, PersistenceError};
use netsweep_common::network::host::HostFound;
use netsweep_common::network::ports::PortSet;
use netsweep_common::report::{ReportPayload, ReportSink};
use netsweep_common::scanning::{DiscoveryRequest, HostDiscovery, InterfaceSource, PortProber};
use netsweep_core::session::{Coordinator, CoordinatorConfig, DiscoveryStatus};
use pnet::util::MacAddr;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::Notify;

pub const IFACE: &str = "eth0";
pub const SOURCE: &str = "10.0.0.2";
pub const SUBNET: &str = "10.0.0.0/24";

pub fn ip(last: u8) -> Ipv4Addr {
    Ipv4Addr::new(10, 0, 0, last)
}

pub fn mac(last: u8) -> MacAddr {
    MacAddr(0xaa, 0xbb, 0xcc, 0xdd, 0xee, last)
}

pub fn found(last: u8) -> HostFound {
    HostFound::new(ip(last), mac(last))
}

/// Replays a fixed list of replies, keeping only those inside the
/// requested subnet.
#[derive(Default)]
pub struct FakeDiscovery {
    hosts: Vec<HostFound>,
    delay: Duration,
    failure: Option<CollaboratorError>,
    gate: Option<Arc<Notify>>,
    calls: AtomicUsize,
}

impl FakeDiscovery {
    pub fn new(hosts: Vec<HostFound>) -> Self {
        Self {
            hosts,
            ..Self::default()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn failing(mut self, error: CollaboratorError) -> Self {
        self.failure = Some(error);
        self
    }

    /// Keeps the sweep running after the last reply until `gate` is notified.
    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HostDiscovery for FakeDiscovery {
    async fn discover(
        &self,
        request: &DiscoveryRequest,
        found: UnboundedSender<HostFound>,
    ) -> Result<(), CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        for host in self.hosts.iter().filter(|h| request.subnet.contains(h.address)) {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if found.send(*host).is_err() {
                break;
            }
        }
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        match &self.failure {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Step {
    Ports(Vec<u16>),
    Fail(CollaboratorError),
    Hang,
    Panic,
}

/// Answers probes from per-host scripts. Unscripted probes find nothing.
#[derive(Default)]
pub struct FakeProber {
    scripts: Mutex<HashMap<Ipv4Addr, VecDeque<Step>>>,
    delay: Duration,
    calls: AtomicUsize,
    active: AtomicUsize,
    peak: AtomicUsize,
    interfaces: Mutex<Vec<String>>,
}

impl FakeProber {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn script(self, address: Ipv4Addr, step: Step) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .entry(address)
            .or_default()
            .push_back(step);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of probes that were running at the same time.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn interfaces(&self) -> Vec<String> {
        self.interfaces.lock().unwrap().clone()
    }

    fn next_step(&self, address: Ipv4Addr) -> Step {
        self.scripts
            .lock()
            .unwrap()
            .get_mut(&address)
            .and_then(VecDeque::pop_front)
            .unwrap_or(Step::Ports(Vec::new()))
    }
}

struct ActiveGuard<'a>(&'a AtomicUsize);

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl PortProber for FakeProber {
    async fn probe(
        &self,
        interface: &str,
        target: Ipv4Addr,
        _ports: &PortSet,
    ) -> Result<BTreeSet<u16>, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.interfaces.lock().unwrap().push(interface.to_string());
        let step = self.next_step(target);

        let running = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(running, Ordering::SeqCst);
        let _guard = ActiveGuard(&self.active);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        match step {
            Step::Ports(ports) => Ok(ports.into_iter().collect()),
            Step::Fail(error) => Err(error),
            Step::Hang => std::future::pending().await,
            Step::Panic => panic!("scripted prober panic for {target}"),
        }
    }
}

pub struct FakeInterfaces(pub Vec<String>);

impl Default for FakeInterfaces {
    fn default() -> Self {
        Self(vec![IFACE.to_string(), "wlan0".to_string()])
    }
}

impl InterfaceSource for FakeInterfaces {
    fn list(&self) -> Result<Vec<String>, CollaboratorError> {
        Ok(self.0.clone())
    }
}

/// Sink that rejects every write.
pub struct BrokenSink;

impl ReportSink for BrokenSink {
    fn persist(&self, _payload: &ReportPayload) -> Result<(), PersistenceError> {
        Err(PersistenceError::Encode("disk on fire".to_string()))
    }
}

pub fn config() -> CoordinatorConfig {
    CoordinatorConfig {
        max_concurrent_probes: 4,
        probe_timeout: Duration::from_secs(5),
        ..CoordinatorConfig::default()
    }
}

pub fn coordinator(discovery: Arc<FakeDiscovery>, prober: Arc<FakeProber>) -> Coordinator {
    coordinator_with(config(), discovery, prober)
}

pub fn coordinator_with(
    config: CoordinatorConfig,
    discovery: Arc<FakeDiscovery>,
    prober: Arc<FakeProber>,
) -> Coordinator {
    Coordinator::new(config, discovery, prober, Arc::new(FakeInterfaces::default()))
}

/// Runs a discovery over [`SUBNET`] to completion.
pub async fn discover(coordinator: &Coordinator) -> DiscoveryStatus {
    coordinator
        .start_discovery(IFACE, SOURCE, SUBNET)
        .unwrap();
    coordinator.wait_for_discovery().await
}
