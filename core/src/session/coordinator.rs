use std::collections::BTreeSet;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use netsweep_common::error::{CollaboratorError, ConfigurationError, ConsistencyViolation, Result, ScanError};
use netsweep_common::network::host::{HostFound, HostKey, HostRecord, ProbeState};
use netsweep_common::network::ports::PortSet;
use netsweep_common::report::{ReportPayload, ReportSink};
use netsweep_common::scanning::{DiscoveryRequest, HostDiscovery, InterfaceSource, PortProber};
use pnet::util::MacAddr;
use tokio::sync::{Semaphore, mpsc, watch};
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, error, info, warn};

use super::events::{InventoryEvent, SessionId, Subscribers, Subscription, SubscriptionId};
use super::inventory::{SessionInventory, Upsert};

const DEFAULT_MAX_CONCURRENT_PROBES: usize = 32;
const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Upper bound on collaborator probe calls running at once.
    pub max_concurrent_probes: usize,
    /// Deadline for a single host probe, measured once a permit is held.
    pub probe_timeout: Duration,
    pub ports: PortSet,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            max_concurrent_probes: DEFAULT_MAX_CONCURRENT_PROBES,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            ports: PortSet::common(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DiscoveryStatus {
    #[default]
    Idle,
    Running,
    Finished { hosts: usize },
    Failed(CollaboratorError),
}

/// A consistent copy of the inventory at one point in time.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub session: SessionId,
    /// Bumped by every mutation; later snapshots never carry a smaller value.
    pub generation: u64,
    pub discovery: DiscoveryStatus,
    inventory: SessionInventory,
}

impl Snapshot {
    /// A corrupted index is logged and reads as a missing host.
    pub fn get(&self, key: HostKey) -> Option<&HostRecord> {
        match self.inventory.get(key) {
            Ok(host) => host,
            Err(e) => {
                error!(session = %self.session, "snapshot lookup of {key} failed: {e}");
                None
            }
        }
    }

    pub fn hosts(&self) -> impl Iterator<Item = &HostRecord> {
        self.inventory.iter()
    }

    pub fn len(&self) -> usize {
        self.inventory.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inventory.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Completed {
        address: HostKey,
        open_ports: BTreeSet<u16>,
        new_ports: usize,
    },
    Failed {
        address: HostKey,
        error: CollaboratorError,
    },
    /// The session moved on before the result could merge.
    Discarded { address: HostKey },
}

#[derive(Debug)]
pub struct ProbeHandle {
    address: HostKey,
    inner: JoinHandle<ProbeOutcome>,
}

impl ProbeHandle {
    pub fn address(&self) -> HostKey {
        self.address
    }

    pub async fn wait(self) -> ProbeOutcome {
        match self.inner.await {
            Ok(outcome) => outcome,
            Err(e) if e.is_cancelled() => ProbeOutcome::Discarded {
                address: self.address,
            },
            Err(e) => ProbeOutcome::Failed {
                address: self.address,
                error: CollaboratorError::Aborted(e.to_string()),
            },
        }
    }
}

#[derive(Debug)]
pub enum ProbeDispatch {
    Dispatched(ProbeHandle),
    /// A probe for this host is already running; nothing was started.
    AlreadyInFlight,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProbeSummary {
    pub requested: usize,
    pub dispatched: usize,
    pub skipped: usize,
    pub completed: usize,
    pub failed: usize,
    pub discarded: usize,
}

struct SessionState {
    session: SessionId,
    request: Option<DiscoveryRequest>,
    inventory: SessionInventory,
    discovery: DiscoveryStatus,
    generation: u64,
    subscribers: Subscribers,
    tasks: Vec<AbortHandle>,
}

impl SessionState {
    fn commit(&mut self, event: InventoryEvent) {
        self.generation += 1;
        self.subscribers.publish(event);
    }

    fn track(&mut self, handle: AbortHandle) {
        self.tasks.retain(|task| !task.is_finished());
        self.tasks.push(handle);
    }

    fn abort_tasks(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            session: self.session,
            generation: self.generation,
            discovery: self.discovery.clone(),
            inventory: self.inventory.clone(),
        }
    }
}

struct Shared {
    state: RwLock<SessionState>,
    discovery: Arc<dyn HostDiscovery>,
    prober: Arc<dyn PortProber>,
    interfaces: Arc<dyn InterfaceSource>,
    permits: Arc<Semaphore>,
    probe_timeout: Duration,
    ports: Arc<PortSet>,
    status: watch::Sender<DiscoveryStatus>,
}

/// Owns the inventory of the current session and every task feeding it.
///
/// All mutations go through one write lock, and subscriber events are queued
/// inside the same critical section, so every subscriber observes changes in
/// the order they were applied. Cloning is cheap and yields a handle to the
/// same coordinator.
///
/// Operations that start background work ([`start_discovery`], [`probe_host`])
/// must be called from inside a Tokio runtime.
///
/// [`start_discovery`]: Coordinator::start_discovery
/// [`probe_host`]: Coordinator::probe_host
#[derive(Clone)]
pub struct Coordinator {
    shared: Arc<Shared>,
}

impl Coordinator {
    pub fn new(
        config: CoordinatorConfig,
        discovery: Arc<dyn HostDiscovery>,
        prober: Arc<dyn PortProber>,
        interfaces: Arc<dyn InterfaceSource>,
    ) -> Self {
        let state = SessionState {
            session: SessionId::default(),
            request: None,
            inventory: SessionInventory::new(),
            discovery: DiscoveryStatus::Idle,
            generation: 0,
            subscribers: Subscribers::default(),
            tasks: Vec::new(),
        };
        let (status, _) = watch::channel(DiscoveryStatus::Idle);

        Self {
            shared: Arc::new(Shared {
                state: RwLock::new(state),
                discovery,
                prober,
                interfaces,
                permits: Arc::new(Semaphore::new(config.max_concurrent_probes.max(1))),
                probe_timeout: config.probe_timeout,
                ports: Arc::new(config.ports),
                status,
            }),
        }
    }

    pub fn list_interfaces(&self) -> std::result::Result<Vec<String>, CollaboratorError> {
        let names = self.shared.interfaces.list()?;
        if names.is_empty() {
            return Err(CollaboratorError::NoInterfacesAvailable);
        }
        Ok(names)
    }

    /// Starts a fresh session and sweeps `subnet` from `interface`.
    ///
    /// Input is validated first; on error the current session is left alone.
    /// On success every task of the previous session is aborted, the
    /// inventory is replaced and subscribers get `InventoryReset`.
    pub fn start_discovery(&self, interface: &str, source: &str, subnet: &str) -> Result<SessionId> {
        let request = DiscoveryRequest::parse(interface, source, subnet)?;
        self.ensure_interface_exists(&request.interface)?;

        if !request.subnet.contains(request.source) {
            warn!(
                "source address {} lies outside {}, replies may not reach us",
                request.source, request.subnet
            );
        }

        let mut state = self.write();
        state.abort_tasks();
        let session = state.session.next();
        state.session = session;
        state.request = Some(request.clone());
        state.inventory = SessionInventory::new();
        state.discovery = DiscoveryStatus::Running;
        state.commit(InventoryEvent::InventoryReset { session });
        self.shared.status.send_replace(DiscoveryStatus::Running);

        info!(
            session = %session,
            interface = %request.interface,
            subnet = %request.subnet,
            "discovery started"
        );

        let handle = tokio::spawn(self.clone().run_discovery(session, request));
        state.track(handle.abort_handle());
        Ok(session)
    }

    /// Upserts a host into the current session.
    pub fn on_host_found(&self, address: HostKey, link_address: MacAddr) -> Result<Upsert> {
        let mut state = self.write();
        if state.request.is_none() {
            return Err(ScanError::NoActiveSession);
        }
        let session = state.session;
        Ok(Self::merge_host(&mut state, session, HostFound::new(address, link_address))?)
    }

    /// Dispatches a port probe for `address` on the discovery-time interface.
    pub fn probe_host(&self, address: HostKey) -> Result<ProbeDispatch> {
        self.dispatch_probe(None, address)
    }

    /// Probes every host known right now and waits for all of them to settle.
    ///
    /// Hosts discovered after the call are not included. Per-host events are
    /// delivered to subscribers as each probe settles.
    pub async fn probe_all_hosts(&self) -> ProbeSummary {
        let (session, addresses) = {
            let state = self.read();
            (state.session, state.inventory.keys())
        };

        let mut summary = ProbeSummary {
            requested: addresses.len(),
            ..ProbeSummary::default()
        };
        let mut handles = Vec::with_capacity(addresses.len());

        for address in addresses {
            match self.dispatch_probe(Some(session), address) {
                Ok(ProbeDispatch::Dispatched(handle)) => {
                    summary.dispatched += 1;
                    handles.push(handle);
                }
                Ok(ProbeDispatch::AlreadyInFlight) => summary.skipped += 1,
                Err(e) => {
                    debug!("not probing {address}: {e}");
                    summary.discarded += 1;
                }
            }
        }

        for handle in handles {
            match handle.wait().await {
                ProbeOutcome::Completed { .. } => summary.completed += 1,
                ProbeOutcome::Failed { .. } => summary.failed += 1,
                ProbeOutcome::Discarded { .. } => summary.discarded += 1,
            }
        }

        info!(
            session = %session,
            completed = summary.completed,
            failed = summary.failed,
            "probe sweep settled"
        );
        summary
    }

    pub fn snapshot(&self) -> Snapshot {
        self.read().snapshot()
    }

    pub fn export_snapshot(&self) -> ReportPayload {
        self.read().inventory.iter().collect()
    }

    /// Exports the current inventory through `sink`. Returns the number of
    /// hosts written. A failed write leaves the inventory untouched.
    pub fn export_to(&self, sink: &dyn ReportSink) -> Result<usize> {
        let payload = self.export_snapshot();
        sink.persist(&payload)?;
        Ok(payload.len())
    }

    pub fn subscribe(&self) -> Subscription {
        self.write().subscribers.subscribe()
    }

    /// Subscribes and takes a snapshot atomically, so no event is missed
    /// between the two.
    pub fn subscribe_with_snapshot(&self) -> (Snapshot, Subscription) {
        let mut state = self.write();
        let subscription = state.subscribers.subscribe();
        (state.snapshot(), subscription)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.write().subscribers.unsubscribe(id)
    }

    /// Resolves once the current discovery sweep has finished or failed.
    pub async fn wait_for_discovery(&self) -> DiscoveryStatus {
        let mut rx = self.shared.status.subscribe();
        match rx.wait_for(|status| *status != DiscoveryStatus::Running).await {
            Ok(status) => status.clone(),
            Err(_) => self.read().discovery.clone(),
        }
    }

    /// Aborts all work of the current session.
    ///
    /// Hosts with a probe in flight become `ProbeFailed` and a running
    /// discovery becomes `Failed`, so nothing is left dangling.
    pub fn cancel(&self) {
        let mut state = self.write();
        state.abort_tasks();
        let session = state.session;
        let cancelled = CollaboratorError::Aborted("cancelled".to_string());

        let in_flight: Vec<HostKey> = state
            .inventory
            .iter()
            .filter(|host| host.probe_state == ProbeState::ProbeInFlight)
            .map(|host| host.address)
            .collect();

        for address in in_flight {
            match state.inventory.get_mut(address) {
                Ok(Some(host)) => {
                    host.probe_state = ProbeState::ProbeFailed;
                    host.last_error = Some(cancelled.clone());
                }
                Ok(None) => continue,
                Err(e) => {
                    error!(session = %session, "cannot cancel probe for {address}: {e}");
                    continue;
                }
            }
            state.commit(InventoryEvent::ProbeStateChanged {
                session,
                address,
                state: ProbeState::ProbeFailed,
                error: Some(cancelled.clone()),
            });
        }

        if state.discovery == DiscoveryStatus::Running {
            state.discovery = DiscoveryStatus::Failed(cancelled.clone());
            state.commit(InventoryEvent::DiscoveryFailed {
                session,
                error: cancelled,
            });
            self.shared.status.send_replace(state.discovery.clone());
        }
        warn!(session = %session, "session cancelled");
    }

    fn ensure_interface_exists(&self, name: &str) -> Result<()> {
        match self.shared.interfaces.list() {
            Ok(names) if names.iter().any(|n| n == name) => Ok(()),
            Ok(_) => Err(ConfigurationError::InvalidInterface(name.to_string()).into()),
            Err(e) => {
                warn!("interface lookup failed: {e}");
                Err(ConfigurationError::InvalidInterface(name.to_string()).into())
            }
        }
    }

    fn merge_host(
        state: &mut SessionState,
        session: SessionId,
        found: HostFound,
    ) -> std::result::Result<Upsert, ConsistencyViolation> {
        let upsert = state.inventory.upsert(found)?;
        debug!(session = %session, address = %found.address, ?upsert, "host merged");
        state.commit(InventoryEvent::HostUpserted {
            session,
            address: found.address,
            upsert,
        });
        Ok(upsert)
    }

    async fn run_discovery(self, session: SessionId, request: DiscoveryRequest) {
        let (tx, mut rx) = mpsc::unbounded_channel::<HostFound>();

        let sweep = self.shared.discovery.discover(&request, tx);
        let consume = async {
            while let Some(found) = rx.recv().await {
                let mut state = self.write();
                if state.session != session {
                    debug!(session = %session, "discovery outlived its session");
                    break;
                }
                if let Err(e) = Self::merge_host(&mut state, session, found) {
                    error!(session = %session, "dropping reply from {}: {e}", found.address);
                }
            }
        };

        let (result, ()) = tokio::join!(sweep, consume);
        self.finish_discovery(session, result);
    }

    fn finish_discovery(&self, session: SessionId, result: std::result::Result<(), CollaboratorError>) {
        let mut state = self.write();
        if state.session != session || state.discovery != DiscoveryStatus::Running {
            return;
        }

        match result {
            Ok(()) => {
                let hosts = state.inventory.len();
                state.discovery = DiscoveryStatus::Finished { hosts };
                state.commit(InventoryEvent::DiscoveryFinished { session, hosts });
                info!(session = %session, hosts, "discovery finished");
            }
            Err(e) => {
                error!(session = %session, "discovery failed: {e}");
                state.discovery = DiscoveryStatus::Failed(e.clone());
                state.commit(InventoryEvent::DiscoveryFailed { session, error: e });
            }
        }
        self.shared.status.send_replace(state.discovery.clone());
    }

    /// `expected` pins the dispatch to a session captured earlier.
    fn dispatch_probe(&self, expected: Option<SessionId>, address: HostKey) -> Result<ProbeDispatch> {
        let mut state = self.write();
        let session = state.session;
        if expected.is_some_and(|expected| expected != session) {
            return Err(ScanError::UnknownHost(address));
        }

        let interface = state
            .request
            .as_ref()
            .map(|request| request.interface.clone())
            .ok_or(ScanError::NoActiveSession)?;

        let host = state
            .inventory
            .get_mut(address)?
            .ok_or(ScanError::UnknownHost(address))?;
        if host.probe_state == ProbeState::ProbeInFlight {
            debug!(session = %session, %address, "probe already in flight");
            return Ok(ProbeDispatch::AlreadyInFlight);
        }
        host.probe_state = ProbeState::ProbeInFlight;

        state.commit(InventoryEvent::ProbeStateChanged {
            session,
            address,
            state: ProbeState::ProbeInFlight,
            error: None,
        });

        let inner = tokio::spawn(self.clone().run_probe(session, address, interface));
        state.track(inner.abort_handle());
        Ok(ProbeDispatch::Dispatched(ProbeHandle { address, inner }))
    }

    async fn run_probe(self, session: SessionId, address: HostKey, interface: String) -> ProbeOutcome {
        let _permit = match Arc::clone(&self.shared.permits).acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => {
                let error = CollaboratorError::Aborted("probe pool closed".to_string());
                return self.settle_probe(session, address, Err(error));
            }
        };

        if self.read().session != session {
            return ProbeOutcome::Discarded { address };
        }

        debug!(session = %session, %address, %interface, "probing");
        let prober = Arc::clone(&self.shared.prober);
        let ports = Arc::clone(&self.shared.ports);
        let limit = self.shared.probe_timeout;

        let mut call = AbortOnDrop(tokio::spawn(async move {
            prober.probe(&interface, address, &ports).await
        }));

        let result = match tokio::time::timeout(limit, &mut call.0).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(CollaboratorError::Aborted(e.to_string())),
            Err(_) => Err(CollaboratorError::Timeout(limit)),
        };

        self.settle_probe(session, address, result)
    }

    fn settle_probe(
        &self,
        session: SessionId,
        address: HostKey,
        result: std::result::Result<BTreeSet<u16>, CollaboratorError>,
    ) -> ProbeOutcome {
        let mut state = self.write();
        if state.session != session {
            debug!(session = %session, %address, "discarding stale probe result");
            return ProbeOutcome::Discarded { address };
        }

        let host = match state.inventory.get_mut(address) {
            Ok(Some(host)) if host.probe_state == ProbeState::ProbeInFlight => host,
            Ok(_) => return ProbeOutcome::Discarded { address },
            Err(e) => {
                error!(session = %session, "cannot settle probe for {address}: {e}");
                return ProbeOutcome::Discarded { address };
            }
        };
        host.probe_count += 1;

        let (outcome, settled, error) = match result {
            Ok(ports) => {
                let new_ports = host.merge_ports(ports);
                host.probe_state = ProbeState::ProbeComplete;
                host.last_error = None;
                info!(session = %session, %address, open = host.open_ports.len(), new_ports, "probe complete");
                let outcome = ProbeOutcome::Completed {
                    address,
                    open_ports: host.open_ports.clone(),
                    new_ports,
                };
                (outcome, ProbeState::ProbeComplete, None)
            }
            Err(e) => {
                warn!(session = %session, %address, "probe failed: {e}");
                host.probe_state = ProbeState::ProbeFailed;
                host.last_error = Some(e.clone());
                let outcome = ProbeOutcome::Failed {
                    address,
                    error: e.clone(),
                };
                (outcome, ProbeState::ProbeFailed, Some(e))
            }
        };

        state.commit(InventoryEvent::ProbeStateChanged {
            session,
            address,
            state: settled,
            error,
        });
        outcome
    }

    fn read(&self) -> RwLockReadGuard<'_, SessionState> {
        self.shared.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.shared.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Aborts the wrapped task when dropped, so a cancelled probe does not
/// leave its collaborator call running.
struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
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
