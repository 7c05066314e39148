use std::collections::BTreeSet;
use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use pnet::datalink;
use rand::seq::SliceRandom;
use tokio::net::TcpSocket;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;
use tokio::time::{Instant, sleep, timeout};
use tracing::{debug, trace};

use netsweep_common::error::CollaboratorError;
use netsweep_common::network::interface::{self, NetworkInterfaceExtension};
use netsweep_common::network::ports::PortSet;
use netsweep_common::scanning::PortProber;

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(3);
const DEFAULT_CONCURRENCY: usize = 1000;
/// How long a port waits for a free descriptor before the host gives up.
const DESCRIPTOR_WAIT: Duration = Duration::from_secs(30);
const DESCRIPTOR_RETRY: Duration = Duration::from_millis(25);

#[derive(Debug, Clone)]
pub struct ProberConfig {
    /// Per-port connect deadline. A port that does not answer in time is
    /// reported as closed.
    pub connect_timeout: Duration,
    /// Upper bound on sockets open at once, shared by every host the prober
    /// is working on. Clamped to the descriptor budget of the process.
    pub concurrency: usize,
    /// Probe ports in random order instead of ascending.
    pub shuffle: bool,
}

impl Default for ProberConfig {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            concurrency: DEFAULT_CONCURRENCY,
            shuffle: true,
        }
    }
}

impl ProberConfig {
    /// Sockets the prober will actually hold open at once.
    pub fn socket_limit(&self) -> usize {
        let requested = self.concurrency.clamp(1, Semaphore::MAX_PERMITS);
        match descriptor_budget() {
            Some(budget) => requested.min(budget),
            None => requested,
        }
    }

    /// Time one host needs for `ports` silent ports while `hosts` sweeps
    /// share the socket pool.
    pub fn worst_case_sweep(&self, ports: usize, hosts: usize) -> Duration {
        let share = (self.socket_limit() / hosts.max(1)).max(1);
        let waves = u32::try_from(ports.div_ceil(share)).unwrap_or(u32::MAX);
        self.connect_timeout.saturating_mul(waves)
    }
}

/// Half the soft `RLIMIT_NOFILE`. The other half stays free for the capture
/// channel, report files and the runtime itself.
#[cfg(unix)]
fn descriptor_budget() -> Option<usize> {
    let mut limit = libc::rlimit {
        rlim_cur: 0,
        rlim_max: 0,
    };
    // SAFETY: `limit` is a valid, writable rlimit for the duration of the call.
    let rc = unsafe { libc::getrlimit(libc::RLIMIT_NOFILE, &mut limit) };
    if rc != 0 || limit.rlim_cur == libc::RLIM_INFINITY {
        return None;
    }
    let half = usize::try_from(limit.rlim_cur / 2).unwrap_or(usize::MAX);
    Some(half.max(1))
}

#[cfg(not(unix))]
fn descriptor_budget() -> Option<usize> {
    None
}

fn out_of_descriptors(err: &io::Error) -> bool {
    #[cfg(unix)]
    {
        matches!(err.raw_os_error(), Some(libc::EMFILE | libc::ENFILE))
    }
    #[cfg(not(unix))]
    {
        let _ = err;
        false
    }
}

/// Socket permits shared by every sweep of one prober.
#[derive(Debug)]
struct SocketPool {
    permits: Arc<Semaphore>,
    open: AtomicUsize,
    peak: AtomicUsize,
}

impl SocketPool {
    fn new(limit: usize) -> Arc<Self> {
        Arc::new(Self {
            permits: Arc::new(Semaphore::new(limit)),
            open: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        })
    }

    async fn lease(self: &Arc<Self>) -> Result<SocketLease, CollaboratorError> {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|e| CollaboratorError::Aborted(e.to_string()))?;
        let open = self.open.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(open, Ordering::SeqCst);
        Ok(SocketLease {
            pool: Arc::clone(self),
            _permit: permit,
        })
    }
}

struct SocketLease {
    pool: Arc<SocketPool>,
    _permit: OwnedSemaphorePermit,
}

impl Drop for SocketLease {
    fn drop(&mut self) {
        self.pool.open.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PortStatus {
    Open,
    Closed,
    Unreachable,
}

/// Full TCP handshake against every port. Needs no special privileges.
///
/// Clones share one socket pool, so the socket bound holds no matter how
/// many hosts are probed at the same time.
#[derive(Debug, Clone)]
pub struct TcpConnectProber {
    config: ProberConfig,
    sockets: Arc<SocketPool>,
}

impl Default for TcpConnectProber {
    fn default() -> Self {
        Self::with_config(ProberConfig::default())
    }
}

impl TcpConnectProber {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ProberConfig) -> Self {
        let limit = config.socket_limit();
        debug!(limit, "tcp socket pool sized");
        Self {
            config,
            sockets: SocketPool::new(limit),
        }
    }

    pub fn socket_limit(&self) -> usize {
        self.config.socket_limit()
    }

    /// Most sockets ever open at once across all sweeps so far.
    pub fn peak_sockets(&self) -> usize {
        self.sockets.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PortProber for TcpConnectProber {
    async fn probe(
        &self,
        interface: &str,
        target: Ipv4Addr,
        ports: &PortSet,
    ) -> Result<BTreeSet<u16>, CollaboratorError> {
        let bind_addr = bind_address(interface)?;

        let mut order: Vec<u16> = ports.iter().collect();
        if self.config.shuffle {
            order.shuffle(&mut rand::rng());
        }

        let mut tasks = JoinSet::new();

        for port in order {
            let lease = self.sockets.lease().await?;
            let limit = self.config.connect_timeout;

            tasks.spawn(async move {
                let status = connect(bind_addr, target, port, limit).await;
                drop(lease);
                (port, status)
            });
        }

        let mut open_ports = BTreeSet::new();
        let mut attempted = 0usize;
        let mut unreachable = 0usize;

        while let Some(joined) = tasks.join_next().await {
            let (port, status) = joined.map_err(|e| CollaboratorError::Aborted(e.to_string()))?;
            attempted += 1;
            match status? {
                PortStatus::Open => {
                    open_ports.insert(port);
                }
                PortStatus::Closed => {}
                PortStatus::Unreachable => unreachable += 1,
            }
        }

        if attempted > 0 && unreachable == attempted {
            return Err(CollaboratorError::HostUnreachable(target));
        }

        debug!(%target, attempted, open = open_ports.len(), "connect probe done");
        Ok(open_ports)
    }
}

/// Source address to bind to, if the interface has a routable IPv4 one.
fn bind_address(name: &str) -> Result<Option<Ipv4Addr>, CollaboratorError> {
    let interfaces = datalink::interfaces();
    let intf = interface::find_by_name(&interfaces, name).ok_or_else(|| {
        CollaboratorError::InterfaceUnavailable {
            name: name.to_string(),
            reason: "no such interface".to_string(),
        }
    })?;
    Ok(intf.get_ipv4_addr())
}

async fn connect(
    bind_addr: Option<Ipv4Addr>,
    target: Ipv4Addr,
    port: u16,
    limit: Duration,
) -> Result<PortStatus, CollaboratorError> {
    let socket = new_socket().await?;
    if let Some(addr) = bind_addr {
        socket
            .bind(SocketAddr::from((addr, 0)))
            .map_err(|e| CollaboratorError::from_io(&e, &format!("binding to {addr}")))?;
    }

    match timeout(limit, socket.connect(SocketAddr::from((target, port)))).await {
        Ok(Ok(_stream)) => {
            trace!("{target}:{port} is open");
            Ok(PortStatus::Open)
        }
        Ok(Err(e)) => classify(&e),
        Err(_elapsed) => Ok(PortStatus::Closed),
    }
}

/// Opens a socket, waiting out descriptor exhaustion caused by other users
/// of the process.
async fn new_socket() -> Result<TcpSocket, CollaboratorError> {
    let give_up = Instant::now() + DESCRIPTOR_WAIT;
    let mut logged = false;
    loop {
        match TcpSocket::new_v4() {
            Ok(socket) => return Ok(socket),
            Err(e) if out_of_descriptors(&e) && Instant::now() < give_up => {
                if !logged {
                    debug!("out of file descriptors, waiting for sockets to close");
                    logged = true;
                }
                sleep(DESCRIPTOR_RETRY).await;
            }
            Err(e) => return Err(CollaboratorError::from_io(&e, "creating socket")),
        }
    }
}

fn classify(err: &io::Error) -> Result<PortStatus, CollaboratorError> {
    match err.kind() {
        io::ErrorKind::HostUnreachable | io::ErrorKind::NetworkUnreachable => Ok(PortStatus::Unreachable),
        io::ErrorKind::PermissionDenied => Err(CollaboratorError::from_io(err, "connecting")),
        _ => Ok(PortStatus::Closed),
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
