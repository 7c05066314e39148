#![cfg(all(test, target_os = "linux"))]
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use netsweep_common::network::host::{HostFound, ProbeState};
use netsweep_common::network::ports::PortSet;
use netsweep_core::probe::{ProberConfig, TcpConnectProber};
use netsweep_core::session::{Coordinator, CoordinatorConfig, DiscoveryStatus};
use pnet::datalink;
use tokio::net::TcpListener;

use crate::fakes::{FakeDiscovery, FakeInterfaces, mac};

const HOSTS: u8 = 30;
const SOCKETS: usize = 8;

fn loopback_name() -> Option<String> {
    datalink::interfaces()
        .into_iter()
        .find(|intf| intf.is_loopback())
        .map(|intf| intf.name)
}

/// Thirty loopback hosts probed with the default host concurrency share
/// one small socket pool. Every host completes and the pool bound holds.
#[tokio::test]
async fn many_hosts_stay_within_the_socket_pool() {
    let Some(lo) = loopback_name() else {
        return;
    };
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
    let open = listener.local_addr().unwrap().port();

    let hosts: Vec<HostFound> = (1..=HOSTS)
        .map(|last| HostFound::new(Ipv4Addr::new(127, 0, 0, last), mac(last)))
        .collect();
    let prober = Arc::new(TcpConnectProber::with_config(ProberConfig {
        connect_timeout: Duration::from_secs(1),
        concurrency: SOCKETS,
        shuffle: true,
    }));
    let config = CoordinatorConfig {
        probe_timeout: Duration::from_secs(30),
        ports: (1..=40).chain([open]).collect::<PortSet>(),
        ..CoordinatorConfig::default()
    };
    let coordinator = Coordinator::new(
        config,
        Arc::new(FakeDiscovery::new(hosts)),
        prober.clone(),
        Arc::new(FakeInterfaces(vec![lo.clone()])),
    );

    coordinator.start_discovery(&lo, "127.0.0.1", "127.0.0.0/24").unwrap();
    assert_eq!(
        coordinator.wait_for_discovery().await,
        DiscoveryStatus::Finished { hosts: HOSTS as usize }
    );

    let summary = coordinator.probe_all_hosts().await;
    assert_eq!(summary.completed, HOSTS as usize);
    assert_eq!(summary.failed, 0);

    let snapshot = coordinator.snapshot();
    for host in snapshot.hosts() {
        assert_eq!(host.probe_state, ProbeState::ProbeComplete, "{}", host.address);
        assert!(host.last_error.is_none());
    }
    assert!(snapshot.get(Ipv4Addr::LOCALHOST).unwrap().open_ports.contains(&open));
    assert!(prober.peak_sockets() <= SOCKETS);
}
