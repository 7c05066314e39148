#![cfg(test)]
use std::collections::BTreeSet;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use netsweep_common::error::{CollaboratorError, ScanError};
use netsweep_common::network::host::{HostFound, ProbeState};
use netsweep_core::session::{CoordinatorConfig, ProbeDispatch, ProbeHandle, ProbeOutcome};

use crate::fakes::{self, FakeDiscovery, FakeProber, IFACE, SOURCE, Step, found, ip, mac};

fn dispatched(dispatch: ProbeDispatch) -> ProbeHandle {
    match dispatch {
        ProbeDispatch::Dispatched(handle) => handle,
        ProbeDispatch::AlreadyInFlight => panic!("expected a new probe"),
    }
}

fn ports(list: &[u16]) -> BTreeSet<u16> {
    list.iter().copied().collect()
}

#[tokio::test]
async fn probe_results_accumulate_per_host() -> anyhow::Result<()> {
    let discovery = Arc::new(FakeDiscovery::new(vec![found(5), found(9)]));
    let prober = Arc::new(
        FakeProber::new()
            .script(ip(5), Step::Ports(vec![80, 443]))
            .script(ip(5), Step::Ports(vec![22]))
            .script(ip(9), Step::Ports(vec![])),
    );
    let coordinator = fakes::coordinator(discovery, prober.clone());
    fakes::discover(&coordinator).await;

    let summary = coordinator.probe_all_hosts().await;
    assert_eq!(summary.requested, 2);
    assert_eq!(summary.dispatched, 2);
    assert_eq!(summary.completed, 2);

    let snapshot = coordinator.snapshot();
    let first = snapshot.get(ip(5)).unwrap();
    assert_eq!(first.open_ports, ports(&[80, 443]));
    assert_eq!(first.probe_state, ProbeState::ProbeComplete);
    let second = snapshot.get(ip(9)).unwrap();
    assert!(second.open_ports.is_empty());
    assert_eq!(second.probe_state, ProbeState::ProbeComplete);

    let outcome = dispatched(coordinator.probe_host(ip(5))?).wait().await;
    assert_eq!(
        outcome,
        ProbeOutcome::Completed {
            address: ip(5),
            open_ports: ports(&[22, 80, 443]),
            new_ports: 1,
        }
    );

    let host = coordinator.snapshot().get(ip(5)).cloned().unwrap();
    assert_eq!(host.open_ports, ports(&[22, 80, 443]));
    assert_eq!(host.probe_count, 2);
    assert_eq!(prober.calls(), 3);
    Ok(())
}

#[tokio::test]
async fn open_ports_never_shrink() -> anyhow::Result<()> {
    let rounds: [&[u16]; 4] = [&[443], &[80], &[], &[22, 443]];
    let mut prober = FakeProber::new();
    for round in rounds {
        prober = prober.script(ip(5), Step::Ports(round.to_vec()));
    }
    let coordinator = fakes::coordinator(Arc::new(FakeDiscovery::new(vec![found(5)])), Arc::new(prober));
    fakes::discover(&coordinator).await;

    let mut seen = BTreeSet::new();
    for round in rounds {
        dispatched(coordinator.probe_host(ip(5))?).wait().await;
        seen.extend(round.iter().copied());
        let host = coordinator.snapshot().get(ip(5)).cloned().unwrap();
        assert_eq!(host.open_ports, seen);
    }
    Ok(())
}

#[tokio::test]
async fn probing_an_unknown_host_fails() {
    let coordinator = fakes::coordinator(Arc::new(FakeDiscovery::new(vec![found(5)])), Arc::new(FakeProber::new()));
    fakes::discover(&coordinator).await;

    let err = coordinator.probe_host(ip(77)).unwrap_err();

    assert!(matches!(err, ScanError::UnknownHost(addr) if addr == ip(77)));
    assert!(coordinator.snapshot().get(ip(77)).is_none());
}

#[tokio::test]
async fn second_probe_while_in_flight_is_a_no_op() -> anyhow::Result<()> {
    let prober = Arc::new(
        FakeProber::new()
            .with_delay(Duration::from_millis(150))
            .script(ip(5), Step::Ports(vec![80])),
    );
    let coordinator = fakes::coordinator(Arc::new(FakeDiscovery::new(vec![found(5)])), prober.clone());
    fakes::discover(&coordinator).await;

    let handle = dispatched(coordinator.probe_host(ip(5))?);
    assert_eq!(
        coordinator.snapshot().get(ip(5)).map(|h| h.probe_state),
        Some(ProbeState::ProbeInFlight)
    );
    assert!(matches!(coordinator.probe_host(ip(5))?, ProbeDispatch::AlreadyInFlight));

    handle.wait().await;
    assert_eq!(prober.calls(), 1);
    assert_eq!(coordinator.snapshot().get(ip(5)).map(|h| h.probe_count), Some(1));
    Ok(())
}

#[tokio::test]
async fn failed_probe_keeps_known_ports() -> anyhow::Result<()> {
    let unreachable = CollaboratorError::HostUnreachable(ip(5));
    let prober = Arc::new(
        FakeProber::new()
            .script(ip(5), Step::Ports(vec![80]))
            .script(ip(5), Step::Fail(unreachable.clone()))
            .script(ip(5), Step::Ports(vec![])),
    );
    let coordinator = fakes::coordinator(Arc::new(FakeDiscovery::new(vec![found(5)])), prober);
    fakes::discover(&coordinator).await;

    dispatched(coordinator.probe_host(ip(5))?).wait().await;
    let outcome = dispatched(coordinator.probe_host(ip(5))?).wait().await;

    assert_eq!(
        outcome,
        ProbeOutcome::Failed {
            address: ip(5),
            error: unreachable.clone(),
        }
    );
    let host = coordinator.snapshot().get(ip(5)).cloned().unwrap();
    assert_eq!(host.probe_state, ProbeState::ProbeFailed);
    assert_eq!(host.open_ports, ports(&[80]));
    assert_eq!(host.last_error, Some(unreachable));

    dispatched(coordinator.probe_host(ip(5))?).wait().await;
    let host = coordinator.snapshot().get(ip(5)).cloned().unwrap();
    assert_eq!(host.probe_state, ProbeState::ProbeComplete);
    assert_eq!(host.last_error, None);
    Ok(())
}

#[tokio::test]
async fn hung_prober_times_out() -> anyhow::Result<()> {
    let limit = Duration::from_millis(100);
    let config = CoordinatorConfig {
        probe_timeout: limit,
        ..fakes::config()
    };
    let prober = Arc::new(FakeProber::new().script(ip(5), Step::Hang));
    let coordinator = fakes::coordinator_with(config, Arc::new(FakeDiscovery::new(vec![found(5)])), prober.clone());
    fakes::discover(&coordinator).await;

    let outcome = dispatched(coordinator.probe_host(ip(5))?).wait().await;

    assert_eq!(
        outcome,
        ProbeOutcome::Failed {
            address: ip(5),
            error: CollaboratorError::Timeout(limit),
        }
    );
    let host = coordinator.snapshot().get(ip(5)).cloned().unwrap();
    assert_eq!(host.probe_state, ProbeState::ProbeFailed);
    assert_eq!(host.last_error, Some(CollaboratorError::Timeout(limit)));
    Ok(())
}

#[tokio::test]
async fn panicking_prober_fails_only_its_host() -> anyhow::Result<()> {
    let prober = Arc::new(
        FakeProber::new()
            .script(ip(5), Step::Panic)
            .script(ip(9), Step::Ports(vec![8080])),
    );
    let coordinator = fakes::coordinator(Arc::new(FakeDiscovery::new(vec![found(5), found(9)])), prober);
    fakes::discover(&coordinator).await;

    let summary = coordinator.probe_all_hosts().await;

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.completed, 1);
    let snapshot = coordinator.snapshot();
    let broken = snapshot.get(ip(5)).unwrap();
    assert_eq!(broken.probe_state, ProbeState::ProbeFailed);
    assert!(matches!(broken.last_error, Some(CollaboratorError::Aborted(_))));
    assert_eq!(snapshot.get(ip(9)).map(|h| h.open_ports.clone()), Some(ports(&[8080])));
    Ok(())
}

#[tokio::test]
async fn concurrent_probes_respect_the_cap() {
    let hosts: Vec<HostFound> = (10..20).map(found).collect();
    let prober = Arc::new(FakeProber::new().with_delay(Duration::from_millis(40)));
    let config = CoordinatorConfig {
        max_concurrent_probes: 2,
        ..fakes::config()
    };
    let coordinator = fakes::coordinator_with(config, Arc::new(FakeDiscovery::new(hosts)), prober.clone());
    fakes::discover(&coordinator).await;

    let summary = coordinator.probe_all_hosts().await;

    assert_eq!(summary.completed, 10);
    assert_eq!(prober.calls(), 10);
    assert!(prober.peak() <= 2, "peak concurrency was {}", prober.peak());
    assert!(
        coordinator
            .snapshot()
            .hosts()
            .all(|h| h.probe_state == ProbeState::ProbeComplete)
    );
}

#[tokio::test]
async fn probe_all_skips_hosts_already_in_flight() -> anyhow::Result<()> {
    let prober = Arc::new(FakeProber::new().with_delay(Duration::from_millis(100)));
    let coordinator = fakes::coordinator(Arc::new(FakeDiscovery::new(vec![found(5), found(9)])), prober.clone());
    fakes::discover(&coordinator).await;

    let handle = dispatched(coordinator.probe_host(ip(5))?);
    let summary = coordinator.probe_all_hosts().await;
    handle.wait().await;

    assert_eq!(summary.requested, 2);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.dispatched, 1);
    assert_eq!(prober.calls(), 2);
    Ok(())
}

#[tokio::test]
async fn new_session_discards_old_probe_results() -> anyhow::Result<()> {
    let discovery = Arc::new(FakeDiscovery::new(vec![
        found(5),
        HostFound::new(Ipv4Addr::new(10, 0, 1, 7), mac(7)),
    ]));
    let prober = Arc::new(
        FakeProber::new()
            .with_delay(Duration::from_millis(150))
            .script(ip(5), Step::Ports(vec![80])),
    );
    let coordinator = fakes::coordinator(discovery, prober);
    fakes::discover(&coordinator).await;

    let stale = dispatched(coordinator.probe_host(ip(5))?);
    coordinator.start_discovery(IFACE, "10.0.1.2", "10.0.1.0/24")?;
    coordinator.wait_for_discovery().await;

    assert_eq!(stale.wait().await, ProbeOutcome::Discarded { address: ip(5) });
    let snapshot = coordinator.snapshot();
    assert!(snapshot.get(ip(5)).is_none());
    assert!(snapshot.hosts().all(|h| h.open_ports.is_empty()));
    Ok(())
}

#[tokio::test]
async fn cancel_settles_in_flight_probes() -> anyhow::Result<()> {
    let prober = Arc::new(FakeProber::new().script(ip(5), Step::Hang));
    let coordinator = fakes::coordinator(Arc::new(FakeDiscovery::new(vec![found(5)])), prober);
    fakes::discover(&coordinator).await;

    let handle = dispatched(coordinator.probe_host(ip(5))?);
    coordinator.cancel();

    assert_eq!(handle.wait().await, ProbeOutcome::Discarded { address: ip(5) });
    let host = coordinator.snapshot().get(ip(5)).cloned().unwrap();
    assert_eq!(host.probe_state, ProbeState::ProbeFailed);
    assert!(matches!(host.last_error, Some(CollaboratorError::Aborted(_))));
    Ok(())
}

#[tokio::test]
async fn probes_use_the_discovery_interface() -> anyhow::Result<()> {
    let prober = Arc::new(FakeProber::new());
    let coordinator = fakes::coordinator(Arc::new(FakeDiscovery::new(vec![found(5)])), prober.clone());
    coordinator.start_discovery("wlan0", SOURCE, "10.0.0.0/24")?;
    coordinator.wait_for_discovery().await;

    dispatched(coordinator.probe_host(ip(5))?).wait().await;

    assert_eq!(prober.interfaces(), vec!["wlan0".to_string()]);
    assert_ne!(prober.interfaces(), vec![IFACE.to_string()]);
    Ok(())
}
