#![cfg(test)]
use std::sync::Arc;
use std::time::Duration;

use netsweep_common::network::host::ProbeState;
use netsweep_core::session::{InventoryEvent, ProbeDispatch, Upsert};

use crate::fakes::{self, FakeDiscovery, FakeProber, Step, found, ip};

#[tokio::test]
async fn subscriber_sees_changes_in_order() -> anyhow::Result<()> {
    let prober = Arc::new(FakeProber::new().script(ip(5), Step::Ports(vec![80])));
    let coordinator = fakes::coordinator(Arc::new(FakeDiscovery::new(vec![found(5), found(9)])), prober);
    let mut events = coordinator.subscribe();

    fakes::discover(&coordinator).await;
    let session = coordinator.snapshot().session;
    if let ProbeDispatch::Dispatched(handle) = coordinator.probe_host(ip(5))? {
        handle.wait().await;
    }

    let expected = vec![
        InventoryEvent::InventoryReset { session },
        InventoryEvent::HostUpserted {
            session,
            address: ip(5),
            upsert: Upsert::Inserted,
        },
        InventoryEvent::HostUpserted {
            session,
            address: ip(9),
            upsert: Upsert::Inserted,
        },
        InventoryEvent::DiscoveryFinished { session, hosts: 2 },
        InventoryEvent::ProbeStateChanged {
            session,
            address: ip(5),
            state: ProbeState::ProbeInFlight,
            error: None,
        },
        InventoryEvent::ProbeStateChanged {
            session,
            address: ip(5),
            state: ProbeState::ProbeComplete,
            error: None,
        },
    ];
    assert_eq!(events.drain(), expected);
    Ok(())
}

#[tokio::test]
async fn snapshot_and_subscription_do_not_overlap() -> anyhow::Result<()> {
    let coordinator = fakes::coordinator(Arc::new(FakeDiscovery::new(vec![found(5)])), Arc::new(FakeProber::new()));
    fakes::discover(&coordinator).await;

    let (snapshot, mut events) = coordinator.subscribe_with_snapshot();
    assert_eq!(snapshot.len(), 1);
    assert!(events.try_recv().is_none());

    if let ProbeDispatch::Dispatched(handle) = coordinator.probe_host(ip(5))? {
        handle.wait().await;
    }

    let seen = events.drain();
    assert_eq!(seen.len(), 2);
    assert!(coordinator.snapshot().generation >= snapshot.generation + 2);
    Ok(())
}

#[tokio::test]
async fn unsubscribed_observer_gets_nothing_more() {
    let coordinator = fakes::coordinator(Arc::new(FakeDiscovery::new(vec![found(5)])), Arc::new(FakeProber::new()));
    let mut events = coordinator.subscribe();

    assert!(coordinator.unsubscribe(events.id()));
    assert!(!coordinator.unsubscribe(events.id()));
    fakes::discover(&coordinator).await;

    assert!(events.recv().await.is_none());
}

#[tokio::test]
async fn dropped_observer_does_not_block_others() {
    let coordinator = fakes::coordinator(Arc::new(FakeDiscovery::new(vec![found(5)])), Arc::new(FakeProber::new()));
    let dropped = coordinator.subscribe();
    let mut kept = coordinator.subscribe();
    drop(dropped);

    fakes::discover(&coordinator).await;

    assert_eq!(kept.drain().len(), 3);
}

#[tokio::test]
async fn events_carry_the_session_they_belong_to() {
    let coordinator = fakes::coordinator(
        Arc::new(FakeDiscovery::new(vec![found(5)]).with_delay(Duration::from_millis(10))),
        Arc::new(FakeProber::new()),
    );
    let mut events = coordinator.subscribe();

    fakes::discover(&coordinator).await;
    let first = coordinator.snapshot().session;
    fakes::discover(&coordinator).await;
    let second = coordinator.snapshot().session;

    let sessions: Vec<_> = events.drain().iter().map(InventoryEvent::session).collect();
    let switch = sessions.iter().position(|s| *s == second).unwrap();
    assert!(sessions[..switch].iter().all(|s| *s == first));
    assert!(sessions[switch..].iter().all(|s| *s == second));
}

#[tokio::test]
async fn generation_only_moves_forward() -> anyhow::Result<()> {
    let coordinator = fakes::coordinator(Arc::new(FakeDiscovery::new(vec![found(5), found(9)])), Arc::new(FakeProber::new()));
    let mut last = coordinator.snapshot().generation;

    fakes::discover(&coordinator).await;
    let after_discovery = coordinator.snapshot().generation;
    assert!(after_discovery > last);
    last = after_discovery;

    coordinator.probe_all_hosts().await;
    assert!(coordinator.snapshot().generation > last);
    Ok(())
}
