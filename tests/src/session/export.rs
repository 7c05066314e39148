#![cfg(test)]
use std::sync::Arc;

use netsweep_common::error::{PersistenceError, ScanError};
use netsweep_common::report::ReportPayload;
use netsweep_core::report::JsonReport;

use crate::fakes::{self, BrokenSink, FakeDiscovery, FakeProber, Step, found, ip};

#[tokio::test]
async fn export_follows_discovery_order_and_is_repeatable() {
    let prober = Arc::new(
        FakeProber::new()
            .script(ip(9), Step::Ports(vec![443, 22]))
            .script(ip(3), Step::Ports(vec![80])),
    );
    let coordinator = fakes::coordinator(
        Arc::new(FakeDiscovery::new(vec![found(9), found(3), found(5)])),
        prober,
    );
    fakes::discover(&coordinator).await;
    coordinator.probe_all_hosts().await;

    let first = serde_json::to_string(&coordinator.export_snapshot()).unwrap();
    let second = serde_json::to_string(&coordinator.export_snapshot()).unwrap();
    assert_eq!(first, second);

    let payload = coordinator.export_snapshot();
    let order: Vec<_> = payload.entries.iter().map(|e| e.address).collect();
    assert_eq!(order, vec![ip(9), ip(3), ip(5)]);
    assert_eq!(payload.entries[0].open_ports, vec![22, 443]);
    assert_eq!(payload.entries[0].link_address, "aa:bb:cc:dd:ee:09");
}

#[tokio::test]
async fn export_before_discovery_is_empty() {
    let coordinator = fakes::coordinator(Arc::new(FakeDiscovery::default()), Arc::new(FakeProber::new()));

    let payload = coordinator.export_snapshot();

    assert!(payload.is_empty());
    assert_eq!(serde_json::to_string(&payload).unwrap(), "[]");
}

#[tokio::test]
async fn export_to_file_round_trips() -> anyhow::Result<()> {
    let coordinator = fakes::coordinator(Arc::new(FakeDiscovery::new(vec![found(5), found(9)])), Arc::new(FakeProber::new()));
    fakes::discover(&coordinator).await;
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("hosts.json");

    let written = coordinator.export_to(&JsonReport::new(&path))?;

    assert_eq!(written, 2);
    let parsed: ReportPayload = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
    assert_eq!(parsed, coordinator.export_snapshot());
    Ok(())
}

#[tokio::test]
async fn failed_export_leaves_inventory_alone() {
    let coordinator = fakes::coordinator(Arc::new(FakeDiscovery::new(vec![found(5)])), Arc::new(FakeProber::new()));
    fakes::discover(&coordinator).await;
    let before = coordinator.snapshot().generation;

    let err = coordinator.export_to(&BrokenSink).unwrap_err();

    assert!(matches!(err, ScanError::Persistence(PersistenceError::Encode(_))));
    assert_eq!(coordinator.snapshot().generation, before);
    assert_eq!(coordinator.snapshot().len(), 1);
}
