use std::time::{Duration, Instant};

use anyhow::{Context, bail};
use colored::*;
use tracing::{Instrument, info_span, warn};
use tracing_indicatif::span_ext::IndicatifSpanExt;

use netsweep_common::config::Config;
use netsweep_common::network::host::HostRecord;
use netsweep_common::success;
use netsweep_core::probe::ProberConfig;
use netsweep_core::session::{Coordinator, CoordinatorConfig, InventoryEvent, Snapshot, Upsert};

use super::TargetArgs;
use crate::mprint;
use crate::terminal::{colors, print, spinner};

pub async fn discover(target: TargetArgs, cfg: &Config) -> anyhow::Result<()> {
    warn_if_unprivileged();
    let coordinator = netsweep_core::system_coordinator(CoordinatorConfig::default(), ProberConfig::default());

    let start_time: Instant = Instant::now();
    let snapshot = run_discovery(&coordinator, &target).await?;

    let hosts: Vec<&HostRecord> = snapshot.hosts().collect();
    discovery_ends(&hosts, start_time.elapsed(), cfg);
    Ok(())
}

/// Raw Ethernet access needs root (or `CAP_NET_RAW`).
pub(crate) fn warn_if_unprivileged() {
    if !is_root::is_root() {
        warn!("not running as root, opening a raw socket will probably fail");
    }
}

/// Runs a discovery sweep to completion while showing a spinner.
/// Ctrl-C cancels the session and keeps whatever was found.
pub(crate) async fn run_discovery(coordinator: &Coordinator, target: &TargetArgs) -> anyhow::Result<Snapshot> {
    let span = info_span!("discovery", indicatif.pb_show = true);
    span.pb_set_message("Sweeping subnet...");

    let mut events = coordinator.subscribe();
    coordinator
        .start_discovery(&target.interface, &target.source, &target.subnet)
        .context("could not start discovery")?;

    let progress = async {
        let mut found: usize = 0;
        while let Some(event) = events.recv().await {
            match event {
                InventoryEvent::HostUpserted {
                    upsert: Upsert::Inserted,
                    ..
                } => {
                    found += 1;
                    spinner::report_discovery_progress(&tracing::Span::current(), found);
                }
                InventoryEvent::DiscoveryFinished { .. } => return Ok(()),
                InventoryEvent::DiscoveryFailed { error, .. } => return Err(error),
                _ => {}
            }
        }
        Ok(())
    }
    .instrument(span);

    let outcome = tokio::select! {
        outcome = progress => outcome,
        _ = tokio::signal::ctrl_c() => {
            warn!("interrupted, stopping discovery");
            coordinator.cancel();
            Ok(())
        }
    };
    coordinator.unsubscribe(events.id());

    if let Err(error) = outcome {
        let snapshot = coordinator.snapshot();
        if snapshot.is_empty() {
            bail!("discovery failed: {error}");
        }
        warn!("discovery failed after {} hosts: {error}", snapshot.len());
    }
    Ok(coordinator.snapshot())
}

fn discovery_ends(hosts: &[&HostRecord], total_time: Duration, cfg: &Config) {
    if hosts.is_empty() {
        no_hosts_found(cfg);
        return;
    }

    if cfg.quiet > 0 {
        mprint!();
    }

    print::section("Network Discovery", cfg.quiet);
    print_hosts(hosts, false, cfg);
    print_summary(hosts.len(), total_time, cfg);
}

pub(crate) fn no_hosts_found(cfg: &Config) {
    print::section("ZERO HOSTS DETECTED", cfg.quiet);
    print::no_results();
}

pub(crate) fn print_hosts(hosts: &[&HostRecord], with_ports: bool, cfg: &Config) {
    for (idx, host) in hosts.iter().enumerate() {
        match cfg.quiet {
            2 => {}
            _ => print::host_tree(idx, host, with_ports),
        }
        if cfg.quiet < 2 && idx + 1 != hosts.len() {
            mprint!();
        }
    }
}

fn print_summary(hosts_len: usize, total_time: Duration, cfg: &Config) {
    let active_hosts: ColoredString = format!("{hosts_len} active hosts").bold().green();
    let total_time: ColoredString = format!("{:.2}s", total_time.as_secs_f64()).bold().yellow();
    let output: &ColoredString =
        &format!("Discovery Complete: {active_hosts} identified in {total_time}").color(colors::TEXT_DEFAULT);

    match cfg.quiet {
        0 => {
            print::rule();
            print::centered(&output.to_string());
        }
        _ => {
            mprint!();
            success!("{}", output)
        }
    }
}
