use std::time::{Duration, Instant};

use anyhow::Context;
use colored::*;
use tracing::{Span, info_span, warn};
use tracing_indicatif::span_ext::IndicatifSpanExt;

use netsweep_common::config::Config;
use netsweep_common::network::host::HostRecord;
use netsweep_common::report::ReportSink;
use netsweep_common::success;
use netsweep_core::probe::ProberConfig;
use netsweep_core::report::{CsvReport, JsonReport};
use netsweep_core::session::{Coordinator, CoordinatorConfig, InventoryEvent, ProbeSummary};

use super::discover::{self, no_hosts_found, print_hosts};
use super::{ReportFormat, ScanArgs};
use crate::mprint;
use crate::terminal::{colors, print, spinner};

const SWEEP_SLACK: Duration = Duration::from_secs(5);

pub async fn scan(args: ScanArgs, cfg: &Config) -> anyhow::Result<()> {
    discover::warn_if_unprivileged();
    let prober = prober_config(&args);
    let config = coordinator_config(&args, &prober);
    print_settings(&args, &config, &prober, cfg);

    let coordinator = netsweep_core::system_coordinator(config, prober);
    let start_time: Instant = Instant::now();

    let snapshot = discover::run_discovery(&coordinator, &args.target).await?;
    if snapshot.is_empty() {
        no_hosts_found(cfg);
        return Ok(());
    }

    let summary = probe_hosts(&coordinator, snapshot.len()).await;

    let snapshot = coordinator.snapshot();
    let hosts: Vec<&HostRecord> = snapshot.hosts().collect();
    print::section("Port Scan", cfg.quiet);
    print_hosts(&hosts, true, cfg);
    print_summary(&hosts, &summary, start_time.elapsed(), cfg);

    if let Some(path) = &args.output {
        let sink: Box<dyn ReportSink> = match args.format {
            ReportFormat::Json => Box::new(JsonReport::new(path)),
            ReportFormat::Csv => Box::new(CsvReport::new(path)),
        };
        let written = coordinator
            .export_to(sink.as_ref())
            .with_context(|| format!("could not write report to {}", path.display()))?;
        success!("Wrote {written} hosts to {}", path.display());
    }

    Ok(())
}

/// Without `--probe-timeout` the per-host deadline grows to fit a sweep of
/// silent ports. An explicit deadline is kept even when it is too short.
fn coordinator_config(args: &ScanArgs, prober: &ProberConfig) -> CoordinatorConfig {
    let needed = prober.worst_case_sweep(args.ports.len(), args.max_probes) + SWEEP_SLACK;
    let probe_timeout = match args.probe_timeout {
        Some(secs) => {
            let chosen = Duration::from_secs(secs);
            if chosen < needed {
                warn!(
                    "--probe-timeout {secs}s is shorter than the {}s a firewalled host can take, \
                     such hosts will fail and lose their open ports",
                    needed.as_secs()
                );
            }
            chosen
        }
        None => needed.max(CoordinatorConfig::default().probe_timeout),
    };

    CoordinatorConfig {
        max_concurrent_probes: args.max_probes,
        probe_timeout,
        ports: args.ports.clone(),
    }
}

fn prober_config(args: &ScanArgs) -> ProberConfig {
    ProberConfig {
        connect_timeout: Duration::from_millis(args.connect_timeout),
        ..ProberConfig::default()
    }
}

/// Probes every discovered host with a progress bar; Ctrl-C cancels.
async fn probe_hosts(coordinator: &Coordinator, total: usize) -> ProbeSummary {
    let span: Span = info_span!("probing", indicatif.pb_show = true);
    span.pb_set_style(&spinner::bar_style());
    span.pb_set_length(total as u64);
    let _guard = span.enter();

    let mut events = coordinator.subscribe();
    let sweep = coordinator.probe_all_hosts();
    tokio::pin!(sweep);

    let mut open: usize = 0;
    let summary = loop {
        tokio::select! {
            summary = &mut sweep => break summary,
            Some(event) = events.recv() => {
                if let InventoryEvent::ProbeStateChanged { state, .. } = event {
                    if state.is_settled() {
                        span.pb_inc(1);
                        open = count_open(coordinator);
                        spinner::report_probe_progress(&span, open);
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                warn!("interrupted, cancelling outstanding probes");
                coordinator.cancel();
            }
        }
    };

    coordinator.unsubscribe(events.id());
    tracing::debug!(open, "probing finished");
    summary
}

fn count_open(coordinator: &Coordinator) -> usize {
    coordinator.snapshot().hosts().map(|host| host.open_ports.len()).sum()
}

fn print_settings(args: &ScanArgs, config: &CoordinatorConfig, prober: &ProberConfig, cfg: &Config) {
    if cfg.quiet > 0 {
        return;
    }
    print::settings(&[
        ("Interface", args.target.interface.clone()),
        ("Subnet", args.target.subnet.clone()),
        ("Ports", args.ports.to_string()),
        ("Hosts", format!("{} at once", config.max_concurrent_probes)),
        ("Sockets", format!("{} at once", prober.socket_limit())),
        ("Timeout", format!("{}s per host", config.probe_timeout.as_secs())),
    ]);
}

fn print_summary(hosts: &[&HostRecord], summary: &ProbeSummary, total_time: Duration, cfg: &Config) {
    let open_ports: usize = hosts.iter().map(|host| host.open_ports.len()).sum();
    let open: ColoredString = format!("{open_ports} open ports").bold().green();
    let scanned: ColoredString = format!("{} hosts", hosts.len()).bold().green();
    let total_time: ColoredString = format!("{:.2}s", total_time.as_secs_f64()).bold().yellow();
    let output: &ColoredString =
        &format!("Scan Complete: {open} on {scanned} in {total_time}").color(colors::TEXT_DEFAULT);

    if summary.failed > 0 {
        warn!("{} of {} probes failed", summary.failed, summary.dispatched);
    }

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

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
