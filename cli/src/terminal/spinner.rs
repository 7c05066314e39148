use std::time::Duration;

use colored::*;
use indicatif::ProgressStyle;
use tracing::Span;
use tracing_indicatif::span_ext::IndicatifSpanExt;

pub const TICK_INTERVAL: Duration = Duration::from_millis(100);

const TICKS: &[&str] = &[
    "▁▁▁▁▁",
    "▁▂▂▂▁",
    "▁▄▂▄▁",
    "▂▄▆▄▂",
    "▄▆█▆▄",
    "▂▄▆▄▂",
    "▁▄▂▄▁",
    "▁▂▂▂▁",
];

/// Style for spans without a known length.
pub fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.blue} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(TICKS)
}

/// Style for spans counting towards a known total.
pub fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.blue} {msg} [{bar:24.green/white}] {pos}/{len}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .tick_strings(TICKS)
        .progress_chars("━╸ ")
}

pub fn report_discovery_progress(span: &Span, count: usize) {
    span.pb_set_message(&format!(
        "Identified {} hosts so far...",
        count.to_string().green().bold()
    ));
}

pub fn report_probe_progress(span: &Span, open: usize) {
    span.pb_set_message(&format!("Probing ports, {} open so far", open.to_string().green().bold()));
}
