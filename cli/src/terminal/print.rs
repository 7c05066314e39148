use colored::*;
use netsweep_common::network::host::{HostRecord, ProbeState};
use tracing::info;
use unicode_width::UnicodeWidthStr;

use super::colors;
use super::format::{self, Detail};
use super::logging::PRINT_TARGET;

pub const LINE_WIDTH: usize = 64;
const DETAIL_KEY_WIDTH: usize = 7;

#[macro_export]
macro_rules! mprint {
    () => {
        $crate::terminal::print::print("");
    };
    ($msg:expr) => {
        $crate::terminal::print::print($msg);
    };
}

pub fn print(msg: &str) {
    info!(target: PRINT_TARGET, raw_msg = msg);
}

/// Fill needed left and right of a title `width` columns wide.
fn padding(width: usize) -> (usize, usize) {
    let total = LINE_WIDTH.saturating_sub(width);
    (total / 2, total - total / 2)
}

pub fn banner(no_banner: bool, q_level: u8) {
    if no_banner || q_level > 0 {
        return;
    }
    let title = format!("⟦ NETSWEEP v{} ⟧", env!("CARGO_PKG_VERSION"));
    let (left, right) = padding(title.width());
    print(&format!(
        "{}{}{}",
        "═".repeat(left).bright_black(),
        title.bright_green().bold(),
        "═".repeat(right).bright_black()
    ));
}

/// Opens a section of output, e.g. `──⟦ PORT SCAN ⟧──`.
pub fn section(title: &str, q_level: u8) {
    if q_level > 0 {
        return;
    }
    let title = format!("⟦ {} ⟧", title.to_uppercase());
    let (left, right) = padding(title.width());
    print(&format!(
        "{}{}{}",
        "─".repeat(left).bright_black(),
        title.bright_green(),
        "─".repeat(right).bright_black()
    ));
}

pub fn rule() {
    print(&"═".repeat(LINE_WIDTH).color(colors::SEPARATOR).to_string());
}

/// `msg` may already carry ANSI colors.
pub fn centered(msg: &str) {
    let (left, _) = padding(console::measure_text_width(msg));
    print(&format!("{}{msg}", " ".repeat(left)));
}

/// Key/value rows with keys dotted out to a shared width.
pub fn settings(rows: &[(&str, String)]) {
    let width = rows.iter().map(|(key, _)| key.width()).max().unwrap_or(0);
    for (key, value) in rows {
        let dots = ".".repeat(width + 1 - key.width());
        print(&format!(
            "{} {}{}{} {}",
            ">".color(colors::SEPARATOR),
            key.color(colors::PRIMARY),
            dots.color(colors::SEPARATOR),
            ":".color(colors::SEPARATOR),
            value.color(colors::TEXT_DEFAULT)
        ));
    }
}

fn tree_lines(idx: usize, title: &str, details: &[Detail]) -> Vec<String> {
    let mut lines = Vec::with_capacity(details.len() + 1);
    lines.push(format!(
        "{}{}{} {}",
        "[".color(colors::SEPARATOR),
        idx.to_string().color(colors::ACCENT),
        "]".color(colors::SEPARATOR),
        title
    ));
    for (i, (key, value)) in details.iter().enumerate() {
        let branch = if i + 1 == details.len() { "└─" } else { "├─" };
        let dots = ".".repeat(DETAIL_KEY_WIDTH.saturating_sub(key.width()));
        lines.push(format!(
            " {} {}{}{} {}",
            branch.bright_black(),
            key.color(colors::TEXT_DEFAULT),
            dots.color(colors::SEPARATOR),
            ":".color(colors::SEPARATOR),
            value
        ));
    }
    lines
}

pub fn tree(idx: usize, title: &str, details: &[Detail]) {
    for line in tree_lines(idx, title, details) {
        print(&line);
    }
}

fn state_badge(state: ProbeState) -> ColoredString {
    let label = format!("({state})");
    match state {
        ProbeState::ProbeComplete => label.color(colors::PORT_OPEN),
        ProbeState::ProbeFailed => label.color(colors::ERROR),
        ProbeState::ProbeInFlight => label.color(colors::ACCENT),
        ProbeState::NotProbed => label.color(colors::SEPARATOR),
    }
}

/// One host as a tree. With ports, the title also shows how its probe ended.
pub fn host_tree(idx: usize, host: &HostRecord, with_ports: bool) {
    let address = host.address.to_string().color(colors::PRIMARY);
    let title = if with_ports {
        format!("{address} {}", state_badge(host.probe_state))
    } else {
        address.to_string()
    };
    tree(idx, &title, &format::host_details(host, with_ports));
}

pub fn no_results() {
    centered(&"no host answered the sweep".color(colors::ERROR).bold().to_string());
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
