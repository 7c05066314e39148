pub mod discover;
pub mod interfaces;
pub mod scan;

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use netsweep_common::network::ports::PortSet;

#[derive(Parser)]
#[command(name = "netsweep")]
#[command(version, about = "ARP host discovery and TCP port probing for a local subnet.")]
pub struct CommandLine {
    #[command(subcommand)]
    pub command: Commands,

    /// Less output; repeat for even less
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub quiet: u8,

    /// Skip the start-up banner
    #[arg(long, global = true)]
    pub no_banner: bool,

    /// Show debug logs
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List interfaces a sweep can run on
    #[command(alias = "i")]
    Interfaces,
    /// Find live hosts in a subnet via ARP
    #[command(alias = "d")]
    Discover(TargetArgs),
    /// Discover hosts, then probe their TCP ports
    #[command(alias = "s")]
    Scan(ScanArgs),
}

#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
    /// Interface to sweep from, e.g. eth0
    pub interface: String,
    /// Source IPv4 address used in ARP requests
    pub source: String,
    /// Subnet in CIDR notation, e.g. 192.168.1.0/24
    pub subnet: String,
}

#[derive(Args, Debug, Clone)]
pub struct ScanArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Ports to probe: "common", "all" or a list like 22,80,8000-8100
    #[arg(short, long, default_value = "common")]
    pub ports: PortSet,

    /// Write the final inventory to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Report format used with --output
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Json)]
    pub format: ReportFormat,

    /// Hosts probed at the same time
    #[arg(long, default_value_t = 32)]
    pub max_probes: usize,

    /// Give up on a host after this many seconds [default: long enough for
    /// the chosen ports, at least 120]
    #[arg(long)]
    pub probe_timeout: Option<u64>,

    /// Per-port connect timeout in milliseconds
    #[arg(long, default_value_t = 3000)]
    pub connect_timeout: u64,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Json,
    Csv,
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
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
