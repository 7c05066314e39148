use anyhow::Context;
use netsweep_common::config::Config;
use netsweep_core::system::SystemInterfaces;

use crate::mprint;
use crate::terminal::{network_fmt, print};

pub fn interfaces(cfg: &Config) -> anyhow::Result<()> {
    let interfaces = SystemInterfaces
        .detailed()
        .context("could not list network interfaces")?;

    for (idx, interface) in interfaces.iter().enumerate() {
        if cfg.quiet > 1 {
            print::print(&interface.name);
            continue;
        }
        network_fmt::print_interface(interface, idx);
        if idx + 1 != interfaces.len() {
            mprint!();
        }
    }
    Ok(())
}
