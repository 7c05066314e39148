use anyhow::Context;
use pnet::packet::ethernet::{EtherType, EthernetPacket, MutableEthernetPacket};
use pnet::util::MacAddr;

pub fn make_header(
    buffer: &mut [u8],
    src_mac: MacAddr,
    dst_mac: MacAddr,
    et: EtherType,
) -> anyhow::Result<()> {
    let mut eth = MutableEthernetPacket::new(buffer)
        .context("buffer too small for an Ethernet header")?;

    eth.set_source(src_mac);
    eth.set_destination(dst_mac);
    eth.set_ethertype(et);

    Ok(())
}

pub fn get_packet_from_u8(bytes: &[u8]) -> anyhow::Result<EthernetPacket<'_>> {
    EthernetPacket::new(bytes)
        .with_context(|| format!("truncated Ethernet frame ({} bytes)", bytes.len()))
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
