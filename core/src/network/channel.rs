use std::io;
use std::time::Duration;

use pnet::datalink::{self, Channel, Config, DataLinkReceiver, DataLinkSender, NetworkInterface};
use tokio::sync::mpsc;
use tracing::debug;

const READ_TIMEOUT: Duration = Duration::from_millis(50);

/// Raw Ethernet access to one interface.
///
/// Frames are read on a dedicated OS thread and queued into `rx`. The thread
/// exits once `rx` is dropped.
pub struct EthernetHandle {
    pub tx: Box<dyn DataLinkSender>,
    pub rx: mpsc::UnboundedReceiver<Vec<u8>>,
}

pub fn start_capture(intf: &NetworkInterface) -> io::Result<EthernetHandle> {
    start_capture_with(intf, datalink::channel)
}

fn start_capture_with<F>(intf: &NetworkInterface, channel_opener: F) -> io::Result<EthernetHandle>
where
    F: FnOnce(&NetworkInterface, Config) -> io::Result<Channel>,
{
    let (tx, rx_socket) = open_eth_channel(intf, &get_config(), channel_opener)?;
    let (queue_tx, queue_rx) = mpsc::unbounded_channel();
    spawn_listener(rx_socket, queue_tx, intf.name.clone());
    Ok(EthernetHandle { tx, rx: queue_rx })
}

fn open_eth_channel<F>(
    intf: &NetworkInterface,
    cfg: &Config,
    channel_opener: F,
) -> io::Result<(Box<dyn DataLinkSender>, Box<dyn DataLinkReceiver>)>
where
    F: FnOnce(&NetworkInterface, Config) -> io::Result<Channel>,
{
    match channel_opener(intf, *cfg)? {
        Channel::Ethernet(tx, rx) => Ok((tx, rx)),
        _ => Err(io::Error::new(
            io::ErrorKind::Unsupported,
            format!("non-ethernet channel for {}", intf.name),
        )),
    }
}

fn spawn_listener(mut rx: Box<dyn DataLinkReceiver>, queue: mpsc::UnboundedSender<Vec<u8>>, name: String) {
    std::thread::spawn(move || {
        loop {
            match rx.next() {
                Ok(frame) => {
                    if queue.send(frame.to_vec()).is_err() {
                        break;
                    }
                }
                Err(e) if matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock) => {
                    if queue.is_closed() {
                        break;
                    }
                }
                Err(e) => {
                    debug!("capture on {name} stopped: {e}");
                    break;
                }
            }
        }
    });
}

fn get_config() -> Config {
    Config {
        read_timeout: Some(READ_TIMEOUT),
        ..Default::default()
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
