//! # Port Probing
//!
//! Concrete [`PortProber`](netsweep_common::scanning::PortProber)
//! implementations.

mod tcp;

pub use tcp::{ProberConfig, TcpConnectProber};
