//! # Error Taxonomy
//!
//! Every failure the coordinator can report falls into one of four families:
//!
//! * [`ConfigurationError`]: bad user input. Raised before a session starts.
//! * [`CollaboratorError`]: a discovery or probe collaborator failed. Recorded
//!   in host or session state and forwarded to subscribers.
//! * [`ConsistencyViolation`]: an internal invariant broke. Always a bug.
//! * [`PersistenceError`]: a report could not be written. Retryable.
//!
//! [`ScanError`] is the umbrella returned by coordinator operations.

use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ScanError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("interface '{0}' does not exist")]
    InvalidInterface(String),

    #[error("invalid address '{input}': {reason}")]
    InvalidAddress { input: String, reason: String },

    #[error("invalid subnet '{input}': {reason}")]
    InvalidSubnet { input: String, reason: String },

    #[error("invalid port specification '{0}'")]
    InvalidPortSpec(String),
}

/// Failure reported by one of the external collaborators.
///
/// Cloneable so the same error can be stored on a host record and
/// delivered to every subscriber.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CollaboratorError {
    #[error("no network interfaces available")]
    NoInterfacesAvailable,

    #[error("interface '{name}' unavailable: {reason}")]
    InterfaceUnavailable { name: String, reason: String },

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("host {0} is unreachable")]
    HostUnreachable(Ipv4Addr),

    #[error("probe timed out after {0:?}")]
    Timeout(Duration),

    #[error("collaborator aborted: {0}")]
    Aborted(String),

    #[error("i/o failure: {0}")]
    Io(String),
}

impl CollaboratorError {
    /// Maps an OS error onto the collaborator taxonomy.
    pub fn from_io(err: &std::io::Error, context: &str) -> Self {
        match err.kind() {
            std::io::ErrorKind::PermissionDenied => {
                Self::PermissionDenied(format!("{context}: {err}"))
            }
            std::io::ErrorKind::TimedOut => Self::Io(format!("{context}: timed out")),
            _ => Self::Io(format!("{context}: {err}")),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConsistencyViolation {
    #[error("duplicate insertion for {0}")]
    DuplicateKey(Ipv4Addr),

    #[error("index entry for {address} points at slot {slot} holding another record")]
    IndexOutOfSync { address: Ipv4Addr, slot: usize },
}

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("failed to write report to {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode report: {0}")]
    Encode(String),
}

impl PersistenceError {
    /// Persistence failures never touch the inventory, so the caller may
    /// always try again.
    pub fn is_retryable(&self) -> bool {
        true
    }
}

#[derive(Error, Debug)]
pub enum ScanError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),

    #[error("consistency violation: {0}")]
    Consistency(#[from] ConsistencyViolation),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error("unknown host {0}")]
    UnknownHost(Ipv4Addr),

    #[error("no discovery session has been started")]
    NoActiveSession,
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
