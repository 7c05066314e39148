//! Shared models, error taxonomy and collaborator contracts for `netsweep`.

pub mod config;
pub mod error;
pub mod network;
pub mod report;
pub mod scanning;
pub mod utils;

/// Logs a positive milestone. Rendered with its own prefix by the CLI.
#[macro_export]
macro_rules! success {
    ($($arg:tt)*) => {
        ::tracing::info!(target: "netsweep::success", $($arg)*)
    };
}
