//! # Report Sinks
//!
//! File-backed [`ReportSink`]s. Both formats are written to a sibling
//! `*.tmp` file first and renamed into place, so a failed export never
//! leaves a half-written report behind.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use netsweep_common::error::PersistenceError;
use netsweep_common::report::{ReportPayload, ReportSink};
use tracing::debug;

/// Pretty-printed JSON array, one object per host.
#[derive(Debug, Clone)]
pub struct JsonReport {
    path: PathBuf,
}

impl JsonReport {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ReportSink for JsonReport {
    fn persist(&self, payload: &ReportPayload) -> Result<(), PersistenceError> {
        write_atomic(&self.path, |w| {
            serde_json::to_writer_pretty(&mut *w, payload).map_err(|e| PersistenceError::Encode(e.to_string()))?;
            writeln!(w).map_err(|e| io_error(&self.path, e))
        })
    }
}

/// One row per host: `address,link_address,open_ports` with ports
/// separated by `;`.
#[derive(Debug, Clone)]
pub struct CsvReport {
    path: PathBuf,
}

impl CsvReport {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ReportSink for CsvReport {
    fn persist(&self, payload: &ReportPayload) -> Result<(), PersistenceError> {
        write_atomic(&self.path, |w| {
            let mut wtr = csv::Writer::from_writer(w);
            let encode = |e: csv::Error| PersistenceError::Encode(e.to_string());

            wtr.write_record(["address", "link_address", "open_ports"]).map_err(encode)?;
            for entry in &payload.entries {
                let ports = entry
                    .open_ports
                    .iter()
                    .map(u16::to_string)
                    .collect::<Vec<_>>()
                    .join(";");
                wtr.write_record([entry.address.to_string(), entry.link_address.clone(), ports])
                    .map_err(encode)?;
            }
            wtr.flush().map_err(|e| io_error(&self.path, e))
        })
    }
}

fn write_atomic<F>(path: &Path, write: F) -> Result<(), PersistenceError>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<(), PersistenceError>,
{
    let tmp = tmp_path(path);
    let result = File::create(&tmp)
        .map_err(|e| io_error(&tmp, e))
        .and_then(|file| {
            let mut w = BufWriter::new(file);
            write(&mut w)?;
            w.flush().map_err(|e| io_error(&tmp, e))
        })
        .and_then(|()| fs::rename(&tmp, path).map_err(|e| io_error(path, e)));

    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    } else {
        debug!("report written to {}", path.display());
    }
    result
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

fn io_error(path: &Path, source: std::io::Error) -> PersistenceError {
    PersistenceError::Io {
        path: path.to_path_buf(),
        source,
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
