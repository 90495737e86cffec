use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced at the daemon's seams.
///
/// Per-process enumeration failures never show up here: entries the OS will
/// not let us inspect are skipped during the scan. A missing runtime version
/// string is advisory and reported as `None`, not as an error.
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("failed to read app database {path}: {source}")]
    DatabaseRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("app database malformed: {path}: {source}")]
    DatabaseMalformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Initial connection to the presence endpoint failed. The one fatal
    /// error in the daemon: logged and answered with exit status 1.
    #[error("presence endpoint unavailable: {0}")]
    Connect(String),

    #[error("presence I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("presence protocol error: {0}")]
    Protocol(String),
}
