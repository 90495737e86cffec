use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use tracing::debug;

use crate::process::ObservedProcess;

/// Basename of the process whose presence defines "the runtime is alive".
pub const RUNTIME_PROCESS: &str = "wineserver";

/// `Wine <major>.<minor>` at the start of a printable run.
static VERSION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^Wine\s\d+\.\d+").unwrap());

/// Shortest printable run worth inspecting, matching the convention of the
/// `strings` tool.
const MIN_RUN_LEN: usize = 4;

/// Returns the runtime's defining process if it is present in `procs`.
pub fn find_runtime(procs: &[ObservedProcess]) -> Option<&ObservedProcess> {
    procs.iter().find(|p| p.display_basename() == RUNTIME_PROCESS)
}

/// Extracts the runtime's version marker from the binary at `path`.
///
/// Scans the raw bytes for printable-ASCII runs and returns the first run
/// starting with the `Wine <major>.<minor>` pattern, trimmed. The whole run
/// is returned, so `Wine 9.0 (Staging)` comes back intact. Returns `None` when the file
/// is unreadable or carries no such run; the version is display-only, so
/// this never fails.
pub fn version_of(path: &Path) -> Option<String> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            debug!("could not read {} for version extraction: {e}", path.display());
            return None;
        }
    };

    let version = printable_runs(&bytes)
        .find(|run| VERSION_RE.is_match(run))
        .map(|run| run.trim().to_string());
    version
}

fn printable_runs(bytes: &[u8]) -> impl Iterator<Item = String> + '_ {
    bytes
        .split(|b: &u8| !(0x20..=0x7e).contains(b))
        .filter(|run| run.len() >= MIN_RUN_LEN)
        .map(|run| String::from_utf8_lossy(run).into_owned())
}
