use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Watcher mode. Drives which presence calls a tick may issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// The compatibility runtime is not running.
    Inactive,
    /// The runtime is up but no tracked app has matched yet.
    Scanning,
    /// A tracked app is running and presence is being displayed for it.
    Running,
}

/// The detected runtime binary for the current episode. Resolved once when
/// the runtime first appears and dropped when it goes away; the version
/// marker is captured at resolution time.
#[derive(Debug, Clone)]
pub struct RuntimeHandle {
    pub path: PathBuf,
    pub version: Option<String>,
}

/// The app currently considered running, with the observed process facts
/// used for display.
#[derive(Debug, Clone)]
pub struct ActiveApp {
    /// Catalog index of the matched entry; the identity key used for
    /// episode comparison and per-scan deduplication.
    pub entry: usize,
    pub title: String,
    pub icon: Option<String>,
    pub pid: u32,
    /// Creation time of the matched process, seconds since the epoch.
    pub start_time: u64,
}

/// Shared daemon state. The watcher is the sole writer; plugins read it
/// through their context.
///
/// Invariants: `Running` implies `active` is set; `Inactive` implies both
/// `active` and `runtime` are empty.
#[derive(Debug)]
pub struct State {
    pub active: Option<ActiveApp>,
    pub mode: Mode,
    pub runtime: Option<RuntimeHandle>,
}

impl State {
    pub fn new() -> Self {
        Self {
            active: None,
            mode: Mode::Inactive,
            runtime: None,
        }
    }
}

impl Default for State {
    fn default() -> Self {
        Self::new()
    }
}

pub type SharedState = Arc<RwLock<State>>;

/// Creates the shared state in its initial empty, `Inactive` form.
pub fn shared() -> SharedState {
    Arc::new(RwLock::new(State::new()))
}
