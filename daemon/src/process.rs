use std::path::PathBuf;
use sysinfo::{ProcessesToUpdate, System};

/// Executable names that merely launch the real target binary. When one of
/// these shows up, the first command-line argument names the process we
/// actually care about.
const LOADER_SHIMS: [&str; 2] = ["wine-preloader", "wine64-preloader"];

/// Per-poll fact about one running process. Recomputed every tick, never
/// persisted.
#[derive(Debug, Clone)]
pub struct ObservedProcess {
    pub pid: u32,
    pub exe: Option<PathBuf>,
    pub name: String,
    pub cmd: Vec<String>,
    /// Creation time, seconds since the epoch.
    pub start_time: u64,
}

impl ObservedProcess {
    /// Resolves the display executable basename used for catalog lookup.
    ///
    /// Paths coming out of the compatibility layer use Windows separators,
    /// so both `/` and `\` split the path. A loader shim is substituted by
    /// the basename of its first command-line argument, which is the binary
    /// the shim was started for.
    pub fn display_basename(&self) -> String {
        let raw = match &self.exe {
            Some(path) => path.to_string_lossy().into_owned(),
            None => self.name.clone(),
        };
        let base = basename(&raw);
        if LOADER_SHIMS.contains(&base) {
            if let Some(first) = self.cmd.first() {
                return basename(first).to_string();
            }
        }
        base.to_string()
    }
}

fn basename(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

/// Source of process snapshots. The watcher depends only on this trait, so
/// tests drive it with scripted lists.
pub trait ProcessSource {
    /// Returns the running processes ordered newest-first by creation time,
    /// so that the most recently started of several matching processes is
    /// treated as authoritative.
    fn snapshot(&mut self) -> Vec<ObservedProcess>;
}

/// Live process source over the OS process table.
pub struct SystemSource {
    sys: System,
}

impl SystemSource {
    pub fn new() -> Self {
        Self { sys: System::new() }
    }
}

impl ProcessSource for SystemSource {
    fn snapshot(&mut self) -> Vec<ObservedProcess> {
        // Dead processes must drop out of the table, or a finished runtime
        // would look alive forever.
        self.sys.refresh_processes(ProcessesToUpdate::All, true);

        // Processes that vanished mid-refresh or denied inspection simply
        // come back with less data; nothing here is fatal to the scan.
        let mut procs: Vec<ObservedProcess> = self
            .sys
            .processes()
            .values()
            .map(|p| ObservedProcess {
                pid: p.pid().as_u32(),
                exe: p.exe().map(|e| e.to_path_buf()),
                name: p.name().to_string_lossy().into_owned(),
                cmd: p.cmd().iter().map(|c| c.to_string_lossy().into_owned()).collect(),
                start_time: p.start_time(),
            })
            .collect();

        procs.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        procs
    }
}
