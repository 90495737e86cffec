//! Shared mocks for unit tests: a call-recording presence client and a
//! scripted process source.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::catalog::{App, AppCatalog};
use crate::error::DaemonError;
use crate::presence::{Activity, PresenceClient};
use crate::process::{ObservedProcess, ProcessSource};

/// One presence call as the endpoint would have seen it.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    /// details line, state line, start timestamp.
    Update(String, Option<String>, Option<u64>),
    Clear,
}

/// Presence client that records every call instead of talking to a socket.
#[derive(Clone, Default)]
pub struct RecordingClient {
    pub calls: Arc<Mutex<Vec<Call>>>,
}

impl RecordingClient {
    pub fn taken(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PresenceClient for RecordingClient {
    async fn connect(&mut self) -> Result<(), DaemonError> {
        Ok(())
    }

    async fn set_activity(&mut self, activity: Option<&Activity>) -> Result<(), DaemonError> {
        let call = match activity {
            Some(a) => Call::Update(
                a.details.clone().unwrap_or_default(),
                a.state.clone(),
                a.timestamps.as_ref().map(|t| t.start),
            ),
            None => Call::Clear,
        };
        self.calls.lock().unwrap().push(call);
        Ok(())
    }
}

/// Process source replaying one prepared snapshot per tick; an exhausted
/// script yields empty lists. Snapshots are sorted newest-first, matching
/// the `ProcessSource` contract.
pub struct ScriptedSource {
    ticks: VecDeque<Vec<ObservedProcess>>,
}

impl ScriptedSource {
    pub fn new(ticks: Vec<Vec<ObservedProcess>>) -> Self {
        Self {
            ticks: ticks.into_iter().collect(),
        }
    }
}

impl ProcessSource for ScriptedSource {
    fn snapshot(&mut self) -> Vec<ObservedProcess> {
        let mut procs = self.ticks.pop_front().unwrap_or_default();
        procs.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        procs
    }
}

/// Builds an observed process whose name is the basename of `exe`.
pub fn proc(exe: &str, pid: u32, start_time: u64) -> ObservedProcess {
    let name = exe.rsplit(['/', '\\']).next().unwrap_or(exe).to_string();
    ObservedProcess {
        pid,
        exe: Some(PathBuf::from(exe)),
        name,
        cmd: vec![],
        start_time,
    }
}

/// A wineserver process pointing at a binary path that does not exist, so
/// version extraction deterministically yields `None` in tests.
pub fn wineserver(start_time: u64) -> ObservedProcess {
    proc("/nonexistent/wineserver", 1, start_time)
}

/// Catalog from `(alias, title)` pairs; aliases given lowercase.
pub fn catalog(entries: &[(&str, &str)]) -> AppCatalog {
    AppCatalog::from_apps(
        entries
            .iter()
            .map(|(exe, title)| App {
                exe: vec![exe.to_string()],
                title: title.to_string(),
                icon: None,
            })
            .collect(),
    )
}
