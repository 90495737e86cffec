use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::{debug, info, warn};

use crate::catalog::AppCatalog;
use crate::error::DaemonError;
use crate::presence::PresenceSession;
use crate::process::{ObservedProcess, ProcessSource};
use crate::runtime;
use crate::state::{ActiveApp, Mode, RuntimeHandle, SharedState};

/// The process-detection state machine.
///
/// Each tick derives runtime liveness and the newest matching tracked app
/// from a fresh process snapshot, then reconciles the shared state and the
/// presence endpoint with what changed. Presence calls are issued on
/// semantic transitions only: an unchanged snapshot across ticks produces
/// zero calls, and replacing one app's presence with another's happens as a
/// clear-then-update pair under a single lock acquisition.
pub struct Watcher<S: ProcessSource> {
    catalog: AppCatalog,
    source: S,
    session: Arc<PresenceSession>,
    state: SharedState,
    tick_interval: Duration,
}

impl<S: ProcessSource> Watcher<S> {
    pub fn new(
        catalog: AppCatalog,
        source: S,
        session: Arc<PresenceSession>,
        state: SharedState,
        tick_interval: Duration,
    ) -> Self {
        Self {
            catalog,
            source,
            session,
            state,
            tick_interval,
        }
    }

    /// Runs the tick loop until process exit. A presence-write failure
    /// during a tick is logged and dropped; the next tick re-derives
    /// everything from the live process list, so there is no retry path.
    pub async fn run(mut self) {
        let mut ticker = interval(self.tick_interval);
        loop {
            ticker.tick().await;
            if let Err(e) = self.tick().await {
                warn!("presence update failed: {e}");
            }
        }
    }

    /// One poll pass.
    pub(crate) async fn tick(&mut self) -> Result<(), DaemonError> {
        let procs = self.source.snapshot();

        let Some(server) = runtime::find_runtime(&procs) else {
            return self.runtime_gone().await;
        };
        self.runtime_seen(server).await;

        let matches = self.scan(&procs);
        self.reconcile(matches).await
    }

    /// Runtime absent: clear any live presence and drop back to `Inactive`.
    /// Already-inactive ticks are a no-op.
    async fn runtime_gone(&mut self) -> Result<(), DaemonError> {
        let was = self.state.read().await.mode;
        if was == Mode::Inactive {
            return Ok(());
        }

        if was == Mode::Running {
            self.session.lock().await.clear().await?;
        }

        let mut state = self.state.write().await;
        if let Some(app) = state.active.take() {
            info!("process stopped: {}", app.title);
        }
        state.runtime = None;
        state.mode = Mode::Inactive;
        debug!("watcher is INACTIVE");
        Ok(())
    }

    /// Runtime present: resolve the handle once per episode and leave
    /// `Inactive` if that's where we were.
    async fn runtime_seen(&mut self, server: &ObservedProcess) {
        let mut state = self.state.write().await;

        if state.runtime.is_none() {
            let path = server
                .exe
                .clone()
                .unwrap_or_else(|| PathBuf::from(&server.name));
            let version = runtime::version_of(&path);
            debug!(
                "using wineserver at {} ({})",
                path.display(),
                version.as_deref().unwrap_or("unknown version")
            );
            state.runtime = Some(RuntimeHandle { path, version });
        }

        if state.mode == Mode::Inactive {
            state.mode = Mode::Scanning;
            debug!("watcher is SCANNING, looking for tracked apps");
        }
    }

    /// Newest-first scan for tracked apps. The first process matching a
    /// catalog entry in a pass wins; older instances of the same entry are
    /// ignored.
    fn scan(&self, procs: &[ObservedProcess]) -> Vec<ActiveApp> {
        let mut matched: Vec<ActiveApp> = Vec::new();
        for proc in procs {
            let basename = proc.display_basename().to_lowercase();
            let Some((entry, app)) = self.catalog.lookup(&basename) else {
                continue;
            };
            if matched.iter().any(|m| m.entry == entry) {
                continue;
            }
            matched.push(ActiveApp {
                entry,
                title: app.title.clone(),
                icon: app.icon.clone(),
                pid: proc.pid,
                start_time: proc.start_time,
            });
        }
        matched
    }

    /// Applies the app-transition rules for this tick.
    async fn reconcile(&mut self, matches: Vec<ActiveApp>) -> Result<(), DaemonError> {
        let (mode, current) = {
            let state = self.state.read().await;
            (state.mode, state.active.as_ref().map(|a| a.entry))
        };

        let Some(newest) = matches.into_iter().next() else {
            // A tracked app stopped but the runtime is still up.
            if mode == Mode::Running {
                self.session.lock().await.clear().await?;
                let mut state = self.state.write().await;
                if let Some(app) = state.active.take() {
                    info!("process stopped: {}", app.title);
                }
                state.mode = Mode::Scanning;
            }
            return Ok(());
        };

        match (mode, current) {
            // Same app as last tick: nothing to report.
            (Mode::Running, Some(entry)) if entry == newest.entry => Ok(()),

            // A different app took over: replace atomically under one guard.
            (Mode::Running, _) => {
                info!("process updated to: {}", newest.title);
                let version = self.runtime_version().await;
                {
                    let mut rpc = self.session.lock().await;
                    rpc.clear().await?;
                    rpc.update(&newest, None, version.as_deref()).await?;
                }
                self.state.write().await.active = Some(newest);
                Ok(())
            }

            // New episode.
            _ => {
                info!("new process is running: {}", newest.title);
                let version = self.runtime_version().await;
                self.session
                    .lock()
                    .await
                    .update(&newest, None, version.as_deref())
                    .await?;
                let mut state = self.state.write().await;
                state.mode = Mode::Running;
                state.active = Some(newest);
                Ok(())
            }
        }
    }

    async fn runtime_version(&self) -> Option<String> {
        self.state
            .read()
            .await
            .runtime
            .as_ref()
            .and_then(|r| r.version.clone())
    }
}
