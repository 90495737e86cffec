use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::presence::PresenceSession;
use crate::state::SharedState;

/// Capability set handed to every plugin task: read access to the shared
/// state and the lock-guarded presence session.
#[derive(Clone)]
pub struct PluginContext {
    pub state: SharedState,
    pub session: Arc<PresenceSession>,
}

/// An extension unit scheduled alongside the watcher for the process
/// lifetime. A plugin's failure terminates only its own task.
#[async_trait]
pub trait Plugin: Send + Sync {
    fn name(&self) -> &'static str;

    /// Entry point, run as an independent task.
    async fn run(&self, ctx: PluginContext) -> anyhow::Result<()>;

    /// Invoked when the task completes, normally or by failure.
    fn on_exit(&self, _result: &anyhow::Result<()>) {}
}

/// Resolves a configured plugin name to its linked-in implementation.
pub fn builtin(name: &str) -> Option<Arc<dyn Plugin>> {
    match name {
        "greeter" => Some(Arc::new(Greeter)),
        _ => None,
    }
}

/// Spawns one task per configured plugin, in order. Unknown names are
/// skipped with a warning, never fatal.
pub fn spawn_all(names: &[String], ctx: &PluginContext) -> Vec<JoinHandle<()>> {
    let mut handles = Vec::new();
    for name in names {
        let Some(plugin) = builtin(name) else {
            warn!("plugin not found: {name}");
            continue;
        };
        info!("loading plugin: {}", plugin.name());
        handles.push(spawn_plugin(plugin, ctx.clone()));
    }
    handles
}

fn spawn_plugin(plugin: Arc<dyn Plugin>, ctx: PluginContext) -> JoinHandle<()> {
    tokio::spawn(async move {
        let result = plugin.run(ctx).await;
        plugin.on_exit(&result);
        match &result {
            Ok(()) => info!("plugin {} finished", plugin.name()),
            Err(e) => warn!("plugin {} failed: {e:#}", plugin.name()),
        }
    })
}

/// Sample status plugin: once an app is running, rewrite its presence with a
/// "Hello World!" state line, then exit.
struct Greeter;

#[async_trait]
impl Plugin for Greeter {
    fn name(&self) -> &'static str {
        "greeter"
    }

    async fn run(&self, ctx: PluginContext) -> anyhow::Result<()> {
        loop {
            let active = {
                let state = ctx.state.read().await;
                state.active.clone().map(|app| {
                    (app, state.runtime.as_ref().and_then(|r| r.version.clone()))
                })
            };

            if let Some((app, version)) = active {
                // Replacement is a clear+update pair under one guard.
                let mut rpc = ctx.session.lock().await;
                rpc.clear().await?;
                rpc.update(&app, Some("Hello World!"), version.as_deref())
                    .await?;
                return Ok(());
            }

            tokio::time::sleep(Duration::from_secs(1)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{self, ActiveApp, Mode};
    use crate::test_util::{Call, RecordingClient};
    use std::sync::atomic::{AtomicBool, Ordering};

    fn ctx_with(client: RecordingClient) -> PluginContext {
        PluginContext {
            state: state::shared(),
            session: Arc::new(PresenceSession::new(client)),
        }
    }

    // ── registry ──────────────────────────────────────────────────────────────

    #[test]
    fn builtin_resolves_greeter() {
        assert_eq!(builtin("greeter").unwrap().name(), "greeter");
    }

    #[test]
    fn builtin_unknown_name_is_none() {
        assert!(builtin("does-not-exist").is_none());
    }

    // ── greeter ───────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn greeter_rewrites_presence_once_an_app_is_active() {
        let client = RecordingClient::default();
        let ctx = ctx_with(client.clone());
        {
            let mut state = ctx.state.write().await;
            state.mode = Mode::Running;
            state.active = Some(ActiveApp {
                entry: 0,
                title: "Game".into(),
                icon: None,
                pid: 7,
                start_time: 100,
            });
        }

        builtin("greeter").unwrap().run(ctx).await.unwrap();

        assert_eq!(
            client.taken(),
            vec![
                Call::Clear,
                Call::Update("Playing Game".into(), Some("Hello World!".into()), Some(100)),
            ]
        );
    }

    // ── host ──────────────────────────────────────────────────────────────────

    struct Failing {
        exited: Arc<AtomicBool>,
    }

    #[async_trait]
    impl Plugin for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn run(&self, _ctx: PluginContext) -> anyhow::Result<()> {
            anyhow::bail!("boom")
        }

        fn on_exit(&self, result: &anyhow::Result<()>) {
            assert!(result.is_err());
            self.exited.store(true, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn failing_plugin_completes_its_task_and_fires_exit_hook() {
        let exited = Arc::new(AtomicBool::new(false));
        let plugin = Arc::new(Failing {
            exited: exited.clone(),
        });

        let handle = spawn_plugin(plugin, ctx_with(RecordingClient::default()));
        handle.await.unwrap();
        assert!(exited.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn spawn_all_skips_unknown_names() {
        let handles = spawn_all(
            &["does-not-exist".to_string()],
            &ctx_with(RecordingClient::default()),
        );
        assert!(handles.is_empty());
    }
}
