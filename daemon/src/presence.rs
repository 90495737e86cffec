use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::{Mutex, MutexGuard};

use crate::error::DaemonError;
use crate::state::ActiveApp;

/// Small presence icon shown next to the app's own art.
const RUNTIME_ICON: &str =
    "https://static.wikia.nocookie.net/logopedia/images/8/87/Wine_2008.png";

/// Full presence payload. An update replaces the prior presence entirely,
/// so every field is rebuilt on each call.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Activity {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamps: Option<Timestamps>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assets: Option<Assets>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Timestamps {
    pub start: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Assets {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub large_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub large_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub small_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub small_text: Option<String>,
}

impl Activity {
    /// Builds the payload for a running app: primary line `Playing {title}`,
    /// start timestamp from the observed process (now, when the process did
    /// not report one), secondary line from the runtime version when known.
    pub fn for_app(app: &ActiveApp, state_text: Option<&str>, version: Option<&str>) -> Self {
        let start = if app.start_time > 0 {
            app.start_time
        } else {
            chrono::Utc::now().timestamp() as u64
        };
        Self {
            details: Some(format!("Playing {}", app.title)),
            state: state_text.map(str::to_string),
            timestamps: Some(Timestamps { start }),
            assets: Some(Assets {
                large_image: app.icon.clone(),
                large_text: Some(app.title.clone()),
                small_image: Some(RUNTIME_ICON.to_string()),
                small_text: version.map(str::to_string),
            }),
        }
    }
}

/// Transport to the presence endpoint. The wire format lives entirely behind
/// this trait; `set_activity(None)` clears the presence and is idempotent.
#[async_trait]
pub trait PresenceClient: Send {
    async fn connect(&mut self) -> Result<(), DaemonError>;
    async fn set_activity(&mut self, activity: Option<&Activity>) -> Result<(), DaemonError>;
}

/// Owns the single connection to the presence endpoint.
///
/// The endpoint is single-writer: interleaved calls from two tasks leave its
/// displayed state undefined. Every call therefore goes through [`lock`],
/// and a clear-then-update replacement happens under one guard.
///
/// [`lock`]: PresenceSession::lock
pub struct PresenceSession {
    client: Mutex<Box<dyn PresenceClient>>,
}

impl PresenceSession {
    pub fn new(client: impl PresenceClient + 'static) -> Self {
        Self {
            client: Mutex::new(Box::new(client)),
        }
    }

    /// Establishes the connection. Failure here is the one unrecoverable
    /// error in the daemon; the caller exits with a non-zero status.
    pub async fn connect(&self) -> Result<(), DaemonError> {
        self.client.lock().await.connect().await
    }

    /// Acquires the shared presence lock. There is deliberately no timeout:
    /// a plugin holding the guard stalls the watcher until it lets go.
    pub async fn lock(&self) -> PresenceGuard<'_> {
        PresenceGuard {
            client: self.client.lock().await,
        }
    }
}

/// Scoped access to the presence endpoint while the shared lock is held.
pub struct PresenceGuard<'a> {
    client: MutexGuard<'a, Box<dyn PresenceClient>>,
}

impl PresenceGuard<'_> {
    pub async fn update(
        &mut self,
        app: &ActiveApp,
        state_text: Option<&str>,
        version: Option<&str>,
    ) -> Result<(), DaemonError> {
        let activity = Activity::for_app(app, state_text, version);
        self.client.set_activity(Some(&activity)).await
    }

    pub async fn clear(&mut self) -> Result<(), DaemonError> {
        self.client.set_activity(None).await
    }
}
