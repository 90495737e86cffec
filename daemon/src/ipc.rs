//! Local IPC transport to the presence endpoint.
//!
//! Frames are an 8-byte header (opcode then payload length, both u32
//! little-endian) followed by a JSON payload. Opcode 0 carries the
//! handshake, opcode 1 carries commands. The endpoint listens on a unix
//! socket named `discord-ipc-{0..9}` under `$XDG_RUNTIME_DIR`, `$TMPDIR`,
//! or `/tmp`, whichever exists first.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::path::PathBuf;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;
use tracing::debug;

use crate::error::DaemonError;
use crate::presence::{Activity, PresenceClient};

const OP_HANDSHAKE: u32 = 0;
const OP_FRAME: u32 = 1;

/// The concrete [`PresenceClient`] speaking the chat client's IPC protocol.
pub struct DiscordIpc {
    app_id: String,
    stream: Option<UnixStream>,
    nonce: u64,
}

impl DiscordIpc {
    pub fn new(app_id: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            stream: None,
            nonce: 0,
        }
    }

    fn socket_candidates() -> Vec<PathBuf> {
        let mut bases: Vec<PathBuf> = Vec::new();
        for var in ["XDG_RUNTIME_DIR", "TMPDIR"] {
            if let Ok(dir) = std::env::var(var) {
                bases.push(PathBuf::from(dir));
            }
        }
        bases.push(PathBuf::from("/tmp"));

        let mut candidates = Vec::new();
        for base in bases {
            for n in 0..10 {
                candidates.push(base.join(format!("discord-ipc-{n}")));
            }
        }
        candidates
    }

    async fn open_socket() -> Result<UnixStream, DaemonError> {
        for path in Self::socket_candidates() {
            match UnixStream::connect(&path).await {
                Ok(stream) => {
                    debug!("connected to presence socket {}", path.display());
                    return Ok(stream);
                }
                Err(_) => continue,
            }
        }
        Err(DaemonError::Connect("no presence socket found".into()))
    }

    /// Performs the opcode-0 handshake on an already-open socket and keeps
    /// the stream on success.
    async fn handshake(&mut self, mut stream: UnixStream) -> Result<(), DaemonError> {
        let hello = json!({ "v": 1, "client_id": self.app_id });
        write_frame(&mut stream, OP_HANDSHAKE, &hello).await?;
        let (_, reply) = read_frame(&mut stream).await?;

        match reply.get("evt").and_then(Value::as_str) {
            Some("READY") => {
                self.stream = Some(stream);
                Ok(())
            }
            _ => Err(DaemonError::Connect(format!(
                "unexpected handshake reply: {reply}"
            ))),
        }
    }
}

#[async_trait]
impl PresenceClient for DiscordIpc {
    async fn connect(&mut self) -> Result<(), DaemonError> {
        let stream = Self::open_socket().await?;
        self.handshake(stream).await
    }

    async fn set_activity(&mut self, activity: Option<&Activity>) -> Result<(), DaemonError> {
        self.nonce += 1;
        let nonce = self.nonce;
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| DaemonError::Protocol("not connected".into()))?;

        let payload = json!({
            "cmd": "SET_ACTIVITY",
            "args": { "pid": std::process::id(), "activity": activity },
            "nonce": nonce.to_string(),
        });
        write_frame(stream, OP_FRAME, &payload).await?;
        let (_, reply) = read_frame(stream).await?;

        if reply.get("evt").and_then(Value::as_str) == Some("ERROR") {
            return Err(DaemonError::Protocol(format!(
                "endpoint rejected update: {reply}"
            )));
        }
        Ok(())
    }
}

fn encode_frame(opcode: u32, payload: &Value) -> Vec<u8> {
    let body = payload.to_string().into_bytes();
    let mut frame = Vec::with_capacity(8 + body.len());
    frame.extend_from_slice(&opcode.to_le_bytes());
    frame.extend_from_slice(&(body.len() as u32).to_le_bytes());
    frame.extend_from_slice(&body);
    frame
}

async fn write_frame(
    stream: &mut UnixStream,
    opcode: u32,
    payload: &Value,
) -> Result<(), DaemonError> {
    stream.write_all(&encode_frame(opcode, payload)).await?;
    Ok(())
}

async fn read_frame(stream: &mut UnixStream) -> Result<(u32, Value), DaemonError> {
    let opcode = stream.read_u32_le().await?;
    let len = stream.read_u32_le().await? as usize;
    let mut body = vec![0u8; len];
    stream.read_exact(&mut body).await?;
    let value = serde_json::from_slice(&body)
        .map_err(|e| DaemonError::Protocol(format!("malformed frame payload: {e}")))?;
    Ok((opcode, value))
}
