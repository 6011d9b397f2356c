//! WebSocket command server: accept loop and per-session task management.
//!
//! This module is responsible for:
//!
//! 1. Binding a TCP listener on the configured address.
//! 2. Upgrading each connection to a WebSocket session.
//! 3. Decoding every text frame as a JSON command and handing it to the
//!    [`CommandRouter`].
//! 4. Answering frames that cannot be decoded or routed with an `ERROR`
//!    frame.  One bad frame never closes the session.
//! 5. Stopping the accept loop when the `running` flag is cleared.
//!
//! # Why keep sessions open on errors? (for beginners)
//!
//! The operator's client streams pointer moves many times per second.  A
//! single malformed or rejected frame (a MOVE for a pointer that was already
//! lifted, a COPY with nothing selected) is normal during a session and must
//! not drop the connection; the client just gets told about it.
//!
//! All sessions share one router, so pointer ids are global to the agent
//! and strokes from different sessions still go through the one dispatch
//! queue.

use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::{
    accept_async,
    tungstenite::{Error as WsError, Message as WsMessage},
};
use tracing::{debug, error, info, warn};
use touchlink_core::decode_command;
use touchlink_core::protocol::{encode_reply, Reply};
use uuid::Uuid;

use crate::application::route_command::CommandRouter;

/// How often the accept loop re-checks the `running` flag.
const ACCEPT_POLL: Duration = Duration::from_millis(200);

// ── Public API ────────────────────────────────────────────────────────────────

/// Binds `addr` and serves sessions until `running` is set to `false`.
///
/// # Errors
///
/// Returns an error if the TCP listener cannot be bound.
pub async fn run_server(
    addr: SocketAddr,
    router: Arc<CommandRouter>,
    running: Arc<AtomicBool>,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind command listener on {addr}"))?;
    info!("command channel listening on {addr}");
    serve(listener, router, running).await
}

/// Runs the accept loop on an already bound listener.
///
/// # Errors
///
/// Currently always returns `Ok` once `running` is cleared.  Accept errors
/// are logged and the loop continues.
pub async fn serve(
    listener: TcpListener,
    router: Arc<CommandRouter>,
    running: Arc<AtomicBool>,
) -> anyhow::Result<()> {
    loop {
        if !running.load(Ordering::Relaxed) {
            info!("shutdown flag set; stopping accept loop");
            break;
        }

        // The timeout lets the loop notice the shutdown flag while idle.
        match timeout(ACCEPT_POLL, listener.accept()).await {
            Ok(Ok((stream, peer_addr))) => {
                let router = Arc::clone(&router);
                tokio::spawn(async move {
                    handle_session(stream, peer_addr, router).await;
                });
            }
            Ok(Err(e)) => {
                error!("accept error: {e}");
            }
            Err(_) => {}
        }
    }

    Ok(())
}

/// Decodes and routes one text frame.  Returns the reply to send, if any.
pub fn handle_frame(router: &CommandRouter, frame: &str) -> Option<Reply> {
    let command = match decode_command(frame) {
        Ok(command) => command,
        Err(e) => {
            warn!("rejected frame: {e}");
            return Some(Reply::Error {
                message: e.to_string(),
            });
        }
    };
    router.route(command).err().map(|e| Reply::Error {
        message: e.to_string(),
    })
}

// ── Per-session handler ───────────────────────────────────────────────────────

async fn handle_session(stream: TcpStream, peer_addr: SocketAddr, router: Arc<CommandRouter>) {
    let session_id = Uuid::new_v4();
    info!("session {session_id}: connection from {peer_addr}");
    match run_session(stream, session_id, router).await {
        Ok(()) => info!("session {session_id} closed normally"),
        Err(e) => warn!("session {session_id} closed with error: {e:#}"),
    }
}

async fn run_session(
    stream: TcpStream,
    session_id: Uuid,
    router: Arc<CommandRouter>,
) -> anyhow::Result<()> {
    let ws_stream = accept_async(stream)
        .await
        .with_context(|| format!("session {session_id}: WebSocket handshake failed"))?;
    let (mut ws_tx, mut ws_rx) = ws_stream.split();

    loop {
        let message = match ws_rx.next().await {
            Some(Ok(message)) => message,
            Some(Err(WsError::ConnectionClosed | WsError::Protocol(_))) | None => {
                debug!("session {session_id}: stream ended");
                break;
            }
            Some(Err(e)) => return Err(e).context("WebSocket read failed"),
        };

        let reply = match message {
            WsMessage::Text(frame) => handle_frame(&router, &frame),
            WsMessage::Binary(_) => Some(Reply::Error {
                message: "binary frames are not supported".to_string(),
            }),
            WsMessage::Close(_) => {
                debug!("session {session_id}: close frame received");
                break;
            }
            WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Frame(_) => None,
        };

        if let Some(reply) = reply {
            let frame = encode_reply(&reply).context("failed to encode reply")?;
            ws_tx
                .send(WsMessage::Text(frame))
                .await
                .context("WebSocket send failed")?;
        }
    }

    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
