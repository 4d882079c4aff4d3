//! Push channel client: JSON hub protocol over a websocket, with automatic
//! reconnection.
//!
//! Invocations from every physical connection are funnelled into one
//! `mpsc` channel created on the first successful connect, so consumers
//! subscribe once and survive reconnections.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::Value;
use shared::protocol::{
    encode_frame, frames, HandshakeRequest, HandshakeResponse, HubMessage,
};
use tokio::{
    net::TcpStream,
    sync::{mpsc, oneshot, watch},
    task::JoinHandle,
};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

use crate::error::HubError;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(15);
const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);
/// The connection is considered dead when the server stays silent this long.
const SERVER_TIMEOUT: Duration = Duration::from_secs(30);
const INVOCATION_BUFFER: usize = 256;

static NO_PAYLOAD: Value = Value::Null;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting { attempt: u32 },
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub delays: Vec<Duration>,
    /// Keep retrying with the last delay once the schedule runs out.
    pub retry_forever: bool,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            delays: [0, 2000, 5000, 10000]
                .into_iter()
                .map(Duration::from_millis)
                .collect(),
            retry_forever: false,
        }
    }
}

impl ReconnectPolicy {
    /// Delay before the 1-based reconnect `attempt`, `None` once exhausted.
    pub fn delay_for(&self, attempt: u32) -> Option<Duration> {
        let index = attempt.checked_sub(1)? as usize;
        match self.delays.get(index) {
            Some(delay) => Some(*delay),
            None if self.retry_forever => self.delays.last().copied(),
            None => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HubInvocation {
    pub target: String,
    pub arguments: Vec<Value>,
}

impl HubInvocation {
    /// Hub events carry their payload as the first argument.
    pub fn payload(&self) -> &Value {
        self.arguments.first().unwrap_or(&NO_PAYLOAD)
    }
}

struct Session {
    socket: WsStream,
    /// Frames that arrived in the same transport message as the handshake reply.
    pending: Vec<String>,
}

enum SessionEnd {
    Shutdown,
    ReceiverGone,
    ServerClosed {
        error: Option<String>,
        allow_reconnect: bool,
    },
    Dropped(String),
}

pub struct HubConnection {
    url: String,
    state: watch::Receiver<ConnectionState>,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl HubConnection {
    /// Connects and completes the hub handshake. A failure here is returned to
    /// the caller; drops after that are retried according to `policy`.
    pub async fn start(
        hub_url: &str,
        policy: ReconnectPolicy,
    ) -> Result<(Self, mpsc::Receiver<HubInvocation>), HubError> {
        let url = websocket_url(hub_url)?;
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);

        state_tx.send_replace(ConnectionState::Connecting);
        let session = match open_session(&url).await {
            Ok(session) => session,
            Err(err) => {
                error!(%url, error = %err, "hub connection failed");
                state_tx.send_replace(ConnectionState::Disconnected);
                return Err(err);
            }
        };
        state_tx.send_replace(ConnectionState::Connected);
        info!(%url, "hub connected");

        let (invocations_tx, invocations_rx) = mpsc::channel(INVOCATION_BUFFER);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(run_connection(
            url.clone(),
            session,
            policy,
            state_tx,
            invocations_tx,
            shutdown_rx,
        ));

        Ok((
            Self {
                url,
                state: state_rx,
                shutdown: Some(shutdown_tx),
                task: Some(task),
            },
            invocations_rx,
        ))
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn state(&self) -> ConnectionState {
        self.state.borrow().clone()
    }

    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// Closes the socket and waits for the connection task to finish.
    pub async fn stop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for HubConnection {
    fn drop(&mut self) {
        if let Some(task) = &self.task {
            task.abort();
        }
    }
}

/// Maps an `http(s)` hub endpoint to its `ws(s)` equivalent.
pub fn websocket_url(hub_url: &str) -> Result<String, HubError> {
    let hub_url = hub_url.trim();
    if let Some(rest) = hub_url.strip_prefix("https://") {
        Ok(format!("wss://{rest}"))
    } else if let Some(rest) = hub_url.strip_prefix("http://") {
        Ok(format!("ws://{rest}"))
    } else if hub_url.starts_with("ws://") || hub_url.starts_with("wss://") {
        Ok(hub_url.to_string())
    } else {
        Err(HubError::UnsupportedScheme(hub_url.to_string()))
    }
}

async fn open_session(url: &str) -> Result<Session, HubError> {
    let (mut socket, _) = connect_async(url)
        .await
        .map_err(|source| HubError::Connect {
            url: url.to_string(),
            source,
        })?;
    socket
        .send(Message::Text(encode_frame(&HandshakeRequest::default())?))
        .await?;

    let pending = tokio::time::timeout(HANDSHAKE_TIMEOUT, read_handshake(&mut socket))
        .await
        .map_err(|_| HubError::HandshakeTimeout(HANDSHAKE_TIMEOUT))??;
    Ok(Session { socket, pending })
}

async fn read_handshake(socket: &mut WsStream) -> Result<Vec<String>, HubError> {
    while let Some(message) = socket.next().await {
        match message? {
            Message::Text(text) => {
                let mut parts = frames(&text);
                let Some(reply) = parts.next() else {
                    continue;
                };
                let reply: HandshakeResponse = serde_json::from_str(reply)?;
                if let Some(error) = reply.error {
                    return Err(HubError::Handshake(error));
                }
                return Ok(parts.map(str::to_string).collect());
            }
            Message::Close(_) => return Err(HubError::ClosedDuringHandshake),
            _ => {}
        }
    }
    Err(HubError::ClosedDuringHandshake)
}

async fn run_connection(
    url: String,
    mut session: Session,
    policy: ReconnectPolicy,
    state: watch::Sender<ConnectionState>,
    invocations: mpsc::Sender<HubInvocation>,
    mut shutdown: oneshot::Receiver<()>,
) {
    loop {
        match pump(&mut session, &invocations, &mut shutdown).await {
            SessionEnd::Shutdown | SessionEnd::ReceiverGone => {
                let _ = session.socket.close(None).await;
                info!(%url, "hub connection stopped");
                break;
            }
            SessionEnd::ServerClosed {
                error,
                allow_reconnect: false,
            } => {
                warn!(%url, error = ?error, "hub closed by server");
                break;
            }
            SessionEnd::ServerClosed {
                error,
                allow_reconnect: true,
            } => {
                warn!(%url, error = ?error, "hub closed by server, reconnect allowed");
            }
            SessionEnd::Dropped(reason) => {
                warn!(%url, %reason, "hub connection lost");
            }
        }

        match reconnect(&url, &policy, &state, &mut shutdown).await {
            Some(next) => {
                session = next;
                state.send_replace(ConnectionState::Connected);
                info!(%url, "hub reconnected");
            }
            None => break,
        }
    }
    state.send_replace(ConnectionState::Closed);
}

async fn pump(
    session: &mut Session,
    invocations: &mpsc::Sender<HubInvocation>,
    shutdown: &mut oneshot::Receiver<()>,
) -> SessionEnd {
    for frame in std::mem::take(&mut session.pending) {
        if let Some(end) = dispatch_frame(&frame, invocations, shutdown).await {
            return end;
        }
    }

    let mut keep_alive = tokio::time::interval(KEEP_ALIVE_INTERVAL);
    keep_alive.tick().await;
    let server_timeout = tokio::time::sleep(SERVER_TIMEOUT);
    tokio::pin!(server_timeout);

    loop {
        tokio::select! {
            _ = &mut *shutdown => return SessionEnd::Shutdown,
            _ = &mut server_timeout => {
                return SessionEnd::Dropped("server timeout".into());
            }
            _ = keep_alive.tick() => {
                if let Err(err) = session.socket.send(Message::Text(HubMessage::Ping.to_frame())).await {
                    return SessionEnd::Dropped(format!("keep-alive failed: {err}"));
                }
            }
            message = session.socket.next() => {
                server_timeout
                    .as_mut()
                    .reset(tokio::time::Instant::now() + SERVER_TIMEOUT);
                match message {
                    Some(Ok(Message::Text(text))) => {
                        for frame in frames(&text) {
                            if let Some(end) = dispatch_frame(frame, invocations, shutdown).await {
                                return end;
                            }
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        return SessionEnd::Dropped(format!("websocket closed: {frame:?}"));
                    }
                    Some(Ok(_)) => {}
                    Some(Err(err)) => return SessionEnd::Dropped(err.to_string()),
                    None => return SessionEnd::Dropped("websocket stream ended".into()),
                }
            }
        }
    }
}

/// Forwards one frame. Waiting for room in a full invocation channel still
/// honours shutdown.
async fn dispatch_frame(
    frame: &str,
    invocations: &mpsc::Sender<HubInvocation>,
    shutdown: &mut oneshot::Receiver<()>,
) -> Option<SessionEnd> {
    match HubMessage::parse(frame) {
        Ok(HubMessage::Invocation { target, arguments }) => {
            debug!(hub_target = %target, "hub invocation");
            tokio::select! {
                _ = &mut *shutdown => Some(SessionEnd::Shutdown),
                permit = invocations.reserve() => match permit {
                    Ok(permit) => {
                        permit.send(HubInvocation { target, arguments });
                        None
                    }
                    Err(_) => Some(SessionEnd::ReceiverGone),
                },
            }
        }
        Ok(HubMessage::Close {
            error,
            allow_reconnect,
        }) => Some(SessionEnd::ServerClosed {
            error,
            allow_reconnect,
        }),
        Ok(HubMessage::Ping) | Ok(HubMessage::Other(_)) => None,
        Err(err) => {
            warn!(error = %err, "dropping malformed hub frame");
            None
        }
    }
}

async fn reconnect(
    url: &str,
    policy: &ReconnectPolicy,
    state: &watch::Sender<ConnectionState>,
    shutdown: &mut oneshot::Receiver<()>,
) -> Option<Session> {
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        let Some(delay) = policy.delay_for(attempt) else {
            error!(%url, attempts = attempt - 1, "hub reconnect attempts exhausted");
            return None;
        };
        state.send_replace(ConnectionState::Reconnecting { attempt });
        info!(%url, attempt, delay_ms = delay.as_millis() as u64, "hub reconnecting");

        tokio::select! {
            _ = &mut *shutdown => return None,
            _ = tokio::time::sleep(delay) => {}
        }
        tokio::select! {
            _ = &mut *shutdown => return None,
            result = open_session(url) => match result {
                Ok(session) => return Some(session),
                Err(err) => warn!(%url, attempt, error = %err, "hub reconnect attempt failed"),
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/hub_tests.rs"]
mod tests;
