//! Chat bridge — the persistent channel to the chat gateway.
//!
//! The WebSocket is blocking, so each session runs it on a dedicated
//! OS thread; commands flow in over a std mpsc sender, events flow out
//! over a tokio channel drained by the async side. `ChatController`
//! owns the visibility gate: a session exists only while recognition
//! says it may, and its log dies with it.

use std::io::ErrorKind;
use std::sync::mpsc::{Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tungstenite::stream::MaybeTlsStream;
use tungstenite::{Error as WsError, Message as WsMessage};
use uuid::Uuid;
use visavis_core::chat::{ChatMessage, ChatSession};
use visavis_core::protocol::{ClientFrame, GatewayFrame};

/// How often the channel thread polls for outbound commands.
const READ_POLL: Duration = Duration::from_millis(200);

/// Commands into the channel thread.
pub enum BridgeCmd {
    Send(String),
    Close,
}

/// Events out of the channel thread: the four handoff points the
/// session logic consumes.
#[derive(Debug)]
pub enum BridgeEvent {
    Opened,
    Frame(GatewayFrame),
    Closed,
    Error(String),
}

/// Connect to the gateway on a fresh thread and return its command
/// and event endpoints.
pub fn spawn_bridge(url: &str) -> (Sender<BridgeCmd>, UnboundedReceiver<BridgeEvent>) {
    let (cmd_tx, cmd_rx) = std::sync::mpsc::channel();
    let (event_tx, event_rx) = tokio::sync::mpsc::unbounded_channel();
    let url = url.to_string();

    std::thread::Builder::new()
        .name("visavis-chat".into())
        .spawn(move || run_channel(&url, cmd_rx, event_tx))
        .expect("failed to spawn chat bridge thread");

    (cmd_tx, event_rx)
}

fn run_channel(url: &str, cmd_rx: Receiver<BridgeCmd>, events: UnboundedSender<BridgeEvent>) {
    let (mut ws, _response) = match tungstenite::connect(url) {
        Ok(pair) => pair,
        Err(err) => {
            tracing::warn!(url, error = %err, "gateway connect failed");
            let _ = events.send(BridgeEvent::Error(err.to_string()));
            return;
        }
    };

    // Short read timeout so the loop can interleave outbound commands
    // with inbound frames on one blocking socket.
    if let MaybeTlsStream::Plain(stream) = ws.get_ref() {
        let _ = stream.set_read_timeout(Some(READ_POLL));
    }

    tracing::info!(url, "gateway channel open");
    let _ = events.send(BridgeEvent::Opened);

    loop {
        match cmd_rx.try_recv() {
            Ok(BridgeCmd::Send(message)) => {
                let frame = ClientFrame::Query { message };
                let Ok(text) = serde_json::to_string(&frame) else {
                    continue;
                };
                if let Err(err) = ws.send(WsMessage::Text(text)) {
                    tracing::warn!(error = %err, "query send failed");
                    let _ = events.send(BridgeEvent::Error(err.to_string()));
                    return;
                }
            }
            Ok(BridgeCmd::Close) | Err(TryRecvError::Disconnected) => {
                let _ = ws.close(None);
                let _ = ws.flush();
                let _ = events.send(BridgeEvent::Closed);
                return;
            }
            Err(TryRecvError::Empty) => {}
        }

        match ws.read() {
            Ok(WsMessage::Text(text)) => match serde_json::from_str::<GatewayFrame>(&text) {
                Ok(frame) => {
                    let _ = events.send(BridgeEvent::Frame(frame));
                }
                Err(err) => tracing::warn!(error = %err, "unparseable gateway frame"),
            },
            Ok(WsMessage::Close(_)) => {
                let _ = events.send(BridgeEvent::Closed);
                return;
            }
            // Binary, ping, pong: nothing to do.
            Ok(_) => {}
            Err(WsError::Io(err))
                if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {}
            Err(WsError::ConnectionClosed) | Err(WsError::AlreadyClosed) => {
                let _ = events.send(BridgeEvent::Closed);
                return;
            }
            Err(err) => {
                tracing::warn!(error = %err, "gateway channel failed");
                let _ = events.send(BridgeEvent::Error(err.to_string()));
                return;
            }
        }
    }
}

struct ActiveBridge {
    session: ChatSession,
    cmd_tx: Sender<BridgeCmd>,
    /// Set while a query awaits its reply; drives the timeout policy.
    pending_since: Option<Instant>,
}

#[derive(Default)]
struct ControllerState {
    /// Last commanded visibility. A failed channel does NOT reset
    /// this: reconnection happens only on a false→true edge.
    visible: bool,
    active: Option<ActiveBridge>,
}

/// Visibility-gated chat session manager.
#[derive(Clone)]
pub struct ChatController {
    gateway_url: String,
    query_timeout: Duration,
    state: Arc<Mutex<ControllerState>>,
}

impl ChatController {
    pub fn new(gateway_url: &str, query_timeout: Duration) -> Self {
        Self {
            gateway_url: gateway_url.to_string(),
            query_timeout,
            state: Arc::new(Mutex::new(ControllerState::default())),
        }
    }

    /// Apply the recognition loop's visibility verdict. Idempotent per
    /// level; only edges connect or tear down.
    pub async fn set_visible(&self, visible: bool) {
        let mut state = self.state.lock().await;
        if state.visible == visible {
            return;
        }
        state.visible = visible;

        if visible {
            let session = ChatSession::connecting();
            let session_id = session.id;
            let (cmd_tx, events) = spawn_bridge(&self.gateway_url);
            state.active = Some(ActiveBridge { session, cmd_tx, pending_since: None });
            tokio::spawn(drain_events(
                Arc::clone(&self.state),
                events,
                session_id,
                self.query_timeout,
            ));
            tracing::info!(id = %session_id, "chat session connecting");
        } else if let Some(active) = state.active.take() {
            let _ = active.cmd_tx.send(BridgeCmd::Close);
            tracing::info!(
                id = %active.session.id,
                messages = active.session.log().len(),
                "chat session closed; log discarded"
            );
        }
    }

    /// Forward a user query. No-op unless the channel is open and the
    /// text is non-blank; the user message is logged before the frame
    /// goes out.
    pub async fn send(&self, text: &str) {
        let mut state = self.state.lock().await;
        let Some(active) = state.active.as_mut() else {
            return;
        };
        let Some(wire) = active.session.push_user(text) else {
            return;
        };
        match active.cmd_tx.send(BridgeCmd::Send(wire)) {
            Ok(()) => {
                if active.pending_since.is_none() {
                    active.pending_since = Some(Instant::now());
                }
            }
            Err(_) => {
                tracing::warn!("chat channel gone; closing session");
                state.active = None;
            }
        }
    }

    pub async fn is_open(&self) -> bool {
        self.state
            .lock()
            .await
            .active
            .as_ref()
            .map(|a| a.session.is_open())
            .unwrap_or(false)
    }

    pub async fn has_session(&self) -> bool {
        self.state.lock().await.active.is_some()
    }

    pub async fn log_snapshot(&self) -> Vec<ChatMessage> {
        self.state
            .lock()
            .await
            .active
            .as_ref()
            .map(|a| a.session.log().to_vec())
            .unwrap_or_default()
    }
}

/// Apply bridge events to the session they belong to. Exits as soon as
/// the session is superseded or torn down.
async fn drain_events(
    state: Arc<Mutex<ControllerState>>,
    mut events: UnboundedReceiver<BridgeEvent>,
    session_id: Uuid,
    query_timeout: Duration,
) {
    loop {
        let deadline = {
            let guard = state.lock().await;
            match guard.active.as_ref() {
                Some(active) if active.session.id == session_id => {
                    active.pending_since.map(|since| since + query_timeout)
                }
                _ => return,
            }
        };

        let event = match deadline {
            Some(deadline) => match tokio::time::timeout_at(deadline, events.recv()).await {
                Ok(event) => event,
                Err(_) => {
                    // The gateway never replied: close the channel,
                    // but keep the session so the timeout message is
                    // readable in the log until visibility revokes it.
                    let mut guard = state.lock().await;
                    if let Some(active) = guard.active.as_mut() {
                        if active.session.id == session_id {
                            active.session.push_local_error("assistant did not reply in time");
                            active.session.channel_closed();
                            let _ = active.cmd_tx.send(BridgeCmd::Close);
                            tracing::warn!(id = %session_id, "chat query timed out; channel closed");
                        }
                    }
                    return;
                }
            },
            // No pending query: wake periodically so one sent while we
            // were waiting still gets a deadline.
            None => match tokio::time::timeout(READ_POLL, events.recv()).await {
                Ok(event) => event,
                Err(_) => continue,
            },
        };

        let Some(event) = event else {
            // Channel thread gone without a final event.
            let mut guard = state.lock().await;
            if let Some(active) = guard.active.as_ref() {
                if active.session.id == session_id {
                    tracing::warn!(id = %session_id, "chat channel terminated; closing session");
                    guard.active = None;
                }
            }
            return;
        };

        let mut guard = state.lock().await;
        let Some(active) = guard.active.as_mut() else {
            return;
        };
        if active.session.id != session_id {
            return;
        }

        match event {
            BridgeEvent::Opened => {
                active.session.channel_opened();
                tracing::info!(id = %session_id, "chat channel established");
            }
            BridgeEvent::Frame(frame) => {
                if matches!(frame, GatewayFrame::Response { .. } | GatewayFrame::Error { .. }) {
                    active.pending_since = None;
                }
                tracing::info!(id = %session_id, message = frame.message(), "gateway message");
                active.session.apply_frame(&frame);
            }
            BridgeEvent::Error(message) => {
                tracing::warn!(id = %session_id, error = %message, "chat channel error; closing session");
                guard.active = None;
                return;
            }
            BridgeEvent::Closed => {
                tracing::info!(id = %session_id, "chat channel closed");
                guard.active = None;
                return;
            }
        }
    }
}
