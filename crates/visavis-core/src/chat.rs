//! Chat session state — connection lifecycle and the append-only
//! message log. Transport lives elsewhere; this module only decides
//! what a session may do and records what happened, in order.

use uuid::Uuid;

use crate::protocol::GatewayFrame;

/// Connection lifecycle of the bridge channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatConnection {
    Closed,
    Connecting,
    Open,
}

/// Who a log entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatOrigin {
    User,
    Assistant,
    System,
    Error,
}

/// One entry in the session log. `seq` increases strictly in append
/// order and never reorders.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub origin: ChatOrigin,
    pub text: String,
    pub seq: u64,
}

/// One recognized-face chat window.
///
/// Created when recognition turns visible, discarded wholesale when
/// visibility is revoked or the channel fails — the log never persists
/// across sessions.
#[derive(Debug)]
pub struct ChatSession {
    pub id: Uuid,
    connection: ChatConnection,
    log: Vec<ChatMessage>,
    next_seq: u64,
}

impl ChatSession {
    /// A fresh session in `Connecting`: the channel is being opened.
    pub fn connecting() -> Self {
        Self {
            id: Uuid::new_v4(),
            connection: ChatConnection::Connecting,
            log: Vec::new(),
            next_seq: 0,
        }
    }

    pub fn connection(&self) -> ChatConnection {
        self.connection
    }

    pub fn is_open(&self) -> bool {
        self.connection == ChatConnection::Open
    }

    pub fn log(&self) -> &[ChatMessage] {
        &self.log
    }

    pub fn channel_opened(&mut self) {
        self.connection = ChatConnection::Open;
    }

    pub fn channel_closed(&mut self) {
        self.connection = ChatConnection::Closed;
    }

    fn append(&mut self, origin: ChatOrigin, text: String) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.log.push(ChatMessage { origin, text, seq });
    }

    /// Record an outbound user message, returning the query text to
    /// transmit. Empty or whitespace-only text, or a channel that is
    /// not open, makes this a no-op.
    ///
    /// The local append happens before transmission, so program order
    /// is preserved even if the send later fails.
    pub fn push_user(&mut self, text: &str) -> Option<String> {
        let trimmed = text.trim();
        if trimmed.is_empty() || !self.is_open() {
            return None;
        }
        let message = trimmed.to_string();
        self.append(ChatOrigin::User, message.clone());
        Some(message)
    }

    /// Record an inbound gateway frame. Frames are appended in arrival
    /// order; none of them triggers any recognition-service traffic.
    pub fn apply_frame(&mut self, frame: &GatewayFrame) {
        let origin = match frame {
            GatewayFrame::Response { .. } => ChatOrigin::Assistant,
            GatewayFrame::System { .. } => ChatOrigin::System,
            GatewayFrame::Error { .. } => ChatOrigin::Error,
        };
        self.append(origin, frame.message().to_string());
    }

    /// Record a locally generated error (channel failure, timeout).
    pub fn push_local_error(&mut self, text: &str) {
        self.append(ChatOrigin::Error, text.to_string());
    }
}
