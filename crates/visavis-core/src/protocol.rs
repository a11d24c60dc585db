//! Chat gateway wire protocol — JSON frames over a persistent
//! bidirectional channel.

use serde::{Deserialize, Serialize};

/// Frames the client sends to the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientFrame {
    Query { message: String },
}

/// Frames the gateway sends to the client.
///
/// The gateway answers every query with exactly one `response` or one
/// `error`; `system` frames may arrive at any time (the gateway greets
/// each new connection with one).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum GatewayFrame {
    Response { message: String },
    System { message: String },
    Error { message: String },
}

impl GatewayFrame {
    pub fn message(&self) -> &str {
        match self {
            GatewayFrame::Response { message }
            | GatewayFrame::System { message }
            | GatewayFrame::Error { message } => message,
        }
    }
}
