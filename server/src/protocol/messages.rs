use crate::demo::DemoView;
use serde::{Deserialize, Serialize};

/// Client to Server messages
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Start the scripted demo run
    Start { seq: u64 },
    /// Reset metrics to baseline
    Reset { seq: u64 },
    /// Replay an uploaded transaction file
    Ingest { contents: String, seq: u64 },
    /// Ping for keepalive
    Ping { seq: u64 },
}

/// Server to Client messages
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Latest demo state (sent on connect and after every step)
    State { view: DemoView },
    /// Acknowledgment of client action
    Ack {
        ack_seq: u64,
        status: AckStatus,
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    /// Client message could not be handled
    Error { code: ErrorCode, message: String },
    /// Pong response (to client's Ping)
    Pong,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AckStatus {
    Ok,
    Rejected,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    InvalidMessage,
}

/// Response to an HTTP demo command
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandResponse {
    /// False when the command was a no-op (e.g. start while running)
    pub accepted: bool,
    pub view: DemoView,
}

impl ClientMessage {
    /// Get the message type name for metrics
    pub fn message_type(&self) -> &'static str {
        match self {
            ClientMessage::Start { .. } => "start",
            ClientMessage::Reset { .. } => "reset",
            ClientMessage::Ingest { .. } => "ingest",
            ClientMessage::Ping { .. } => "ping",
        }
    }

    pub fn seq(&self) -> u64 {
        match self {
            ClientMessage::Start { seq }
            | ClientMessage::Reset { seq }
            | ClientMessage::Ingest { seq, .. }
            | ClientMessage::Ping { seq } => *seq,
        }
    }
}

impl ServerMessage {
    /// Get the message type name for metrics
    pub fn message_type(&self) -> &'static str {
        match self {
            ServerMessage::State { .. } => "state",
            ServerMessage::Ack { .. } => "ack",
            ServerMessage::Error { .. } => "error",
            ServerMessage::Pong => "pong",
        }
    }
}
