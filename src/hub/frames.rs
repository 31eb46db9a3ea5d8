// Participants, messages and the outbound frames the hub emits.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::moderation::Decision;

pub type ParticipantId = Uuid;

/// What a connection is allowed to do in the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Submits messages and sees its own text echoed back unmodified.
    Sender,
    /// Sees the moderated text of every sender's messages.
    Receiver,
    /// Sees the full decision for every message.
    Moderator,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::Sender => "sender",
            Role::Receiver => "receiver",
            Role::Moderator => "moderator",
        })
    }
}

/// Lifecycle of a participant connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Transport handshake in progress, not yet routable.
    Connecting,
    /// Registered with the hub and receiving frames.
    Open,
    /// Removed from routing.
    Closed,
}

/// A chat message as received from a sender. Never mutated.
#[derive(Debug, Clone)]
pub struct Message {
    pub id: Uuid,
    pub text: String,
    pub sender_id: ParticipantId,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(sender_id: ParticipantId, text: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.to_string(),
            sender_id,
            timestamp: Utc::now(),
        }
    }
}

/// Everything the hub can push to a participant. Serialized as JSON with a
/// `type` tag for the wire.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Frame {
    /// The sender's own text, sent back immediately.
    Echo {
        message_id: Uuid,
        text: String,
        timestamp: DateTime<Utc>,
    },
    /// What receivers see. `moderated` is true when the text was replaced.
    Message {
        message_id: Uuid,
        sender_id: ParticipantId,
        text: String,
        moderated: bool,
        timestamp: DateTime<Utc>,
    },
    /// Moderator view of a decision.
    Audit {
        message_id: Uuid,
        sender_id: ParticipantId,
        original: String,
        delivered: String,
        toxic: bool,
        score: f64,
        provider: String,
    },
}

impl Frame {
    pub fn echo(message: &Message) -> Self {
        Frame::Echo {
            message_id: message.id,
            text: message.text.clone(),
            timestamp: message.timestamp,
        }
    }

    pub fn delivery(message: &Message, decision: &Decision) -> Self {
        Frame::Message {
            message_id: message.id,
            sender_id: message.sender_id,
            text: decision.delivered_text.clone(),
            moderated: decision.is_toxic,
            timestamp: message.timestamp,
        }
    }

    pub fn audit(message: &Message, decision: &Decision) -> Self {
        Frame::Audit {
            message_id: message.id,
            sender_id: message.sender_id,
            original: message.text.clone(),
            delivered: decision.delivered_text.clone(),
            toxic: decision.is_toxic,
            score: decision.score,
            provider: decision.used_provider.to_string(),
        }
    }

    /// Text carried by echo and delivery frames.
    pub fn text(&self) -> &str {
        match self {
            Frame::Echo { text, .. } | Frame::Message { text, .. } => text,
            Frame::Audit { delivered, .. } => delivered,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_echo_frame_json() {
        let message = Message::new(Uuid::new_v4(), "hello");
        let value = serde_json::to_value(Frame::echo(&message)).unwrap();
        assert_eq!(value["type"], "echo");
        assert_eq!(value["text"], "hello");
    }

    #[test]
    fn test_role_serializes_lowercase() {
        assert_eq!(serde_json::to_value(Role::Receiver).unwrap(), "receiver");
        assert_eq!(Role::Moderator.to_string(), "moderator");
    }
}
