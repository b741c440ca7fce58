//! Wire-level event envelope shared by the hub and its clients.
//!
//! Every frame on the realtime connection is one JSON object tagged by a
//! `"type"` field. Decoding is strict about the shape of known tags but
//! tolerant of unknown ones: a tag this build does not know decodes to
//! [`Event::Ignored`] so an older client can survive a newer hub mid-session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A chat message. Immutable once constructed; the id is assigned by the
/// server (gateway path) or taken from a local range (client-synthesized
/// system notices) and is unique within a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: u64,
    pub text: String,
    pub sender: String,
    pub timestamp: DateTime<Utc>,
    /// Marks hub/client-synthesized notices (join/leave) as opposed to
    /// user-authored text. Omitted from the wire when false.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub system: bool,
}

impl ChatMessage {
    /// Create a user-authored message.
    pub fn new(id: u64, text: String, sender: String, timestamp: DateTime<Utc>) -> Self {
        Self {
            id,
            text,
            sender,
            timestamp,
            system: false,
        }
    }

    /// Create a synthesized system notice (join/leave).
    pub fn system(id: u64, text: String, timestamp: DateTime<Utc>) -> Self {
        Self {
            id,
            text,
            sender: "system".to_string(),
            timestamp,
            system: true,
        }
    }
}

/// One wire-level event exchanged over the realtime connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A chat message, broadcast by the hub after submission.
    Message { message: ChatMessage },
    /// A client's input transitioned from empty to non-empty.
    Typing { sender: String },
    /// A client's input transitioned back to empty.
    NotTyping { sender: String },
    /// A connection was accepted; carries the updated presence count.
    UserJoined {
        count: usize,
        timestamp: DateTime<Utc>,
    },
    /// A connection was closed; carries the updated presence count.
    UserLeft {
        count: usize,
        timestamp: DateTime<Utc>,
    },
    /// Broadcast-only audio cue, no hub state effect.
    PlaySound { sender: String },
    /// Presence count push, sent to a connection on accept.
    ConnectionCount { count: usize },
    /// Catch-all for tags this build does not know. Never sent.
    #[serde(other)]
    Ignored,
}

/// Error returned when an inbound frame cannot be decoded.
///
/// Decode errors are local to the offending frame: the handler drops the
/// frame and keeps the connection alive.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Missing `"type"` tag, or payload fields that do not match the tag.
    #[error("malformed event payload: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl Event {
    /// Encode this event to its JSON wire form.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Decode an event from its JSON wire form.
    pub fn decode(payload: &str) -> Result<Self, DecodeError> {
        Ok(serde_json::from_str(payload)?)
    }

    /// The sender identity this event claims, for events that carry one.
    ///
    /// The hub checks this claim against the connection's authenticated
    /// identity before broadcasting, so one client cannot spoof another.
    pub fn claimed_sender(&self) -> Option<&str> {
        match self {
            Event::Message { message } => Some(&message.sender),
            Event::Typing { sender } | Event::NotTyping { sender } | Event::PlaySound { sender } => {
                Some(sender)
            }
            _ => None,
        }
    }
}
