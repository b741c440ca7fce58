//! Error types for the Huddle server.

use thiserror::Error;

/// Errors from hub operations on the realtime path.
#[derive(Debug, Error)]
pub enum HubError {
    /// The identity already has an open connection in this room.
    #[error("identity '{0}' is already connected")]
    DuplicateIdentity(String),

    /// An event claimed a sender other than the connection it arrived on.
    #[error("event sender '{claimed}' does not match connection identity '{connection}'")]
    SenderMismatch { connection: String, claimed: String },
}

/// Errors from the message submission gateway.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// The submitted text was blank or whitespace-only.
    #[error("message text is empty")]
    EmptyText,
}
