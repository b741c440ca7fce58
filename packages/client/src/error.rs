//! Error types for the Huddle client.

use thiserror::Error;

/// Client-specific errors
#[derive(Debug, Error)]
pub enum ClientError {
    /// Client ID is already in use
    #[error("Client ID '{0}' is already connected")]
    DuplicateClientId(String),

    /// Connection error
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The gateway refused a submitted message
    #[error("Message rejected by the gateway: {0}")]
    SubmitRejected(String),
}
