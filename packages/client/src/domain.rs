//! Session policy: identity generation and reconnection decisions.
//!
//! Pure functions, easy to test. Every session gets a fresh identity —
//! identities are opaque per-session tokens, never reused across
//! reconnects.

use uuid::Uuid;

use crate::error::ClientError;

/// Generate a fresh opaque session identity.
pub fn fresh_identity() -> String {
    Uuid::new_v4().to_string()
}

/// Check if the client should exit immediately based on the error type.
///
/// A duplicate identity will stay duplicate; retrying cannot help.
pub fn should_exit_immediately(error: &ClientError) -> bool {
    matches!(error, ClientError::DuplicateClientId(_))
}

/// Check if the client should attempt to reconnect.
///
/// # Arguments
///
/// * `error` - The client error that occurred
/// * `current_attempt` - The current reconnection attempt count (0-indexed)
/// * `max_attempts` - The maximum number of reconnection attempts allowed
pub fn should_attempt_reconnect(
    error: &ClientError,
    current_attempt: u32,
    max_attempts: u32,
) -> bool {
    if should_exit_immediately(error) {
        return false;
    }

    current_attempt < max_attempts
}
