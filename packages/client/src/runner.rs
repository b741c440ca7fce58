//! Client execution logic with reconnection support.

use std::time::Duration;

use crate::{
    domain::{fresh_identity, should_attempt_reconnect, should_exit_immediately},
    error::ClientError,
    session::run_client_session,
};

const MAX_RECONNECT_ATTEMPTS: u32 = 5;
const RECONNECT_INTERVAL_SECS: u64 = 5;

/// Run the client, reconnecting on connection loss.
///
/// Every attempt is a fresh session: the view is rebuilt from scratch and,
/// unless the caller pinned a `client_id`, a fresh identity is generated —
/// identities are never reused across reconnects.
pub async fn run_client(
    ws_url: String,
    http_url: String,
    client_id: Option<String>,
) -> Result<(), ClientError> {
    let mut reconnect_count = 0;

    loop {
        let identity = client_id.clone().unwrap_or_else(fresh_identity);

        tracing::info!(
            "Attempting to connect to {} as '{}' (attempt {}/{})",
            ws_url,
            identity,
            reconnect_count + 1,
            MAX_RECONNECT_ATTEMPTS
        );

        match run_client_session(&ws_url, &http_url, &identity).await {
            Ok(()) => {
                tracing::info!("Client session ended normally");
                break;
            }
            Err(e) => {
                if should_exit_immediately(&e) {
                    tracing::error!("{}", e);
                    return Err(e);
                }

                tracing::warn!("Connection lost: {}", e);
                reconnect_count += 1;

                if !should_attempt_reconnect(&e, reconnect_count, MAX_RECONNECT_ATTEMPTS) {
                    tracing::error!(
                        "Failed to reconnect after {} attempts. Exiting.",
                        MAX_RECONNECT_ATTEMPTS
                    );
                    return Err(e);
                }

                tracing::info!(
                    "Reconnecting in {} seconds... (attempt {}/{})",
                    RECONNECT_INTERVAL_SECS,
                    reconnect_count + 1,
                    MAX_RECONNECT_ATTEMPTS
                );

                tokio::time::sleep(Duration::from_secs(RECONNECT_INTERVAL_SECS)).await;
            }
        }
    }

    Ok(())
}
