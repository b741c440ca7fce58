//! HTTP entry point for submitting messages.
//!
//! Messages are not sent over the realtime channel: they go through the
//! hub's submission gateway, which assigns the id and timestamp and then
//! broadcasts the accepted message to every connection — this one included,
//! which is how the submitter's own log gains the message.

use serde::Serialize;

use crate::error::ClientError;

#[derive(Debug, Serialize)]
struct SubmitMessageRequest<'a> {
    text: &'a str,
    sender: &'a str,
}

/// Client for the hub's message submission endpoint.
pub struct MessageGateway {
    http: reqwest::Client,
    endpoint: String,
}

impl MessageGateway {
    /// Create a gateway client for a server base URL (e.g.
    /// `http://127.0.0.1:8080`).
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: format!("{}/api/messages", base_url.trim_end_matches('/')),
        }
    }

    /// Submit one message. Fire-and-forget beyond the status: the accepted
    /// message comes back over the realtime channel.
    pub async fn submit(&self, text: &str, sender: &str) -> Result<(), ClientError> {
        let response = self
            .http
            .post(&self.endpoint)
            .json(&SubmitMessageRequest { text, sender })
            .send()
            .await
            .map_err(|e| ClientError::ConnectionError(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else if status == reqwest::StatusCode::UNPROCESSABLE_ENTITY {
            Err(ClientError::SubmitRejected("empty message text".to_string()))
        } else {
            Err(ClientError::ConnectionError(format!(
                "gateway returned {status}"
            )))
        }
    }
}
