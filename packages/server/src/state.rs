//! Server state and connection query types.

use serde::Deserialize;

use crate::hub::Hub;

/// Query parameters for WebSocket connection
#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    pub client_id: String,
}

/// Shared application state
pub struct AppState {
    /// The connection hub for the single room this server hosts
    pub hub: Hub,
}
