//! Huddle chat client binary.
//!
//! Connects to a chat server, folds the inbound event stream into an
//! ordered log, and submits messages through the HTTP gateway. By default
//! each run gets a fresh generated identity; pass `--client-id` to pin one.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin huddle-client
//! cargo run --bin huddle-client -- --client-id Alice
//! ```

use clap::Parser;

use huddle_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "huddle-client")]
#[command(about = "WebSocket chat client with broadcast support", long_about = None)]
struct Args {
    /// Client ID for this session (defaults to a generated identity)
    #[arg(short = 'c', long)]
    client_id: Option<String>,

    /// WebSocket server URL
    #[arg(short = 'u', long, default_value = "ws://127.0.0.1:8080/ws")]
    url: String,

    /// Server base URL for the message gateway
    #[arg(long, default_value = "http://127.0.0.1:8080")]
    http_url: String,
}

#[tokio::main]
async fn main() {
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    let args = Args::parse();

    if let Err(e) = huddle_client::run_client(args.url, args.http_url, args.client_id).await {
        tracing::error!("Client error: {}", e);
        std::process::exit(1);
    }
}
