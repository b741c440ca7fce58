//! WebSocket client session management.
//!
//! One session is one connection lifetime: `Connecting → Open → Closing →
//! Closed`. The view is reset on entering `Open` and all inbound events are
//! folded by a single consumption loop, so the ordered log never races
//! local input.

use futures_util::{SinkExt, StreamExt};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};

use huddle_shared::event::Event;

use crate::{
    composer::{Composer, TypingSignal},
    error::ClientError,
    formatter::MessageFormatter,
    gateway::MessageGateway,
    ui::redisplay_prompt,
    view::{ClientView, ViewEffect},
};

/// Lifecycle of one client connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Open,
    Closing,
    Closed,
}

impl SessionState {
    /// Sends are accepted only while the session is open.
    pub fn can_send(self) -> bool {
        matches!(self, SessionState::Open)
    }
}

/// Run one client session until the connection ends.
///
/// # Arguments
///
/// * `ws_url` - WebSocket endpoint (e.g. `ws://127.0.0.1:8080/ws`)
/// * `http_url` - Server base URL for the message gateway
/// * `client_id` - This session's identity
pub async fn run_client_session(
    ws_url: &str,
    http_url: &str,
    client_id: &str,
) -> Result<(), ClientError> {
    let mut state = SessionState::Connecting;
    tracing::debug!("Session state: {:?}", state);

    let url = format!("{}?client_id={}", ws_url, client_id);

    let (ws_stream, response) = match connect_async(&url).await {
        Ok(result) => result,
        Err(e) => {
            let error_msg = e.to_string();

            // The hub refuses a second session under the same identity.
            if error_msg.contains("409") || error_msg.contains("Conflict") {
                return Err(ClientError::DuplicateClientId(client_id.to_string()));
            }

            return Err(ClientError::ConnectionError(error_msg));
        }
    };

    if response.status().as_u16() == 409 {
        return Err(ClientError::DuplicateClientId(client_id.to_string()));
    }

    state = SessionState::Open;
    tracing::debug!("Session state: {:?}", state);
    tracing::info!("Connected to chat server!");
    println!(
        "\nYou are '{}'. Type messages and press Enter to send. Type /sound to ring everyone. Press Ctrl+C to exit.\n",
        client_id
    );

    let (mut write, mut read) = ws_stream.split();

    let client_id_for_read = client_id.to_string();

    // Inbound loop: the sole writer of the view. Every frame is decoded,
    // folded, and its effects rendered.
    let mut read_task = tokio::spawn(async move {
        // Fresh view per session: no history replay.
        let mut view = ClientView::new(client_id_for_read.clone());
        let mut connection_error = false;

        while let Some(message) = read.next().await {
            match message {
                Ok(Message::Text(text)) => {
                    let event = match Event::decode(&text) {
                        Ok(event) => event,
                        Err(e) => {
                            // Local to this frame; the session stays up.
                            tracing::debug!("Ignoring malformed frame: {}", e);
                            continue;
                        }
                    };

                    for effect in view.apply(event) {
                        render_effect(&effect, &client_id_for_read);
                    }
                    redisplay_prompt(&client_id_for_read);
                }
                Ok(Message::Close(_)) => {
                    tracing::info!("Server closed the connection");
                    connection_error = true;
                    break;
                }
                Err(e) => {
                    tracing::warn!("WebSocket read error: {}", e);
                    connection_error = true;
                    break;
                }
                _ => {}
            }
        }

        connection_error
    });

    let client_id = client_id.to_string();
    let client_id_for_prompt = client_id.clone();

    // Channel bridging the blocking readline thread into the async session
    let (input_tx, mut input_rx) = mpsc::unbounded_channel::<String>();

    let _readline_handle = std::thread::spawn(move || {
        let mut rl = match DefaultEditor::new() {
            Ok(rl) => rl,
            Err(e) => {
                eprintln!("Failed to initialize readline: {}", e);
                return;
            }
        };

        let prompt = format!("{}> ", client_id_for_prompt);

        loop {
            match rl.readline(&prompt) {
                Ok(line) => {
                    let line = line.trim();
                    if !line.is_empty() {
                        rl.add_history_entry(line).ok();
                        if input_tx.send(line.to_string()).is_err() {
                            // Session ended, exit thread
                            break;
                        }
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    tracing::info!("Interrupted");
                    break;
                }
                Err(ReadlineError::Eof) => {
                    tracing::info!("EOF");
                    break;
                }
                Err(err) => {
                    tracing::error!("Readline error: {}", err);
                    break;
                }
            }
        }
    });

    let gateway = MessageGateway::new(http_url);

    // Outbound loop: typing edges and sound cues go over the WebSocket,
    // message text goes through the gateway. Fire-and-forget throughout.
    let mut write_task = tokio::spawn(async move {
        let mut composer = Composer::new();
        let mut write_error = false;

        while let Some(line) = input_rx.recv().await {
            if line == "/sound" {
                let event = Event::PlaySound {
                    sender: client_id.clone(),
                };
                if send_event(&mut write, &event).await.is_err() {
                    write_error = true;
                    break;
                }
                continue;
            }

            // The line editor hands us whole lines, so the edge-triggered
            // composer sees one non-empty edge before the send and one
            // empty edge after it.
            if let Some(signal) = composer.set_input(&line)
                && send_typing_signal(&mut write, signal, &client_id)
                    .await
                    .is_err()
            {
                write_error = true;
                break;
            }

            match gateway.submit(&line, &client_id).await {
                Ok(()) => {}
                Err(ClientError::SubmitRejected(reason)) => {
                    println!("\nMessage rejected: {}", reason);
                }
                Err(e) => {
                    tracing::warn!("Gateway submission failed: {}", e);
                }
            }

            if let Some(signal) = composer.clear()
                && send_typing_signal(&mut write, signal, &client_id)
                    .await
                    .is_err()
            {
                write_error = true;
                break;
            }
        }

        write_error
    });

    // If either side ends, tear the other down.
    let had_error = tokio::select! {
        read_result = &mut read_task => {
            write_task.abort();
            read_result.unwrap_or(false)
        }
        write_result = &mut write_task => {
            read_task.abort();
            write_result.unwrap_or(false)
        }
    };

    state = SessionState::Closing;
    tracing::debug!("Session state: {:?}", state);
    state = SessionState::Closed;
    tracing::debug!("Session state: {:?}", state);

    if had_error {
        return Err(ClientError::ConnectionError("Connection lost".to_string()));
    }

    Ok(())
}

fn render_effect(effect: &ViewEffect, self_identity: &str) {
    match effect {
        ViewEffect::Appended(message) if message.system => {
            print!("{}", MessageFormatter::format_system_notice(message));
        }
        ViewEffect::Appended(message) => {
            print!(
                "{}",
                MessageFormatter::format_chat_message(message, self_identity)
            );
        }
        ViewEffect::Presence(count) => {
            print!("{}", MessageFormatter::format_presence(*count));
        }
        ViewEffect::Typing(true) => {
            print!("{}", MessageFormatter::format_typing_indicator());
        }
        ViewEffect::Typing(false) => {}
        ViewEffect::SoundRequested(sender) => {
            print!("{}", MessageFormatter::format_sound_cue(sender));
        }
    }
}

async fn send_event<S>(write: &mut S, event: &Event) -> Result<(), ()>
where
    S: SinkExt<Message> + Unpin,
{
    let json = match event.encode() {
        Ok(json) => json,
        Err(e) => {
            tracing::error!("Failed to serialize event: {}", e);
            return Ok(());
        }
    };

    if write.send(Message::Text(json.into())).await.is_err() {
        tracing::warn!("Failed to send event");
        return Err(());
    }

    Ok(())
}

async fn send_typing_signal<S>(
    write: &mut S,
    signal: TypingSignal,
    client_id: &str,
) -> Result<(), ()>
where
    S: SinkExt<Message> + Unpin,
{
    let event = match signal {
        TypingSignal::Started => Event::Typing {
            sender: client_id.to_string(),
        },
        TypingSignal::Stopped => Event::NotTyping {
            sender: client_id.to_string(),
        },
    };
    send_event(write, &event).await
}
