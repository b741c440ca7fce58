//! The connection hub: registry of live connections, room state, and
//! broadcast fan-out.
//!
//! All state mutation happens under a single lock, so presence count, the
//! typing set, and per-recipient delivery order are consistent with one
//! linearizable admission history. Each connection owns a bounded outbound
//! queue; a recipient that falls behind is dropped rather than stalling the
//! room.

use std::{
    collections::{HashMap, HashSet},
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use serde::Serialize;
use tokio::sync::{
    Mutex,
    mpsc::{self, error::TrySendError},
};

use huddle_shared::{
    event::{ChatMessage, Event},
    time::Clock,
};

use crate::error::{HubError, SubmitError};

/// Capacity of each connection's outbound queue. On overflow the connection
/// is treated as failed and closed.
pub const OUTBOUND_QUEUE_CAPACITY: usize = 256;

/// A live connection's hub-side endpoint: the sending half of its bounded
/// outbound queue.
struct Connection {
    tx: mpsc::Sender<String>,
}

/// Room state owned by the hub. Invariants: presence count equals the number
/// of registered connections, and the typing set only contains registered
/// identities.
#[derive(Default)]
struct RoomState {
    connections: HashMap<String, Connection>,
    typing: HashSet<String>,
}

/// Point-in-time copy of the room state, for the debug endpoint and tests.
#[derive(Debug, Clone, Serialize)]
pub struct RoomSnapshot {
    pub count: usize,
    pub typing: Vec<String>,
}

/// The connection hub for one room.
pub struct Hub {
    state: Mutex<RoomState>,
    next_message_id: AtomicU64,
    queue_capacity: usize,
    clock: Arc<dyn Clock>,
}

impl Hub {
    /// Create a hub with the default outbound queue capacity.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_queue_capacity(clock, OUTBOUND_QUEUE_CAPACITY)
    }

    /// Create a hub with a custom outbound queue capacity.
    pub fn with_queue_capacity(clock: Arc<dyn Clock>, queue_capacity: usize) -> Self {
        Self {
            state: Mutex::new(RoomState::default()),
            next_message_id: AtomicU64::new(1),
            queue_capacity,
            clock,
        }
    }

    /// Register a new connection under `identity`.
    ///
    /// Pushes the current presence count to the new connection and broadcasts
    /// `user_joined` with the updated count to everyone else. Returns the
    /// receiving half of the connection's outbound queue.
    ///
    /// # Errors
    ///
    /// `DuplicateIdentity` if the identity already has an open connection.
    pub async fn accept(&self, identity: &str) -> Result<mpsc::Receiver<String>, HubError> {
        let mut state = self.state.lock().await;

        if state.connections.contains_key(identity) {
            return Err(HubError::DuplicateIdentity(identity.to_string()));
        }

        let (tx, rx) = mpsc::channel(self.queue_capacity);
        state.connections.insert(identity.to_string(), Connection { tx });
        let count = state.connections.len();
        tracing::info!("Connection '{}' accepted, {} in room", identity, count);

        self.fan_out(
            &mut state,
            &Event::ConnectionCount { count },
            Exclude::AllBut(identity),
        );
        self.fan_out(
            &mut state,
            &Event::UserJoined {
                count,
                timestamp: self.clock.now(),
            },
            Exclude::Sender(identity),
        );

        Ok(rx)
    }

    /// Accept an event submitted over `identity`'s connection.
    ///
    /// The event's claimed sender must match the connection identity; a
    /// mismatch is rejected so one client cannot spoof another. Hub-owned
    /// tags (`user_joined`, `user_left`, `connection_count`) are never
    /// accepted from clients. The event is broadcast to every other open
    /// connection.
    pub async fn submit(&self, identity: &str, event: Event) -> Result<(), HubError> {
        if let Some(claimed) = event.claimed_sender()
            && claimed != identity
        {
            return Err(HubError::SenderMismatch {
                connection: identity.to_string(),
                claimed: claimed.to_string(),
            });
        }

        match event {
            Event::Message { .. } | Event::PlaySound { .. } => {
                let mut state = self.state.lock().await;
                self.fan_out(&mut state, &event, Exclude::Sender(identity));
            }
            Event::Typing { .. } => {
                let mut state = self.state.lock().await;
                state.typing.insert(identity.to_string());
                self.fan_out(&mut state, &event, Exclude::Sender(identity));
            }
            Event::NotTyping { .. } => {
                let mut state = self.state.lock().await;
                state.typing.remove(identity);
                self.fan_out(&mut state, &event, Exclude::Sender(identity));
            }
            Event::UserJoined { .. }
            | Event::UserLeft { .. }
            | Event::ConnectionCount { .. }
            | Event::Ignored => {
                tracing::debug!(
                    "Dropping hub-owned or unknown event tag submitted by '{}'",
                    identity
                );
            }
        }

        Ok(())
    }

    /// Remove `identity`'s connection and broadcast `user_left` with the
    /// decremented count to everyone remaining. Idempotent: a connection
    /// already dropped by the slow-consumer path is a no-op.
    pub async fn close(&self, identity: &str) {
        let mut state = self.state.lock().await;

        if state.connections.remove(identity).is_none() {
            return;
        }
        state.typing.remove(identity);
        let count = state.connections.len();
        tracing::info!("Connection '{}' closed, {} in room", identity, count);

        self.fan_out(
            &mut state,
            &Event::UserLeft {
                count,
                timestamp: self.clock.now(),
            },
            Exclude::None,
        );
    }

    /// The message submission gateway path: construct a message with a
    /// server-assigned id and timestamp, then broadcast it to every open
    /// connection, the submitter included. Clients build their log solely
    /// from the event stream, so the gateway echoes; id-dedup on the client
    /// makes any redelivery a no-op.
    ///
    /// # Errors
    ///
    /// `EmptyText` if the text is blank or whitespace-only.
    pub async fn publish_message(
        &self,
        text: &str,
        sender: &str,
    ) -> Result<ChatMessage, SubmitError> {
        if text.trim().is_empty() {
            return Err(SubmitError::EmptyText);
        }

        let id = self.next_message_id.fetch_add(1, Ordering::Relaxed);
        let message = ChatMessage::new(id, text.to_string(), sender.to_string(), self.clock.now());

        let mut state = self.state.lock().await;
        self.fan_out(
            &mut state,
            &Event::Message {
                message: message.clone(),
            },
            Exclude::None,
        );

        Ok(message)
    }

    /// Current presence count.
    pub async fn connection_count(&self) -> usize {
        self.state.lock().await.connections.len()
    }

    /// Snapshot of the room state, typing set sorted for stable output.
    pub async fn snapshot(&self) -> RoomSnapshot {
        let state = self.state.lock().await;
        let mut typing: Vec<String> = state.typing.iter().cloned().collect();
        typing.sort();
        RoomSnapshot {
            count: state.connections.len(),
            typing,
        }
    }

    /// Encode `event` once and deliver it per the exclusion rule. Slow or
    /// closed recipients discovered during delivery are removed from the
    /// registry, and the survivors hear a `user_left` for each of them; that
    /// can in turn drop more recipients, so the cleanup loops until the
    /// registry is stable. Runs entirely under the state lock held by the
    /// caller.
    fn fan_out(&self, state: &mut RoomState, event: &Event, exclude: Exclude<'_>) {
        let payload = match event.encode() {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!("Failed to encode event for fan-out: {}", e);
                return;
            }
        };

        let mut dropped = Self::deliver(state, &payload, exclude);
        while !dropped.is_empty() {
            let mut next = Vec::new();
            for identity in dropped {
                state.typing.remove(&identity);
                tracing::warn!(
                    "Dropped slow consumer '{}', {} in room",
                    identity,
                    state.connections.len()
                );
                let left = Event::UserLeft {
                    count: state.connections.len(),
                    timestamp: self.clock.now(),
                };
                match left.encode() {
                    Ok(payload) => next.extend(Self::deliver(state, &payload, Exclude::None)),
                    Err(e) => tracing::error!("Failed to encode user_left: {}", e),
                }
            }
            dropped = next;
        }
    }

    /// Deliver one encoded payload, removing and returning the identities
    /// whose queues overflowed or whose receivers were gone.
    fn deliver(state: &mut RoomState, payload: &str, exclude: Exclude<'_>) -> Vec<String> {
        let mut failed = Vec::new();

        for (identity, connection) in &state.connections {
            if !exclude.delivers_to(identity) {
                continue;
            }
            if let Err(e) = connection.tx.try_send(payload.to_string()) {
                match e {
                    TrySendError::Full(_) => {
                        tracing::warn!("Outbound queue full for '{}'", identity);
                    }
                    TrySendError::Closed(_) => {
                        tracing::debug!("Outbound queue closed for '{}'", identity);
                    }
                }
                failed.push(identity.clone());
            }
        }

        for identity in &failed {
            state.connections.remove(identity);
        }
        failed
    }
}

/// Delivery target selection for one fan-out.
#[derive(Clone, Copy)]
enum Exclude<'a> {
    /// Deliver to every open connection.
    None,
    /// Deliver to everyone except the named sender.
    Sender(&'a str),
    /// Deliver only to the named connection.
    AllBut(&'a str),
}

impl Exclude<'_> {
    fn delivers_to(self, identity: &str) -> bool {
        match self {
            Exclude::None => true,
            Exclude::Sender(sender) => identity != sender,
            Exclude::AllBut(target) => identity == target,
        }
    }
}
