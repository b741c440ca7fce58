//! The client view: an ordered, deduplicated fold of the inbound event
//! stream.
//!
//! The view is the sole source of truth for client-side derived state. It is
//! rebuilt from scratch on every (re)connect; hub broadcasts are never
//! queried out-of-band. Exactly one task writes to it — the inbound event
//! loop — so the fold never races local input.

use std::collections::HashSet;

use huddle_shared::event::{ChatMessage, Event};

/// Start of the id range for locally-synthesized system notices. Server ids
/// count up from 1, so the ranges cannot collide within a session.
pub const SYSTEM_MESSAGE_ID_BASE: u64 = 1 << 62;

/// A state change produced by folding one event, for the display layer to
/// render.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewEffect {
    /// A message (user-authored or system notice) was appended to the log.
    Appended(ChatMessage),
    /// The presence count changed.
    Presence(usize),
    /// The other-party typing indicator changed.
    Typing(bool),
    /// An audio cue was requested by the named sender.
    SoundRequested(String),
}

/// Per-session client view state.
pub struct ClientView {
    identity: String,
    messages: Vec<ChatMessage>,
    seen_ids: HashSet<u64>,
    presence: usize,
    other_typing: bool,
    next_system_id: u64,
}

impl ClientView {
    /// Create an empty view for a fresh session. No history is replayed.
    pub fn new(identity: String) -> Self {
        Self {
            identity,
            messages: Vec::new(),
            seen_ids: HashSet::new(),
            presence: 0,
            other_typing: false,
            next_system_id: SYSTEM_MESSAGE_ID_BASE,
        }
    }

    /// Fold one inbound event into the view, returning the changes the
    /// display layer should render.
    pub fn apply(&mut self, event: Event) -> Vec<ViewEffect> {
        let mut effects = Vec::new();

        match event {
            Event::Message { message } => {
                if self.append(message.clone()) {
                    effects.push(ViewEffect::Appended(message));
                }
                if self.set_other_typing(false) {
                    effects.push(ViewEffect::Typing(false));
                }
            }
            Event::Typing { sender } => {
                if sender != self.identity && self.set_other_typing(true) {
                    effects.push(ViewEffect::Typing(true));
                }
            }
            Event::NotTyping { sender } => {
                if sender != self.identity && self.set_other_typing(false) {
                    effects.push(ViewEffect::Typing(false));
                }
            }
            Event::UserJoined { count, timestamp } => {
                self.presence = count;
                effects.push(ViewEffect::Presence(count));
                let notice = self.synthesize_notice("A user joined the room", timestamp);
                effects.push(ViewEffect::Appended(notice));
            }
            Event::UserLeft { count, timestamp } => {
                self.presence = count;
                effects.push(ViewEffect::Presence(count));
                let notice = self.synthesize_notice("A user left the room", timestamp);
                effects.push(ViewEffect::Appended(notice));
            }
            Event::PlaySound { sender } => {
                if sender != self.identity {
                    effects.push(ViewEffect::SoundRequested(sender));
                }
            }
            Event::ConnectionCount { count } => {
                self.presence = count;
                effects.push(ViewEffect::Presence(count));
            }
            Event::Ignored => {}
        }

        effects
    }

    /// The ordered message log received so far.
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Current presence count.
    pub fn presence(&self) -> usize {
        self.presence
    }

    /// Whether another participant is currently typing.
    pub fn other_typing(&self) -> bool {
        self.other_typing
    }

    /// Append a message iff its id has not been logged yet. Idempotent
    /// against at-least-once redelivery.
    fn append(&mut self, message: ChatMessage) -> bool {
        if !self.seen_ids.insert(message.id) {
            return false;
        }
        self.messages.push(message);
        true
    }

    fn set_other_typing(&mut self, value: bool) -> bool {
        if self.other_typing == value {
            return false;
        }
        self.other_typing = value;
        true
    }

    fn synthesize_notice(
        &mut self,
        text: &str,
        timestamp: chrono::DateTime<chrono::Utc>,
    ) -> ChatMessage {
        let id = self.next_system_id;
        self.next_system_id += 1;
        let notice = ChatMessage::system(id, text.to_string(), timestamp);
        self.append(notice.clone());
        notice
    }
}
