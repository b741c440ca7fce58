//! Edge-triggered typing signal tracking for the local input box.
//!
//! One signal fires per empty↔non-empty transition of the input, not one
//! per keystroke, which bounds typing-event volume regardless of how fast
//! the user types.

/// A typing signal to put on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypingSignal {
    /// The input went from empty to non-empty.
    Started,
    /// The input went back to empty.
    Stopped,
}

/// Tracks the local input's empty/non-empty edge.
#[derive(Debug, Default)]
pub struct Composer {
    has_text: bool,
}

impl Composer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the current input text. Returns a signal only when the input
    /// crosses the empty↔non-empty edge.
    pub fn set_input(&mut self, text: &str) -> Option<TypingSignal> {
        let has_text = !text.is_empty();
        match (self.has_text, has_text) {
            (false, true) => {
                self.has_text = true;
                Some(TypingSignal::Started)
            }
            (true, false) => {
                self.has_text = false;
                Some(TypingSignal::Stopped)
            }
            _ => None,
        }
    }

    /// Record that the input was cleared (e.g. after a send).
    pub fn clear(&mut self) -> Option<TypingSignal> {
        self.set_input("")
    }
}
