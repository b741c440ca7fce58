//! Message formatting utilities for terminal display.

use huddle_shared::{event::ChatMessage, time::to_rfc3339};

/// Message formatter for client display
pub struct MessageFormatter;

impl MessageFormatter {
    /// Format a chat message, marking our own echoes
    pub fn format_chat_message(message: &ChatMessage, self_identity: &str) -> String {
        let from = if message.sender == self_identity {
            "you".to_string()
        } else {
            format!("@{}", message.sender)
        };
        format!(
            "\n{}: {}\nsent at {}\n",
            from,
            message.text,
            to_rfc3339(message.timestamp)
        )
    }

    /// Format a synthesized join/leave notice
    pub fn format_system_notice(message: &ChatMessage) -> String {
        format!("\n* {} at {}\n", message.text, to_rfc3339(message.timestamp))
    }

    /// Format a presence count update
    pub fn format_presence(count: usize) -> String {
        format!("\n* {} connected\n", count)
    }

    /// Format the other-party typing indicator
    pub fn format_typing_indicator() -> String {
        "\n* someone is typing...\n".to_string()
    }

    /// Format an audio cue; includes the terminal bell
    pub fn format_sound_cue(sender: &str) -> String {
        format!("\x07\n* @{} played a sound\n", sender)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn test_message(sender: &str) -> ChatMessage {
        ChatMessage::new(
            1,
            "Hello, world!".to_string(),
            sender.to_string(),
            Utc.with_ymd_and_hms(2023, 1, 1, 12, 0, 0).unwrap(),
        )
    }

    #[test]
    fn test_format_chat_message_from_other() {
        // given / when:
        let result = MessageFormatter::format_chat_message(&test_message("alice"), "me");

        // then:
        assert!(result.contains("@alice:"));
        assert!(result.contains("Hello, world!"));
        assert!(result.contains("sent at"));
        assert!(result.contains("2023-01-01"));
    }

    #[test]
    fn test_format_chat_message_own_echo() {
        // given / when:
        let result = MessageFormatter::format_chat_message(&test_message("me"), "me");

        // then:
        assert!(result.contains("you:"));
        assert!(!result.contains("@me"));
    }

    #[test]
    fn test_format_system_notice() {
        // given:
        let notice = ChatMessage::system(
            100,
            "A user joined the room".to_string(),
            Utc.with_ymd_and_hms(2023, 1, 1, 12, 0, 0).unwrap(),
        );

        // when:
        let result = MessageFormatter::format_system_notice(&notice);

        // then:
        assert!(result.contains("* A user joined the room"));
        assert!(result.contains("2023-01-01"));
    }

    #[test]
    fn test_format_presence() {
        // given / when / then:
        assert!(MessageFormatter::format_presence(3).contains("3 connected"));
    }

    #[test]
    fn test_format_sound_cue_rings_the_bell() {
        // given / when:
        let result = MessageFormatter::format_sound_cue("alice");

        // then:
        assert!(result.contains('\x07'));
        assert!(result.contains("@alice"));
    }
}
