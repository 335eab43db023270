//! UI-agnostic widget state types
//!
//! Shared by every front-end; nothing here knows how messages are drawn.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::meeting::MeetingType;

/// A visible line of the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageEntry {
    pub author: Author,
    pub text: String,
}

/// Who wrote a message entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Author {
    User,
    Assistant,
}

/// Per-visitor state that lives as long as the widget instance.
#[derive(Debug, Clone)]
pub struct ConversationContext {
    visitor_id: String,
    pub is_open: bool,
    pub last_known_meeting_type: Option<MeetingType>,
}

impl ConversationContext {
    pub fn new() -> Self {
        Self::with_visitor_id(generate_visitor_id())
    }

    pub fn with_visitor_id(visitor_id: impl Into<String>) -> Self {
        Self {
            visitor_id: visitor_id.into(),
            is_open: false,
            last_known_meeting_type: None,
        }
    }

    pub fn visitor_id(&self) -> &str {
        &self.visitor_id
    }
}

impl Default for ConversationContext {
    fn default() -> Self {
        Self::new()
    }
}

const VISITOR_ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// `user_` followed by nine random base-36 characters.
pub fn generate_visitor_id() -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..9)
        .map(|_| VISITOR_ID_ALPHABET[rng.random_range(0..VISITOR_ID_ALPHABET.len())] as char)
        .collect();
    format!("user_{}", suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visitor_id_shape() {
        let id = generate_visitor_id();
        let suffix = id.strip_prefix("user_").unwrap();
        assert_eq!(suffix.len(), 9);
        assert!(suffix.chars().all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
    }

    #[test]
    fn test_context_keeps_its_id() {
        let ctx = ConversationContext::with_visitor_id("user_abc");
        assert_eq!(ctx.visitor_id(), "user_abc");
        assert!(!ctx.is_open);
        assert_eq!(ctx.last_known_meeting_type, None);
    }
}
