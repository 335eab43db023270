//! The visible conversation: message bubbles plus the live choice buttons.

use crate::directive::ParsedReply;
use crate::state::{Author, MessageEntry};

/// Buttons rendered under one assistant bubble. Taking a choice consumes the
/// whole group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceGroup {
    anchor: usize,
    options: Vec<String>,
}

impl ChoiceGroup {
    /// Index of the assistant entry the buttons belong to.
    pub fn anchor(&self) -> usize {
        self.anchor
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }
}

#[derive(Debug, Clone, Default)]
pub struct Transcript {
    entries: Vec<MessageEntry>,
    choices: Option<ChoiceGroup>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Own text is shown as typed, directives included.
    pub fn push_user(&mut self, text: &str) {
        self.entries.push(MessageEntry {
            author: Author::User,
            text: text.to_string(),
        });
    }

    /// Append a bot bubble. Its choices, if any, replace whatever group was
    /// still on screen.
    pub fn push_assistant(&mut self, reply: &ParsedReply) {
        self.entries.push(MessageEntry {
            author: Author::Assistant,
            text: reply.display_text().to_string(),
        });
        let options = reply.choices();
        self.choices = if options.is_empty() {
            None
        } else {
            Some(ChoiceGroup {
                anchor: self.entries.len() - 1,
                options: options.to_vec(),
            })
        };
    }

    /// A locally generated bot-side message (apologies, prompts).
    pub fn push_notice(&mut self, text: &str) {
        self.entries.push(MessageEntry {
            author: Author::Assistant,
            text: text.to_string(),
        });
    }

    pub fn entries(&self) -> &[MessageEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn choices(&self) -> Option<&ChoiceGroup> {
        self.choices.as_ref()
    }

    /// Consume the choice group and return the picked option.
    pub fn take_choice(&mut self, index: usize) -> Option<String> {
        let group = self.choices.as_ref()?;
        let option = group.options.get(index)?.clone();
        self.choices = None;
        Some(option)
    }

    /// Assistant texts, most recent first.
    pub fn recent_assistant(&self, limit: usize) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .rev()
            .filter(|e| e.author == Author::Assistant)
            .take(limit)
            .map(|e| e.text.as_str())
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.choices = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directive::parse;

    #[test]
    fn test_choice_group_is_single_use() {
        let mut transcript = Transcript::new();
        transcript.push_assistant(&parse("Elige una opción[MENU:Presencial|Video|Teléfono]"));

        let group = transcript.choices().unwrap();
        assert_eq!(group.anchor(), 0);
        assert_eq!(group.options().len(), 3);

        assert_eq!(transcript.take_choice(1), Some("Video".to_string()));
        assert!(transcript.choices().is_none());
        assert_eq!(transcript.take_choice(0), None);
    }

    #[test]
    fn test_out_of_range_choice_keeps_group() {
        let mut transcript = Transcript::new();
        transcript.push_assistant(&parse("¿Confirmas?[MENU:Sí|No]"));
        assert_eq!(transcript.take_choice(5), None);
        assert!(transcript.choices().is_some());
    }

    #[test]
    fn test_new_reply_replaces_choices() {
        let mut transcript = Transcript::new();
        transcript.push_assistant(&parse("a[MENU:x|y]"));
        transcript.push_user("hola");
        transcript.push_assistant(&parse("b"));
        assert!(transcript.choices().is_none());

        transcript.push_assistant(&parse("c[MENU:z]"));
        assert_eq!(transcript.choices().unwrap().anchor(), 3);
    }

    #[test]
    fn test_user_text_is_not_parsed() {
        let mut transcript = Transcript::new();
        transcript.push_user("[MENU:a|b]");
        assert_eq!(transcript.entries()[0].text, "[MENU:a|b]");
        assert!(transcript.choices().is_none());
    }

    #[test]
    fn test_recent_assistant_order() {
        let mut transcript = Transcript::new();
        transcript.push_assistant(&parse("uno"));
        transcript.push_user("x");
        transcript.push_assistant(&parse("dos"));
        transcript.push_notice("tres");

        let recent: Vec<&str> = transcript.recent_assistant(2).collect();
        assert_eq!(recent, vec!["tres", "dos"]);

        transcript.clear();
        assert!(transcript.is_empty());
    }
}
