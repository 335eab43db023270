//! Directives embedded in bot replies.
//!
//! The bot mixes two instructions into otherwise plain text:
//! - `[MENU:opt1|opt2|...]` offers clickable choices
//! - the calendar marker asks the widget to open the date picker
//!
//! `parse` pulls them out once so nothing downstream has to re-scan the text.

use regex::Regex;
use std::ops::Range;
use std::sync::OnceLock;
use tracing::warn;

/// Marker the bot appends when the visitor should pick a date.
pub const CALENDAR_MARKER: &str = "[Indicador pequeño]";

const MENU_OPEN: &str = "[MENU:";

fn menu_regex() -> &'static Regex {
    static MENU: OnceLock<Regex> = OnceLock::new();
    MENU.get_or_init(|| Regex::new(r"\[MENU:([^\]\n]*)\]").expect("menu pattern is valid"))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// Options to render as single-use buttons, in order.
    Choices(Vec<String>),
    ShowCalendar,
}

/// A bot reply with its directives separated from the display text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedReply {
    display_text: String,
    directives: Vec<Directive>,
}

impl ParsedReply {
    pub fn display_text(&self) -> &str {
        &self.display_text
    }

    pub fn directives(&self) -> &[Directive] {
        &self.directives
    }

    pub fn choices(&self) -> &[String] {
        self.directives
            .iter()
            .find_map(|d| match d {
                Directive::Choices(options) => Some(options.as_slice()),
                Directive::ShowCalendar => None,
            })
            .unwrap_or(&[])
    }

    pub fn shows_calendar(&self) -> bool {
        self.directives.contains(&Directive::ShowCalendar)
    }
}

/// Turn literal `\n` escapes into line breaks and unify CRLF.
fn normalize_newlines(raw: &str) -> String {
    raw.replace("\r\n", "\n").replace("\\n", "\n")
}

/// Remove every occurrence of `marker`, including ones that only appear once
/// an inner occurrence has been cut out.
fn strip_all(text: &mut String, marker: &str) -> bool {
    let mut found = false;
    while text.contains(marker) {
        *text = text.replace(marker, "");
        found = true;
    }
    found
}

/// Byte range of the first well-formed menu directive and its option list.
fn next_menu(text: &str) -> Option<(Range<usize>, String)> {
    let found = menu_regex().captures(text)?;
    let whole = found.get(0)?.range();
    let body = found.get(1).map(|m| m.as_str().to_string()).unwrap_or_default();
    Some((whole, body))
}

/// Drop an unterminated `[MENU:` token up to the end of its line.
fn strip_dangling_menus(text: &mut String) {
    while let Some(start) = text.find(MENU_OPEN) {
        let end = text[start..]
            .find('\n')
            .map(|i| start + i)
            .unwrap_or(text.len());
        warn!(token = &text[start..end], "stripping malformed menu directive");
        text.replace_range(start..end, "");
    }
}

pub fn parse(raw: &str) -> ParsedReply {
    let mut text = normalize_newlines(raw);
    let mut directives = Vec::new();

    let show_calendar = strip_all(&mut text, CALENDAR_MARKER);

    let mut choices: Option<Vec<String>> = None;
    while let Some((whole, body)) = next_menu(&text) {
        if choices.is_none() {
            choices = Some(body.split('|').map(str::to_string).collect());
        } else {
            warn!(directive = &text[whole.clone()], "ignoring extra menu directive");
        }
        text.replace_range(whole, "");
    }
    strip_dangling_menus(&mut text);

    if let Some(options) = choices {
        directives.push(Directive::Choices(options));
    }
    if show_calendar {
        directives.push(Directive::ShowCalendar);
    }

    ParsedReply {
        display_text: text,
        directives,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_menu_directive() {
        let reply = parse("Elige una opción[MENU:Presencial|Video|Teléfono]");
        assert_eq!(reply.display_text(), "Elige una opción");
        assert_eq!(reply.choices(), &["Presencial", "Video", "Teléfono"]);
        assert!(!reply.shows_calendar());
    }

    #[test]
    fn test_plain_reply_is_untouched() {
        let raw = "Hola, soy el asistente del despacho. ¿En qué puedo ayudarte?";
        let reply = parse(raw);
        assert_eq!(reply.display_text(), raw);
        assert!(reply.choices().is_empty());
        assert!(reply.directives().is_empty());
    }

    #[test]
    fn test_calendar_marker_is_removed() {
        let reply = parse("Para ver el calendario completo [Indicador pequeño] elige un día.");
        assert!(reply.shows_calendar());
        assert_eq!(reply.display_text(), "Para ver el calendario completo  elige un día.");
        assert!(reply.choices().is_empty());
    }

    #[test]
    fn test_repeated_calendar_markers_all_stripped() {
        let reply = parse("[Indicador pequeño]A[Indicador pequeño]B");
        assert!(reply.shows_calendar());
        assert_eq!(reply.display_text(), "AB");
    }

    #[test]
    fn test_menu_and_calendar_together() {
        let reply = parse("Elige día [Indicador pequeño][MENU:Ver calendario|Lo antes posible]");
        assert!(reply.shows_calendar());
        assert_eq!(reply.choices(), &["Ver calendario", "Lo antes posible"]);
        assert_eq!(reply.display_text(), "Elige día ");
    }

    #[test]
    fn test_empty_options_pass_through() {
        let reply = parse("x[MENU:a||b]");
        assert_eq!(reply.choices(), &["a", "", "b"]);

        let reply = parse("x[MENU:]");
        assert_eq!(reply.choices(), &[""]);
    }

    #[test]
    fn test_only_first_menu_is_used() {
        let reply = parse("Uno [MENU:a|b] dos [MENU:c]");
        assert_eq!(reply.choices(), &["a", "b"]);
        assert_eq!(reply.display_text(), "Uno  dos ");
    }

    #[test]
    fn test_newline_escapes_become_line_breaks() {
        let reply = parse("Cita confirmada.\\n\\nTipo: presencial");
        assert_eq!(reply.display_text(), "Cita confirmada.\n\nTipo: presencial");
        assert_eq!(reply.display_text().lines().count(), 3);
    }

    #[test]
    fn test_markup_is_literal() {
        let raw = "<b>Hola</b> & <script>x</script>";
        assert_eq!(parse(raw).display_text(), raw);
    }

    #[test]
    fn test_malformed_menu_fails_open() {
        let reply = parse("Elige una opción [MENU:Sí|No\nGracias");
        assert!(reply.choices().is_empty());
        assert_eq!(reply.display_text(), "Elige una opción \nGracias");
    }

    #[test]
    fn test_parse_is_idempotent_on_display_text() {
        for raw in [
            "Elige[MENU:a|b]",
            "Hola\\nque tal [Indicador pequeño]",
            "roto [MENU:a|b",
            "sin directivas",
        ] {
            let once = parse(raw);
            let twice = parse(once.display_text());
            assert_eq!(once.display_text(), twice.display_text());
            assert!(twice.directives().is_empty());
        }
    }
}
