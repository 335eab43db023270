use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crate::app::{App, FocusPane};
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key)?,
        AppEvent::Resize(_, _) => app.scroll_chat_to_bottom(),
        AppEvent::Tick => app.tick_animation(),
        AppEvent::Reply { purpose, result } => app.on_reply(purpose, result),
        AppEvent::RevealCalendar { turn } => app.reveal_calendar(turn),
        AppEvent::AutoClose { turn } => app.auto_close(turn),
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) -> Result<()> {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return Ok(());
    }

    if !app.session.is_open() {
        handle_launcher(app, key);
        return Ok(());
    }

    match key.code {
        KeyCode::Tab => {
            app.next_focus();
            return Ok(());
        }
        KeyCode::Esc => {
            // Esc backs out to the input first, then hides the widget
            if app.focus == FocusPane::Input {
                app.minimize();
            } else {
                app.focus = FocusPane::Input;
            }
            return Ok(());
        }
        _ => {}
    }

    match app.focus {
        FocusPane::Input => handle_input(app, key),
        FocusPane::Choices => handle_choices(app, key),
        FocusPane::Calendar => handle_calendar(app, key)?,
    }
    Ok(())
}

fn handle_launcher(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Enter | KeyCode::Char(' ') | KeyCode::Char('o') => app.open(),
        KeyCode::Char('q') | KeyCode::Esc => app.should_quit = true,
        _ => {}
    }
}

fn handle_input(app: &mut App, key: KeyEvent) {
    // Input is disabled until the bot answers
    if app.session.is_awaiting_reply() {
        return;
    }

    let char_count = app.input.chars().count();
    match key.code {
        KeyCode::Enter => app.submit_input(),
        KeyCode::Backspace => {
            if app.input_cursor > 0 {
                app.input_cursor -= 1;
                let byte_pos = char_to_byte_index(&app.input, app.input_cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            if app.input_cursor < char_count {
                let byte_pos = char_to_byte_index(&app.input, app.input_cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            app.input_cursor = app.input_cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            app.input_cursor = (app.input_cursor + 1).min(char_count);
        }
        KeyCode::Home => app.input_cursor = 0,
        KeyCode::End => app.input_cursor = char_count,
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(&app.input, app.input_cursor);
            app.input.insert(byte_pos, c);
            app.input_cursor += 1;
        }
        _ => {}
    }
}

fn handle_choices(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down | KeyCode::Right => app.choice_next(),
        KeyCode::Char('k') | KeyCode::Up | KeyCode::Left => app.choice_prev(),
        KeyCode::Enter => app.choose_selected(),
        // Number keys pick a button directly
        KeyCode::Char(c @ '1'..='9') => {
            let index = c as usize - '1' as usize;
            let count = app
                .session
                .transcript()
                .choices()
                .map(|g| g.options().len())
                .unwrap_or(0);
            if index < count {
                app.choice_cursor = index;
                app.choose_selected();
            }
        }
        _ => {}
    }
}

fn handle_calendar(app: &mut App, key: KeyEvent) -> Result<()> {
    match key.code {
        KeyCode::Left | KeyCode::Char('h') => app.move_calendar_cursor(-1),
        KeyCode::Right | KeyCode::Char('l') => app.move_calendar_cursor(1),
        KeyCode::Up | KeyCode::Char('k') => app.move_calendar_cursor(-7),
        KeyCode::Down | KeyCode::Char('j') => app.move_calendar_cursor(7),
        KeyCode::Char('<') | KeyCode::PageUp => app.calendar_prev_month()?,
        KeyCode::Char('>') | KeyCode::PageDown => app.calendar_next_month()?,
        KeyCode::Enter => app.select_calendar_day(),
        _ => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use citas_core::{RequestPurpose, WidgetConfig};
    use crossterm::event::KeyEventKind;
    use tokio::sync::mpsc;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn press(app: &mut App, code: KeyCode) {
        let event = key(code);
        assert_eq!(event.kind, KeyEventKind::Press);
        handle_event(app, AppEvent::Key(event)).unwrap();
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    fn app() -> (App, mpsc::UnboundedReceiver<AppEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let config = WidgetConfig {
            backend_url: "http://127.0.0.1:9".to_string(),
            ..WidgetConfig::default()
        };
        (App::new(config, tx), rx)
    }

    fn greeted(app: &mut App, greeting: &str) {
        press(app, KeyCode::Enter);
        handle_event(app, AppEvent::Reply { purpose: RequestPurpose::OpenReset, result: Ok(String::new()) })
            .unwrap();
        handle_event(
            app,
            AppEvent::Reply { purpose: RequestPurpose::Greeting, result: Ok(greeting.to_string()) },
        )
        .unwrap();
    }

    #[test]
    fn test_char_to_byte_index() {
        assert_eq!(char_to_byte_index("año", 0), 0);
        assert_eq!(char_to_byte_index("año", 2), 3);
        assert_eq!(char_to_byte_index("año", 9), 4);
    }

    #[tokio::test]
    async fn test_launcher_opens_widget() {
        let (mut app, _rx) = app();
        press(&mut app, KeyCode::Enter);
        assert!(app.session.is_open());
        assert!(app.session.is_awaiting_reply());
    }

    #[tokio::test]
    async fn test_typing_with_accents() {
        let (mut app, _rx) = app();
        greeted(&mut app, "Hola");

        type_text(&mut app, "telefónica");
        press(&mut app, KeyCode::Left);
        press(&mut app, KeyCode::Backspace);
        assert_eq!(app.input, "telefónia");
        press(&mut app, KeyCode::Home);
        press(&mut app, KeyCode::Delete);
        assert_eq!(app.input, "elefónia");
    }

    #[tokio::test]
    async fn test_keys_ignored_while_awaiting() {
        let (mut app, _rx) = app();
        greeted(&mut app, "Hola");
        type_text(&mut app, "hola");
        press(&mut app, KeyCode::Enter);
        assert!(app.session.is_awaiting_reply());

        type_text(&mut app, "x");
        assert!(app.input.is_empty());
    }

    #[tokio::test]
    async fn test_failed_reply_shows_apology() {
        let (mut app, _rx) = app();
        greeted(&mut app, "Hola");
        type_text(&mut app, "Agendar una cita");
        press(&mut app, KeyCode::Enter);

        handle_event(
            &mut app,
            AppEvent::Reply {
                purpose: RequestPurpose::Message,
                result: Err(citas_core::CitasError::Status(500)),
            },
        )
        .unwrap();
        let last = app.session.transcript().entries().last().unwrap();
        assert_eq!(last.text, app.session.config().apology);
    }

    #[tokio::test]
    async fn test_number_key_picks_choice() {
        let (mut app, _rx) = app();
        greeted(&mut app, "¿Cómo prefieres la reunión?[MENU:Presencial|Videoconferencia|Telefónica]");
        press(&mut app, KeyCode::Tab);
        assert_eq!(app.focus, FocusPane::Choices);

        press(&mut app, KeyCode::Char('3'));
        let last = app.session.transcript().entries().last().unwrap();
        assert_eq!(last.text, "Telefónica");
        assert!(app.session.transcript().choices().is_none());
    }

    #[tokio::test]
    async fn test_escape_backs_out_then_minimizes() {
        let (mut app, _rx) = app();
        greeted(&mut app, "Elige[MENU:Sí|No]");
        press(&mut app, KeyCode::Tab);
        press(&mut app, KeyCode::Esc);
        assert_eq!(app.focus, FocusPane::Input);
        assert!(app.session.is_open());

        press(&mut app, KeyCode::Esc);
        assert!(app.session.is_minimized());
        assert!(!app.should_quit);

        press(&mut app, KeyCode::Enter);
        assert!(app.session.is_open());
        assert_eq!(app.session.transcript().entries().len(), 1);
    }

    #[tokio::test]
    async fn test_ctrl_c_quits() {
        let (mut app, _rx) = app();
        let event = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        handle_event(&mut app, AppEvent::Key(event)).unwrap();
        assert!(app.should_quit);
    }
}
