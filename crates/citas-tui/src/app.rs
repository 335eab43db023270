use anyhow::Result;
use chrono::{Datelike, Days, Local, NaiveDate};
use citas_core::{BotClient, CitasError, Effect, RequestPurpose, Session, WidgetConfig};
use tokio::sync::mpsc;
use tracing::debug;

use crate::tui::AppEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPane {
    Input,
    Choices,
    Calendar,
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub focus: FocusPane,
    pub session: Session,
    bot: BotClient,
    events: mpsc::UnboundedSender<AppEvent>,

    // Message input
    pub input: String,
    pub input_cursor: usize,

    // Selections
    pub choice_cursor: usize,
    pub calendar_cursor: Option<NaiveDate>,

    // Chat viewport, filled in by the renderer
    pub chat_scroll: u16,
    pub chat_width: u16,
    pub chat_height: u16,

    // "Escribiendo..." animation
    pub animation_frame: u8,
}

impl App {
    pub fn new(config: WidgetConfig, events: mpsc::UnboundedSender<AppEvent>) -> Self {
        let bot = BotClient::new(&config.backend_url);
        Self {
            should_quit: false,
            focus: FocusPane::Input,
            session: Session::new(config),
            bot,
            events,
            input: String::new(),
            input_cursor: 0,
            choice_cursor: 0,
            calendar_cursor: None,
            chat_scroll: 0,
            chat_width: 0,
            chat_height: 0,
            animation_frame: 0,
        }
    }

    /// Run session effects in the background. Their outcomes come back as
    /// events on the app channel.
    pub fn apply(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            let tx = self.events.clone();
            match effect {
                Effect::Request { request, purpose } => {
                    let bot = self.bot.clone();
                    tokio::spawn(async move {
                        let result = bot.send(&request).await;
                        let _ = tx.send(AppEvent::Reply { purpose, result });
                    });
                }
                Effect::RevealCalendar { after, turn } => {
                    tokio::spawn(async move {
                        tokio::time::sleep(after).await;
                        let _ = tx.send(AppEvent::RevealCalendar { turn });
                    });
                }
                Effect::AutoClose { after, turn } => {
                    tokio::spawn(async move {
                        tokio::time::sleep(after).await;
                        let _ = tx.send(AppEvent::AutoClose { turn });
                    });
                }
            }
        }
        self.sync_focus();
        self.scroll_chat_to_bottom();
    }

    pub fn open(&mut self) {
        let effects = self.session.open();
        self.focus = FocusPane::Input;
        self.apply(effects);
    }

    pub fn minimize(&mut self) {
        self.session.minimize();
    }

    /// Send whatever is in the input box. Nothing happens while a reply is
    /// pending; the typed text stays put.
    pub fn submit_input(&mut self) {
        if self.session.is_awaiting_reply() {
            return;
        }
        let text = std::mem::take(&mut self.input);
        self.input_cursor = 0;
        let effects = self.session.send_message(&text);
        self.apply(effects);
    }

    pub fn choose_selected(&mut self) {
        let effects = self.session.choose(self.choice_cursor);
        self.choice_cursor = 0;
        self.apply(effects);
    }

    pub fn select_calendar_day(&mut self) {
        let Some(date) = self.calendar_cursor else {
            return;
        };
        let effects = self.session.select_date(date);
        self.apply(effects);
    }

    pub fn on_reply(&mut self, purpose: RequestPurpose, result: Result<String, CitasError>) {
        let effects = self.session.on_reply(purpose, result);
        self.apply(effects);
    }

    pub fn reveal_calendar(&mut self, turn: u64) {
        self.session.reveal_calendar(turn, today());
        if self.session.calendar().is_some() {
            self.reset_calendar_cursor();
            self.focus = FocusPane::Calendar;
        }
    }

    pub fn auto_close(&mut self, turn: u64) {
        let effects = self.session.auto_close(turn);
        if !effects.is_empty() {
            self.input.clear();
            self.input_cursor = 0;
            self.chat_scroll = 0;
        }
        self.apply(effects);
    }

    pub fn tick_animation(&mut self) {
        if self.session.is_awaiting_reply() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    // Focus handling

    /// Input, then the choice buttons and the calendar when they are shown.
    pub fn next_focus(&mut self) {
        let has_choices = self.session.transcript().choices().is_some();
        let has_calendar = self.session.calendar().is_some();
        self.focus = match self.focus {
            FocusPane::Input if has_choices => FocusPane::Choices,
            FocusPane::Input | FocusPane::Choices if has_calendar => FocusPane::Calendar,
            _ => FocusPane::Input,
        };
    }

    /// Drop focus from panes that disappeared.
    pub fn sync_focus(&mut self) {
        match self.session.transcript().choices() {
            Some(group) => {
                self.choice_cursor = self.choice_cursor.min(group.options().len().saturating_sub(1));
            }
            None => {
                self.choice_cursor = 0;
                if self.focus == FocusPane::Choices {
                    self.focus = FocusPane::Input;
                }
            }
        }
        if self.session.calendar().is_none() && self.focus == FocusPane::Calendar {
            self.focus = FocusPane::Input;
        }
    }

    // Choice navigation

    pub fn choice_next(&mut self) {
        if let Some(group) = self.session.transcript().choices() {
            if self.choice_cursor + 1 < group.options().len() {
                self.choice_cursor += 1;
            }
        }
    }

    pub fn choice_prev(&mut self) {
        self.choice_cursor = self.choice_cursor.saturating_sub(1);
    }

    // Calendar navigation

    pub fn calendar_prev_month(&mut self) -> Result<()> {
        self.session.calendar_prev_month(today())?;
        self.reset_calendar_cursor();
        Ok(())
    }

    pub fn calendar_next_month(&mut self) -> Result<()> {
        self.session.calendar_next_month(today())?;
        self.reset_calendar_cursor();
        Ok(())
    }

    /// Put the cursor on the first bookable day, or the 1st if there is none.
    pub fn reset_calendar_cursor(&mut self) {
        self.calendar_cursor = self.session.calendar().and_then(|view| {
            view.grid()
                .map(|grid| grid.first_available().unwrap_or(view.displayed_month()))
        });
    }

    /// Move the cursor by whole days, staying inside the displayed month.
    pub fn move_calendar_cursor(&mut self, days: i64) {
        let Some(grid) = self.session.calendar().and_then(|view| view.grid()) else {
            return;
        };
        let Some(current) = self.calendar_cursor else {
            return;
        };
        let step = Days::new(days.unsigned_abs());
        let target = if days >= 0 {
            current.checked_add_days(step)
        } else {
            current.checked_sub_days(step)
        };
        if let Some(date) = target.filter(|d| d.month() == grid.month() && d.year() == grid.year()) {
            debug!(%date, "calendar cursor moved");
            self.calendar_cursor = Some(date);
        }
    }

    /// Scroll chat to bottom so the latest bubble is visible
    pub fn scroll_chat_to_bottom(&mut self) {
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let mut total_lines: usize = 0;
        for entry in self.session.transcript().entries() {
            total_lines += 1; // Author line
            for line in entry.text.lines() {
                let char_count = line.chars().count();
                total_lines += (char_count / wrap_width) + 1;
            }
            total_lines += 1; // Blank line after message
        }
        if self.session.transcript().choices().is_some() {
            total_lines += 1; // Hint under the anchored bubble
        }
        if self.session.is_awaiting_reply() {
            total_lines += 2;
        }

        let visible_height = if self.chat_height > 0 { self.chat_height } else { 20 };
        let overflow = total_lines.saturating_sub(usize::from(visible_height));
        self.chat_scroll = u16::try_from(overflow).unwrap_or(u16::MAX);
    }
}
