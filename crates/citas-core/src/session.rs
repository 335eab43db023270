//! Conversation session: the widget's state machine.
//!
//! The session never does I/O. Each operation updates the transcript and
//! returns the effects the host has to carry out: requests to the bot and
//! timers. Outcomes come back through `on_reply`, `reveal_calendar` and
//! `auto_close`.
//!
//! Timers carry the `turn` they were scheduled in. Every send and every reset
//! advances the turn, so a timer that fires after the visitor moved on is
//! ignored.

use chrono::NaiveDate;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::availability::AvailabilityCalculator;
use crate::bot::BotRequest;
use crate::calendar::CalendarView;
use crate::config::WidgetConfig;
use crate::directive;
use crate::error::{CitasError, Result};
use crate::meeting::MeetingType;
use crate::state::ConversationContext;
use crate::transcript::Transcript;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Closed,
    /// Open, waiting for the reset and greeting to come back.
    Fresh,
    Active,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestPurpose {
    /// Reset sent when opening a closed widget; the greeting follows it.
    OpenReset,
    Greeting,
    Message,
    /// Reset sent after the conversation ended; nothing waits for it.
    CloseReset,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Request {
        request: BotRequest,
        purpose: RequestPurpose,
    },
    RevealCalendar { after: Duration, turn: u64 },
    AutoClose { after: Duration, turn: u64 },
}

pub struct Session {
    config: WidgetConfig,
    context: ConversationContext,
    state: SessionState,
    transcript: Transcript,
    calendar: Option<CalendarView>,
    calendar_visible: bool,
    explicit_meeting_type: Option<MeetingType>,
    awaiting: Option<RequestPurpose>,
    turn: u64,
}

impl Session {
    pub fn new(config: WidgetConfig) -> Self {
        Self::with_context(config, ConversationContext::new())
    }

    pub fn with_context(config: WidgetConfig, context: ConversationContext) -> Self {
        Self {
            config,
            context,
            state: SessionState::Closed,
            transcript: Transcript::new(),
            calendar: None,
            calendar_visible: false,
            explicit_meeting_type: None,
            awaiting: None,
            turn: 0,
        }
    }

    pub fn config(&self) -> &WidgetConfig {
        &self.config
    }

    pub fn context(&self) -> &ConversationContext {
        &self.context
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.context.is_open
    }

    /// Hidden with a conversation still going.
    pub fn is_minimized(&self) -> bool {
        !self.context.is_open && self.state != SessionState::Closed
    }

    pub fn is_awaiting_reply(&self) -> bool {
        self.awaiting.is_some()
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn turn(&self) -> u64 {
        self.turn
    }

    /// The calendar panel, when it is on screen.
    pub fn calendar(&self) -> Option<&CalendarView> {
        self.calendar.as_ref().filter(|_| self.calendar_visible)
    }

    fn request(&self, message: &str, purpose: RequestPurpose) -> Effect {
        Effect::Request {
            request: BotRequest::new(message, self.context.visitor_id()),
            purpose,
        }
    }

    fn advance_turn(&mut self) {
        self.turn = self.turn.wrapping_add(1);
    }

    fn forget_conversation(&mut self) {
        self.transcript.clear();
        self.calendar = None;
        self.calendar_visible = false;
        self.explicit_meeting_type = None;
        self.context.last_known_meeting_type = None;
        self.awaiting = None;
        self.advance_turn();
    }

    /// Show the widget. A minimized conversation is simply revealed; a closed
    /// one starts over with a reset followed by a greeting.
    pub fn open(&mut self) -> Vec<Effect> {
        if self.context.is_open {
            return Vec::new();
        }
        self.context.is_open = true;

        if self.state != SessionState::Closed {
            debug!(visitor = self.context.visitor_id(), "revealing minimized conversation");
            return Vec::new();
        }

        info!(visitor = self.context.visitor_id(), "starting a new conversation");
        self.forget_conversation();
        self.state = SessionState::Fresh;
        self.awaiting = Some(RequestPurpose::OpenReset);
        vec![self.request(&self.config.reset_message, RequestPurpose::OpenReset)]
    }

    /// Hide the widget. The bot keeps its dialogue state.
    pub fn minimize(&mut self) {
        self.context.is_open = false;
    }

    pub fn send_message(&mut self, text: &str) -> Vec<Effect> {
        let text = text.trim();
        if text.is_empty() {
            return Vec::new();
        }
        if !self.context.is_open || self.awaiting.is_some() {
            debug!("input disabled, dropping message");
            return Vec::new();
        }

        self.transcript.push_user(text);
        if let Some(kind) = MeetingType::from_choice(text) {
            self.explicit_meeting_type = Some(kind);
            self.context.last_known_meeting_type = Some(kind);
        }

        self.calendar_visible = false;
        self.advance_turn();
        self.state = SessionState::Active;
        self.awaiting = Some(RequestPurpose::Message);
        vec![self.request(text, RequestPurpose::Message)]
    }

    /// Click on one of the buttons under the latest bot message.
    pub fn choose(&mut self, index: usize) -> Vec<Effect> {
        if !self.context.is_open || self.awaiting.is_some() {
            return Vec::new();
        }
        match self.transcript.take_choice(index) {
            Some(option) => self.send_message(&option),
            None => Vec::new(),
        }
    }

    /// Click on a calendar cell. Only available cells do anything.
    pub fn select_date(&mut self, date: NaiveDate) -> Vec<Effect> {
        if self.awaiting.is_some() {
            return Vec::new();
        }
        let Some(formatted) = self.calendar().and_then(|view| view.select(date)) else {
            return Vec::new();
        };
        let text = self.config.appointment_request_for(&formatted);
        self.calendar_visible = false;
        self.send_message(&text)
    }

    pub fn calendar_prev_month(&mut self, today: NaiveDate) -> Result<()> {
        if let Some(view) = self.calendar.as_mut().filter(|_| self.calendar_visible) {
            view.prev_month(today)?;
        }
        Ok(())
    }

    pub fn calendar_next_month(&mut self, today: NaiveDate) -> Result<()> {
        if let Some(view) = self.calendar.as_mut().filter(|_| self.calendar_visible) {
            view.next_month(today)?;
        }
        Ok(())
    }

    /// Outcome of a request previously handed out as an effect.
    pub fn on_reply(
        &mut self,
        purpose: RequestPurpose,
        result: std::result::Result<String, CitasError>,
    ) -> Vec<Effect> {
        if purpose == RequestPurpose::CloseReset {
            if let Err(err) = result {
                warn!(error = %err, "reset after conversation end failed");
            }
            return Vec::new();
        }
        if self.awaiting != Some(purpose) || self.state == SessionState::Closed {
            debug!(?purpose, "ignoring reply nobody is waiting for");
            return Vec::new();
        }

        match (purpose, result) {
            (RequestPurpose::OpenReset, Ok(_)) => {
                self.awaiting = Some(RequestPurpose::Greeting);
                vec![self.request(&self.config.greeting_message, RequestPurpose::Greeting)]
            }
            (_, Ok(raw)) => {
                self.awaiting = None;
                self.state = SessionState::Active;
                self.render_reply(&raw)
            }
            (_, Err(err)) => {
                warn!(error = %err, ?purpose, "bot request failed");
                self.awaiting = None;
                self.state = SessionState::Active;
                self.transcript.push_notice(&self.config.apology);
                Vec::new()
            }
        }
    }

    fn render_reply(&mut self, raw: &str) -> Vec<Effect> {
        let reply = directive::parse(raw);
        self.transcript.push_assistant(&reply);
        if let Some(kind) = MeetingType::detect(reply.display_text()) {
            debug!(meeting = kind.as_str(), "bot mentioned a meeting type");
            self.context.last_known_meeting_type = Some(kind);
        }

        let mut effects = Vec::new();
        if reply.shows_calendar() {
            effects.push(Effect::RevealCalendar {
                after: self.config.calendar_delay(),
                turn: self.turn,
            });
        } else {
            self.calendar_visible = false;
        }

        if self.config.is_closing(reply.display_text()) {
            info!(visitor = self.context.visitor_id(), "conversation finished, closing soon");
            effects.push(Effect::AutoClose {
                after: self.config.auto_close_delay(),
                turn: self.turn,
            });
        }
        effects
    }

    /// Meeting type for the calendar: what the visitor picked, else the most
    /// recent mention in the bot's last few messages, else what was known.
    pub fn resolve_meeting_type(&self) -> Option<MeetingType> {
        self.explicit_meeting_type
            .or_else(|| {
                self.transcript
                    .recent_assistant(self.config.inference_window)
                    .find_map(MeetingType::detect)
            })
            .or(self.context.last_known_meeting_type)
    }

    /// Timer callback for `Effect::RevealCalendar`.
    pub fn reveal_calendar(&mut self, turn: u64, today: NaiveDate) {
        if turn != self.turn || self.state == SessionState::Closed {
            return;
        }

        let meeting_type = self.resolve_meeting_type();
        self.context.last_known_meeting_type = meeting_type;

        let calculator = AvailabilityCalculator::new(self.config.booked_fraction);
        let view = self
            .calendar
            .get_or_insert_with(|| CalendarView::new(today, calculator));
        view.set_meeting_type(meeting_type);

        match view.build(today) {
            Ok(_) => self.calendar_visible = true,
            Err(err) => warn!(error = %err, "could not build calendar"),
        }
    }

    /// Timer callback for `Effect::AutoClose`.
    pub fn auto_close(&mut self, turn: u64) -> Vec<Effect> {
        if turn != self.turn || self.state == SessionState::Closed {
            return Vec::new();
        }

        info!(visitor = self.context.visitor_id(), "closing finished conversation");
        self.context.is_open = false;
        self.state = SessionState::Closed;
        self.forget_conversation();
        vec![self.request(&self.config.reset_message, RequestPurpose::CloseReset)]
    }
}
