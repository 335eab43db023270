pub mod availability;
pub mod bot;
pub mod calendar;
pub mod config;
pub mod directive;
pub mod error;
pub mod meeting;
pub mod session;
pub mod state;
pub mod transcript;

// Re-export main types for convenience
pub use availability::{AvailabilityCalculator, AvailableDaySet};
pub use bot::{BotClient, BotRequest};
pub use calendar::{format_date, CalendarCell, CalendarGrid, CalendarState, CalendarView};
pub use config::WidgetConfig;
pub use directive::{parse, Directive, ParsedReply};
pub use error::CitasError;
pub use meeting::MeetingType;
pub use session::{Effect, RequestPurpose, Session, SessionState};
pub use state::{Author, ConversationContext, MessageEntry};
pub use transcript::{ChoiceGroup, Transcript};
