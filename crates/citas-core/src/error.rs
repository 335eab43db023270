//! Error types for the appointment widget
//!
//! Only transport failures can reach the visitor, and even those are turned
//! into an apology message by the session. Calendar and config errors stay
//! inside the host.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CitasError {
    #[error("Could not reach the appointment bot: {0}")]
    Transport(String),

    #[error("Appointment bot answered with status {0}")]
    Status(u16),

    #[error("Invalid calendar month {month}/{year}")]
    InvalidMonth { month: u32, year: i32 },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl CitasError {
    /// True for failures of the outbound request itself (unreachable bot,
    /// bad status, undecodable body).
    pub fn is_transport(&self) -> bool {
        matches!(self, CitasError::Transport(_) | CitasError::Status(_))
    }
}

impl From<reqwest::Error> for CitasError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => CitasError::Status(status.as_u16()),
            None => CitasError::Transport(err.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, CitasError>;
