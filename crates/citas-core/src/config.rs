use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::availability::DEFAULT_BOOKED_FRACTION;
use crate::error::CitasError;

pub const BOT_URL_ENV: &str = "CITAS_BOT_URL";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct WidgetConfig {
    pub backend_url: String,
    /// Message that wipes the bot's dialogue state for a visitor.
    pub reset_message: String,
    /// Message sent right after a reset to get the opening line.
    pub greeting_message: String,
    pub apology: String,
    pub closing_phrases: Vec<String>,
    pub auto_close_delay_ms: u64,
    pub calendar_delay_ms: u64,
    /// How many recent bot messages are scanned for a meeting type.
    pub inference_window: usize,
    pub booked_fraction: f64,
    /// `{date}` is replaced with the picked day.
    pub appointment_request: String,
    pub missing_meeting_type_prompt: String,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            backend_url: "http://localhost:5000".to_string(),
            reset_message: "reset_conversation".to_string(),
            greeting_message: "hola".to_string(),
            apology: "Lo siento, ha ocurrido un error al procesar tu mensaje.".to_string(),
            closing_phrases: vec![
                "Gracias por usar nuestro servicio".to_string(),
                "¡Hasta pronto!".to_string(),
                "Conversación finalizada".to_string(),
            ],
            auto_close_delay_ms: 3000,
            calendar_delay_ms: 500,
            inference_window: 3,
            booked_fraction: DEFAULT_BOOKED_FRACTION,
            appointment_request: "Quiero una cita el {date}".to_string(),
            missing_meeting_type_prompt:
                "Selecciona primero un tipo de reunión para ver los días disponibles.".to_string(),
        }
    }
}

impl WidgetConfig {
    /// Config file if present, defaults otherwise, then environment overrides.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        let mut config = if config_path.exists() {
            Self::load_from(&config_path)?
        } else {
            Self::default()
        };

        if let Ok(url) = std::env::var(BOT_URL_ENV) {
            config.backend_url = url;
        }
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let config_content = fs::read_to_string(path)?;
        let config: WidgetConfig = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(path, config_content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("citas").join("config.json"))
    }

    /// Reject settings the widget cannot work with.
    pub fn validate(&self) -> std::result::Result<(), CitasError> {
        if self.backend_url.trim().is_empty() {
            return Err(CitasError::Config("backend_url is empty".to_string()));
        }
        if !(0.0..=1.0).contains(&self.booked_fraction) {
            return Err(CitasError::Config(format!(
                "booked_fraction {} is outside 0..=1",
                self.booked_fraction
            )));
        }
        if !self.appointment_request.contains("{date}") {
            return Err(CitasError::Config(
                "appointment_request has no {date} placeholder".to_string(),
            ));
        }
        Ok(())
    }

    /// True when a bot reply says goodbye.
    pub fn is_closing(&self, text: &str) -> bool {
        self.closing_phrases
            .iter()
            .filter(|p| !p.is_empty())
            .any(|p| text.starts_with(p.as_str()) || text.contains(p.as_str()))
    }

    pub fn appointment_request_for(&self, date: &str) -> String {
        self.appointment_request.replace("{date}", date)
    }

    pub fn auto_close_delay(&self) -> Duration {
        Duration::from_millis(self.auto_close_delay_ms)
    }

    pub fn calendar_delay(&self) -> Duration {
        Duration::from_millis(self.calendar_delay_ms)
    }
}
