use serde::{Deserialize, Serialize};

/// Modality of the appointment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MeetingType {
    #[serde(rename = "presencial")]
    InPerson,
    #[serde(rename = "videoconferencia")]
    Video,
    #[serde(rename = "telefonica")]
    Phone,
}

impl MeetingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MeetingType::InPerson => "presencial",
            MeetingType::Video => "videoconferencia",
            MeetingType::Phone => "telefonica",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "presencial" | "in_person" | "in-person" => Some(MeetingType::InPerson),
            "videoconferencia" | "video" => Some(MeetingType::Video),
            "telefonica" | "telefónica" | "phone" => Some(MeetingType::Phone),
            _ => None,
        }
    }

    pub fn all() -> Vec<MeetingType> {
        vec![MeetingType::InPerson, MeetingType::Video, MeetingType::Phone]
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            MeetingType::InPerson => "Presencial",
            MeetingType::Video => "Videoconferencia",
            MeetingType::Phone => "Telefónica",
        }
    }

    /// Duration announced to the client, in minutes.
    pub fn duration_minutes(&self) -> u32 {
        match self {
            MeetingType::InPerson => 30,
            MeetingType::Video => 25,
            MeetingType::Phone => 10,
        }
    }

    fn keywords(&self) -> &'static [&'static str] {
        match self {
            MeetingType::InPerson => &["presencial"],
            MeetingType::Video => &["videoconferencia"],
            MeetingType::Phone => &["telefonica", "telefónica"],
        }
    }

    /// Scan free text for a meeting type mention. When several types are
    /// mentioned the first in `all()` order wins.
    pub fn detect(text: &str) -> Option<Self> {
        let lower = text.to_lowercase();
        Self::all()
            .into_iter()
            .find(|kind| kind.keywords().iter().any(|kw| lower.contains(kw)))
    }

    /// Exact match against the labels a visitor picks or types when asked
    /// for a meeting type.
    pub fn from_choice(text: &str) -> Option<Self> {
        match text.trim().to_lowercase().as_str() {
            "presencial" | "en persona" => Some(MeetingType::InPerson),
            "videoconferencia" | "video" | "videollamada" => Some(MeetingType::Video),
            "telefónica" | "telefonica" | "teléfono" | "telefono" | "llamada" => {
                Some(MeetingType::Phone)
            }
            _ => None,
        }
    }
}
