use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Bookable session lengths. Mentor prices are quoted for a standard session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionType {
    Quick,
    Standard,
}

impl SessionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionType::Quick => "quick",
            SessionType::Standard => "standard",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "quick" => Some(SessionType::Quick),
            "standard" => Some(SessionType::Standard),
            _ => None,
        }
    }

    pub fn duration_minutes(&self) -> u32 {
        match self {
            SessionType::Quick => 15,
            SessionType::Standard => 30,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SessionType::Quick => "Quick chat",
            SessionType::Standard => "Standard session",
        }
    }

    /// Price in whole rupees. Quick sessions are half price, rounded up.
    pub fn price_for(&self, mentor_price: i32) -> i32 {
        match self {
            SessionType::Quick => (mentor_price + 1) / 2,
            SessionType::Standard => mentor_price,
        }
    }
}

impl Display for SessionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
