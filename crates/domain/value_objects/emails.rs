use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Templates an admin can send by hand from the back-office.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BroadcastTemplate {
    Promotional,
    Custom,
    Onboarding,
}

impl BroadcastTemplate {
    pub fn as_str(&self) -> &'static str {
        match self {
            BroadcastTemplate::Promotional => "promotional",
            BroadcastTemplate::Custom => "custom",
            BroadcastTemplate::Onboarding => "onboarding",
        }
    }
}

impl Display for BroadcastTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SendEmailRequest {
    pub template: BroadcastTemplate,
    pub recipients: Vec<String>,
    pub subject: Option<String>,
    pub heading: Option<String>,
    pub body: Option<String>,
    pub cta_label: Option<String>,
    pub cta_url: Option<String>,
    /// Used by the onboarding template to greet the mentor by name.
    pub recipient_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SendEmailReport {
    pub sent: usize,
    pub failed: Vec<String>,
}
