use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NsatStatus {
    Pending,
    Approved,
    Rejected,
}

impl NsatStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NsatStatus::Pending => "pending",
            NsatStatus::Approved => "approved",
            NsatStatus::Rejected => "rejected",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(NsatStatus::Pending),
            "approved" => Some(NsatStatus::Approved),
            "rejected" => Some(NsatStatus::Rejected),
            _ => None,
        }
    }
}

impl Display for NsatStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
