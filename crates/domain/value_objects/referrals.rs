use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::entities::referral_codes::ReferralCodeEntity;

#[derive(Debug, Clone, Deserialize)]
pub struct ValidateReferralQuery {
    pub code: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReferralValidationDto {
    pub valid: bool,
    pub code: String,
    pub discount_percent: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecordReferralUseRequest {
    pub code: String,
    pub user_email: String,
    pub razorpay_order_id: String,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReferralUseOutcome {
    Recorded,
    /// The order already carries a referral use; nothing changed.
    AlreadyRecorded,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateReferralCodeRequest {
    pub code: String,
    pub discount_percent: i32,
    pub max_uses: Option<i32>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReferralCodeDto {
    pub id: Uuid,
    pub code: String,
    pub discount_percent: i32,
    pub max_uses: Option<i32>,
    pub times_used: i32,
    pub is_active: bool,
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<ReferralCodeEntity> for ReferralCodeDto {
    fn from(value: ReferralCodeEntity) -> Self {
        Self {
            id: value.id,
            code: value.code,
            discount_percent: value.discount_percent,
            max_uses: value.max_uses,
            times_used: value.times_used,
            is_active: value.is_active,
            expires_at: value.expires_at,
        }
    }
}

/// Codes are stored upper-case without surrounding whitespace.
pub fn normalize_code(raw: &str) -> String {
    raw.trim().to_ascii_uppercase()
}
