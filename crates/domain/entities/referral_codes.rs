use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infra::db::postgres::schema::{referral_codes, referral_uses};

#[derive(Debug, Clone, PartialEq, Identifiable, Selectable, Queryable)]
#[diesel(table_name = referral_codes)]
pub struct ReferralCodeEntity {
    pub id: Uuid,
    pub code: String,
    pub discount_percent: i32,
    pub max_uses: Option<i32>,
    pub times_used: i32,
    pub is_active: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl ReferralCodeEntity {
    /// Why the code cannot be applied right now, if anything.
    pub fn rejection_reason(&self, now: DateTime<Utc>) -> Option<&'static str> {
        if !self.is_active {
            return Some("referral code is inactive");
        }
        if self.expires_at.is_some_and(|expires_at| expires_at <= now) {
            return Some("referral code has expired");
        }
        if self
            .max_uses
            .is_some_and(|max_uses| self.times_used >= max_uses)
        {
            return Some("referral code has reached its usage limit");
        }
        None
    }
}

#[derive(Debug, Clone, PartialEq, Insertable)]
#[diesel(table_name = referral_codes)]
pub struct InsertReferralCodeEntity {
    pub code: String,
    pub discount_percent: i32,
    pub max_uses: Option<i32>,
    pub times_used: i32,
    pub is_active: bool,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Identifiable, Selectable, Queryable)]
#[diesel(table_name = referral_uses)]
pub struct ReferralUseEntity {
    pub id: Uuid,
    pub referral_code_id: Uuid,
    pub code: String,
    pub user_email: String,
    pub razorpay_order_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Insertable)]
#[diesel(table_name = referral_uses)]
pub struct InsertReferralUseEntity {
    pub referral_code_id: Uuid,
    pub code: String,
    pub user_email: String,
    pub razorpay_order_id: String,
}
