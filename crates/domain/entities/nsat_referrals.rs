use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infra::db::postgres::schema::nsat_referrals;

#[derive(Debug, Clone, PartialEq, Identifiable, Selectable, Queryable)]
#[diesel(table_name = nsat_referrals)]
pub struct NsatReferralEntity {
    pub id: Uuid,
    pub student_name: String,
    pub student_email: String,
    pub student_phone: Option<String>,
    pub nsat_registration_id: String,
    pub preferred_mentor_id: Option<Uuid>,
    pub status: String,
    pub admin_note: Option<String>,
    pub referral_code: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Insertable)]
#[diesel(table_name = nsat_referrals)]
pub struct InsertNsatReferralEntity {
    pub student_name: String,
    pub student_email: String,
    pub student_phone: Option<String>,
    pub nsat_registration_id: String,
    pub preferred_mentor_id: Option<Uuid>,
    pub status: String,
}
