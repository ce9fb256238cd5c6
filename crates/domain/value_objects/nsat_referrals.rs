use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::entities::nsat_referrals::NsatReferralEntity;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateNsatReferralRequest {
    pub student_name: String,
    pub student_email: String,
    pub student_phone: Option<String>,
    pub nsat_registration_id: String,
    pub preferred_mentor_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReviewNsatReferralRequest {
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListNsatReferralsFilter {
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NsatReferralDto {
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

impl From<NsatReferralEntity> for NsatReferralDto {
    fn from(value: NsatReferralEntity) -> Self {
        Self {
            id: value.id,
            student_name: value.student_name,
            student_email: value.student_email,
            student_phone: value.student_phone,
            nsat_registration_id: value.nsat_registration_id,
            preferred_mentor_id: value.preferred_mentor_id,
            status: value.status,
            admin_note: value.admin_note,
            referral_code: value.referral_code,
            reviewed_at: value.reviewed_at,
            created_at: value.created_at,
        }
    }
}
