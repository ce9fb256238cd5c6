use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::{
    entities::nsat_referrals::{InsertNsatReferralEntity, NsatReferralEntity},
    value_objects::enums::nsat_statuses::NsatStatus,
};

#[automock]
#[async_trait]
pub trait NsatReferralRepository: Send + Sync {
    async fn create(&self, referral: InsertNsatReferralEntity) -> Result<NsatReferralEntity>;

    async fn find_by_id(&self, referral_id: Uuid) -> Result<Option<NsatReferralEntity>>;

    /// Pending or approved request for the same NSAT registration.
    async fn find_open_by_registration_id(
        &self,
        nsat_registration_id: String,
    ) -> Result<Option<NsatReferralEntity>>;

    async fn list(&self, status: Option<NsatStatus>) -> Result<Vec<NsatReferralEntity>>;

    /// Moves a pending request to `status`. `None` when it was no longer pending.
    async fn review(
        &self,
        referral_id: Uuid,
        status: NsatStatus,
        admin_note: Option<String>,
        referral_code: Option<String>,
    ) -> Result<Option<NsatReferralEntity>>;
}
