use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;

use crate::domain::{
    entities::referral_codes::{
        InsertReferralCodeEntity, InsertReferralUseEntity, ReferralCodeEntity,
    },
    value_objects::referrals::ReferralUseOutcome,
};

#[automock]
#[async_trait]
pub trait ReferralCodeRepository: Send + Sync {
    /// Lookup by normalized (upper-case) code.
    async fn find_by_code(&self, code: String) -> Result<Option<ReferralCodeEntity>>;

    async fn create(&self, code: InsertReferralCodeEntity) -> Result<ReferralCodeEntity>;

    /// Inserts the use row and bumps `times_used` in one transaction.
    async fn record_use(&self, referral_use: InsertReferralUseEntity) -> Result<ReferralUseOutcome>;
}
