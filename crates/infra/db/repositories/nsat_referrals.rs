use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use diesel::{OptionalExtension, RunQueryDsl, insert_into, prelude::*, update};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{postgres_connection::PgPoolSquad, schema::nsat_referrals},
};
use domain::{
    entities::nsat_referrals::{InsertNsatReferralEntity, NsatReferralEntity},
    repositories::nsat_referrals::NsatReferralRepository,
    value_objects::enums::nsat_statuses::NsatStatus,
};

pub struct NsatReferralPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl NsatReferralPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl NsatReferralRepository for NsatReferralPostgres {
    async fn create(&self, referral: InsertNsatReferralEntity) -> Result<NsatReferralEntity> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let created = insert_into(nsat_referrals::table)
            .values(&referral)
            .returning(NsatReferralEntity::as_returning())
            .get_result::<NsatReferralEntity>(&mut conn)?;

        Ok(created)
    }

    async fn find_by_id(&self, referral_id: Uuid) -> Result<Option<NsatReferralEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let row = nsat_referrals::table
            .find(referral_id)
            .select(NsatReferralEntity::as_select())
            .first::<NsatReferralEntity>(&mut conn)
            .optional()?;

        Ok(row)
    }

    async fn find_open_by_registration_id(
        &self,
        nsat_registration_id: String,
    ) -> Result<Option<NsatReferralEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let row = nsat_referrals::table
            .filter(nsat_referrals::nsat_registration_id.eq(nsat_registration_id))
            .filter(nsat_referrals::status.eq_any(vec![
                NsatStatus::Pending.to_string(),
                NsatStatus::Approved.to_string(),
            ]))
            .select(NsatReferralEntity::as_select())
            .first::<NsatReferralEntity>(&mut conn)
            .optional()?;

        Ok(row)
    }

    async fn list(&self, status: Option<NsatStatus>) -> Result<Vec<NsatReferralEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let mut query = nsat_referrals::table.into_boxed();
        if let Some(status) = status {
            query = query.filter(nsat_referrals::status.eq(status.to_string()));
        }

        let results = query
            .order(nsat_referrals::created_at.desc())
            .select(NsatReferralEntity::as_select())
            .load::<NsatReferralEntity>(&mut conn)?;

        Ok(results)
    }

    async fn review(
        &self,
        referral_id: Uuid,
        status: NsatStatus,
        admin_note: Option<String>,
        referral_code: Option<String>,
    ) -> Result<Option<NsatReferralEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let updated = update(
            nsat_referrals::table
                .filter(nsat_referrals::id.eq(referral_id))
                .filter(nsat_referrals::status.eq(NsatStatus::Pending.to_string())),
        )
        .set((
            nsat_referrals::status.eq(status.to_string()),
            nsat_referrals::admin_note.eq(admin_note),
            nsat_referrals::referral_code.eq(referral_code),
            nsat_referrals::reviewed_at.eq(Some(Utc::now())),
        ))
        .returning(NsatReferralEntity::as_returning())
        .get_result::<NsatReferralEntity>(&mut conn)
        .optional()?;

        Ok(updated)
    }
}
