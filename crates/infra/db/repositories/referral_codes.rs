use anyhow::Result;
use async_trait::async_trait;
use diesel::{
    Connection, OptionalExtension, RunQueryDsl, insert_into,
    prelude::*,
    result::{DatabaseErrorKind, Error as DieselError},
    update,
};
use std::sync::Arc;

use crate::{
    domain,
    infra::db::postgres::{
        postgres_connection::PgPoolSquad,
        schema::{referral_codes, referral_uses},
    },
};
use domain::{
    entities::referral_codes::{
        InsertReferralCodeEntity, InsertReferralUseEntity, ReferralCodeEntity,
    },
    repositories::referral_codes::ReferralCodeRepository,
    value_objects::referrals::ReferralUseOutcome,
};

pub struct ReferralCodePostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl ReferralCodePostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[derive(Debug)]
enum RecordUseError {
    AlreadyRecorded,
    Database(DieselError),
}

impl From<DieselError> for RecordUseError {
    fn from(err: DieselError) -> Self {
        RecordUseError::Database(err)
    }
}

#[async_trait]
impl ReferralCodeRepository for ReferralCodePostgres {
    async fn find_by_code(&self, code: String) -> Result<Option<ReferralCodeEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let row = referral_codes::table
            .filter(referral_codes::code.eq(code))
            .select(ReferralCodeEntity::as_select())
            .first::<ReferralCodeEntity>(&mut conn)
            .optional()?;

        Ok(row)
    }

    async fn create(&self, code: InsertReferralCodeEntity) -> Result<ReferralCodeEntity> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let created = insert_into(referral_codes::table)
            .values(&code)
            .returning(ReferralCodeEntity::as_returning())
            .get_result::<ReferralCodeEntity>(&mut conn)?;

        Ok(created)
    }

    async fn record_use(&self, referral_use: InsertReferralUseEntity) -> Result<ReferralUseOutcome> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = conn.transaction::<(), RecordUseError, _>(|conn| {
            insert_into(referral_uses::table)
                .values(&referral_use)
                .execute(conn)
                .map_err(|err| match err {
                    DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                        RecordUseError::AlreadyRecorded
                    }
                    other => RecordUseError::Database(other),
                })?;

            update(referral_codes::table.find(referral_use.referral_code_id))
                .set(referral_codes::times_used.eq(referral_codes::times_used + 1))
                .execute(conn)?;

            Ok(())
        });

        match result {
            Ok(()) => Ok(ReferralUseOutcome::Recorded),
            Err(RecordUseError::AlreadyRecorded) => Ok(ReferralUseOutcome::AlreadyRecorded),
            Err(RecordUseError::Database(err)) => Err(err.into()),
        }
    }
}
