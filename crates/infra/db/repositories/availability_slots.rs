use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use diesel::{OptionalExtension, RunQueryDsl, delete, insert_into, prelude::*, update};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{postgres_connection::PgPoolSquad, schema::availability_slots},
};
use domain::{
    entities::availability_slots::{AvailabilitySlotEntity, InsertAvailabilitySlotEntity},
    repositories::availability_slots::AvailabilitySlotRepository,
};

pub struct AvailabilitySlotPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl AvailabilitySlotPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl AvailabilitySlotRepository for AvailabilitySlotPostgres {
    async fn find_by_id(&self, slot_id: Uuid) -> Result<Option<AvailabilitySlotEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let slot = availability_slots::table
            .find(slot_id)
            .select(AvailabilitySlotEntity::as_select())
            .first::<AvailabilitySlotEntity>(&mut conn)
            .optional()?;

        Ok(slot)
    }

    async fn list_bookable(
        &self,
        mentor_id: Uuid,
        from_date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<Vec<AvailabilitySlotEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let results = availability_slots::table
            .filter(availability_slots::mentor_id.eq(mentor_id))
            .filter(availability_slots::date.ge(from_date))
            .filter(availability_slots::is_booked.eq(false))
            .filter(
                availability_slots::is_reserved
                    .eq(false)
                    .or(availability_slots::reserved_until.is_null())
                    .or(availability_slots::reserved_until.le(now)),
            )
            .order((
                availability_slots::date.asc(),
                availability_slots::start_time.asc(),
            ))
            .select(AvailabilitySlotEntity::as_select())
            .load::<AvailabilitySlotEntity>(&mut conn)?;

        Ok(results)
    }

    async fn list_for_mentor(
        &self,
        mentor_id: Uuid,
        from_date: NaiveDate,
    ) -> Result<Vec<AvailabilitySlotEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let results = availability_slots::table
            .filter(availability_slots::mentor_id.eq(mentor_id))
            .filter(availability_slots::date.ge(from_date))
            .order((
                availability_slots::date.asc(),
                availability_slots::start_time.asc(),
            ))
            .select(AvailabilitySlotEntity::as_select())
            .load::<AvailabilitySlotEntity>(&mut conn)?;

        Ok(results)
    }

    async fn create(&self, slot: InsertAvailabilitySlotEntity) -> Result<AvailabilitySlotEntity> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let created = insert_into(availability_slots::table)
            .values(&slot)
            .returning(AvailabilitySlotEntity::as_returning())
            .get_result::<AvailabilitySlotEntity>(&mut conn)?;

        Ok(created)
    }

    async fn delete_unclaimed(
        &self,
        slot_id: Uuid,
        mentor_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let deleted = delete(
            availability_slots::table
                .filter(availability_slots::id.eq(slot_id))
                .filter(availability_slots::mentor_id.eq(mentor_id))
                .filter(availability_slots::is_booked.eq(false))
                .filter(
                    availability_slots::is_reserved
                        .eq(false)
                        .or(availability_slots::reserved_until.is_null())
                        .or(availability_slots::reserved_until.le(now)),
                ),
        )
        .execute(&mut conn)?;

        Ok(deleted > 0)
    }

    async fn reserve(
        &self,
        slot_id: Uuid,
        reserved_by: String,
        reserved_until: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let updated = update(
            availability_slots::table
                .filter(availability_slots::id.eq(slot_id))
                .filter(availability_slots::is_booked.eq(false))
                .filter(
                    availability_slots::is_reserved
                        .eq(false)
                        .or(availability_slots::reserved_until.is_null())
                        .or(availability_slots::reserved_until.le(now)),
                ),
        )
        .set((
            availability_slots::is_reserved.eq(true),
            availability_slots::reserved_by.eq(Some(reserved_by)),
            availability_slots::reserved_until.eq(Some(reserved_until)),
        ))
        .execute(&mut conn)?;

        Ok(updated > 0)
    }

    async fn release_reservation(&self, slot_id: Uuid, reserved_by: String) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        update(
            availability_slots::table
                .filter(availability_slots::id.eq(slot_id))
                .filter(availability_slots::reserved_by.eq(reserved_by)),
        )
        .set((
            availability_slots::is_reserved.eq(false),
            availability_slots::reserved_by.eq(None::<String>),
            availability_slots::reserved_until.eq(None::<DateTime<Utc>>),
        ))
        .execute(&mut conn)?;

        Ok(())
    }
}
