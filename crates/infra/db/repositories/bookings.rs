use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use diesel::{
    Connection, OptionalExtension, RunQueryDsl, insert_into,
    prelude::*,
    result::{DatabaseErrorKind, Error as DieselError},
    update,
};
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{
        postgres_connection::PgPoolSquad,
        schema::{availability_slots, bookings},
    },
};
use domain::{
    entities::bookings::{BookingEntity, InsertBookingEntity},
    repositories::bookings::BookingRepository,
    value_objects::{bookings::BookingInsertOutcome, enums::booking_statuses::BookingStatus},
};

pub struct BookingPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl BookingPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

/// Reasons to roll the settlement transaction back.
#[derive(Debug)]
enum ClaimError {
    DuplicateOrder,
    SlotTaken,
    Database(DieselError),
}

impl From<DieselError> for ClaimError {
    fn from(err: DieselError) -> Self {
        ClaimError::Database(err)
    }
}

#[async_trait]
impl BookingRepository for BookingPostgres {
    async fn create_and_claim_slot(
        &self,
        booking: InsertBookingEntity,
    ) -> Result<BookingInsertOutcome> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = conn.transaction::<BookingEntity, ClaimError, _>(|conn| {
            let created = insert_into(bookings::table)
                .values(&booking)
                .returning(BookingEntity::as_returning())
                .get_result::<BookingEntity>(conn)
                .map_err(|err| match err {
                    DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                        warn!(
                            constraint = ?info.constraint_name(),
                            order_id = %booking.razorpay_order_id,
                            "bookings: unique violation on insert"
                        );
                        ClaimError::DuplicateOrder
                    }
                    other => ClaimError::Database(other),
                })?;

            if let Some(slot_id) = created.slot_id {
                let claimed = update(
                    availability_slots::table
                        .filter(availability_slots::id.eq(slot_id))
                        .filter(availability_slots::is_booked.eq(false)),
                )
                .set((
                    availability_slots::is_booked.eq(true),
                    availability_slots::is_reserved.eq(false),
                    availability_slots::reserved_by.eq(None::<String>),
                    availability_slots::reserved_until.eq(None::<DateTime<Utc>>),
                ))
                .execute(conn)?;

                if claimed == 0 {
                    return Err(ClaimError::SlotTaken);
                }
            }

            Ok(created)
        });

        match result {
            Ok(created) => Ok(BookingInsertOutcome::Created(created)),
            Err(ClaimError::DuplicateOrder) => Ok(BookingInsertOutcome::DuplicateOrder),
            Err(ClaimError::SlotTaken) => Ok(BookingInsertOutcome::SlotTaken),
            Err(ClaimError::Database(err)) => Err(err.into()),
        }
    }

    async fn find_by_order_id(&self, razorpay_order_id: String) -> Result<Option<BookingEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let booking = bookings::table
            .filter(bookings::razorpay_order_id.eq(razorpay_order_id))
            .select(BookingEntity::as_select())
            .first::<BookingEntity>(&mut conn)
            .optional()?;

        Ok(booking)
    }

    async fn find_by_id(&self, booking_id: Uuid) -> Result<Option<BookingEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let booking = bookings::table
            .find(booking_id)
            .select(BookingEntity::as_select())
            .first::<BookingEntity>(&mut conn)
            .optional()?;

        Ok(booking)
    }

    async fn list(&self, status: Option<BookingStatus>) -> Result<Vec<BookingEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let mut query = bookings::table.into_boxed();
        if let Some(status) = status {
            query = query.filter(bookings::status.eq(status.to_string()));
        }

        let results = query
            .order((bookings::date.desc(), bookings::start_time.desc()))
            .select(BookingEntity::as_select())
            .load::<BookingEntity>(&mut conn)?;

        Ok(results)
    }

    async fn list_for_mentor(
        &self,
        mentor_id: Uuid,
        from_date: NaiveDate,
    ) -> Result<Vec<BookingEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let results = bookings::table
            .filter(bookings::mentor_id.eq(mentor_id))
            .filter(bookings::date.ge(from_date))
            .order((bookings::date.asc(), bookings::start_time.asc()))
            .select(BookingEntity::as_select())
            .load::<BookingEntity>(&mut conn)?;

        Ok(results)
    }

    async fn transition_status(
        &self,
        booking_id: Uuid,
        from: BookingStatus,
        to: BookingStatus,
    ) -> Result<Option<BookingEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let updated = conn.transaction::<Option<BookingEntity>, DieselError, _>(|conn| {
            let updated = update(
                bookings::table
                    .filter(bookings::id.eq(booking_id))
                    .filter(bookings::status.eq(from.to_string())),
            )
            .set((
                bookings::status.eq(to.to_string()),
                bookings::updated_at.eq(Utc::now()),
            ))
            .returning(BookingEntity::as_returning())
            .get_result::<BookingEntity>(conn)
            .optional()?;

            if to == BookingStatus::Cancelled {
                if let Some(slot_id) = updated.as_ref().and_then(|booking| booking.slot_id) {
                    update(availability_slots::table.find(slot_id))
                        .set(availability_slots::is_booked.eq(false))
                        .execute(conn)?;
                }
            }

            Ok(updated)
        })?;

        Ok(updated)
    }
}
