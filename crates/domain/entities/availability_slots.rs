use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infra::db::postgres::schema::availability_slots;

#[derive(Debug, Clone, PartialEq, Identifiable, Selectable, Queryable)]
#[diesel(table_name = availability_slots)]
pub struct AvailabilitySlotEntity {
    pub id: Uuid,
    pub mentor_id: Uuid,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub is_booked: bool,
    pub is_reserved: bool,
    pub reserved_by: Option<String>,
    pub reserved_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl AvailabilitySlotEntity {
    /// A reservation only counts while `reserved_until` is in the future.
    pub fn has_live_reservation(&self, now: DateTime<Utc>) -> bool {
        self.is_reserved && self.reserved_until.is_some_and(|until| until > now)
    }

    pub fn is_bookable(&self, now: DateTime<Utc>) -> bool {
        !self.is_booked && !self.has_live_reservation(now)
    }
}

#[derive(Debug, Clone, PartialEq, Insertable)]
#[diesel(table_name = availability_slots)]
pub struct InsertAvailabilitySlotEntity {
    pub mentor_id: Uuid,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub is_booked: bool,
    pub is_reserved: bool,
}
