use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::entities::availability_slots::AvailabilitySlotEntity;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SlotDto {
    pub id: Uuid,
    pub mentor_id: Uuid,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub is_booked: bool,
    pub is_reserved: bool,
    pub reserved_until: Option<DateTime<Utc>>,
}

impl From<AvailabilitySlotEntity> for SlotDto {
    fn from(value: AvailabilitySlotEntity) -> Self {
        Self {
            id: value.id,
            mentor_id: value.mentor_id,
            date: value.date,
            start_time: value.start_time,
            end_time: value.end_time,
            is_booked: value.is_booked,
            is_reserved: value.is_reserved,
            reserved_until: value.reserved_until,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateSlotRequest {
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}
