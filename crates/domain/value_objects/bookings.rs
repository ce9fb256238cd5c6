use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::entities::bookings::BookingEntity;

/// Result of inserting a booking together with claiming its slot.
#[derive(Debug, Clone, PartialEq)]
pub enum BookingInsertOutcome {
    Created(BookingEntity),
    /// A booking for the same gateway order already exists.
    DuplicateOrder,
    /// The slot was booked by a different order; nothing was written.
    SlotTaken,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BookingDto {
    pub id: Uuid,
    pub mentor_id: Uuid,
    pub slot_id: Option<Uuid>,
    pub user_name: String,
    pub user_email: String,
    pub user_phone: Option<String>,
    pub session_type: String,
    pub session_price: i32,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub status: String,
    pub meet_link: Option<String>,
    pub razorpay_order_id: String,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<BookingEntity> for BookingDto {
    fn from(value: BookingEntity) -> Self {
        Self {
            id: value.id,
            mentor_id: value.mentor_id,
            slot_id: value.slot_id,
            user_name: value.user_name,
            user_email: value.user_email,
            user_phone: value.user_phone,
            session_type: value.session_type,
            session_price: value.session_price,
            date: value.date,
            start_time: value.start_time,
            end_time: value.end_time,
            status: value.status,
            meet_link: value.meet_link,
            razorpay_order_id: value.razorpay_order_id,
            confirmed_at: value.confirmed_at,
            created_at: value.created_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateBookingStatusRequest {
    pub status: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListBookingsFilter {
    pub status: Option<String>,
}
