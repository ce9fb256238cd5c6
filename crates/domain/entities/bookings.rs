use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infra::db::postgres::schema::bookings;

#[derive(Debug, Clone, PartialEq, Identifiable, Selectable, Queryable)]
#[diesel(table_name = bookings)]
pub struct BookingEntity {
    pub id: Uuid,
    pub mentor_id: Uuid,
    pub slot_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
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
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Insertable)]
#[diesel(table_name = bookings)]
pub struct InsertBookingEntity {
    pub mentor_id: Uuid,
    pub slot_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
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
}
