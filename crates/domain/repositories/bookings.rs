use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use mockall::automock;
use uuid::Uuid;

use crate::domain::{
    entities::bookings::{BookingEntity, InsertBookingEntity},
    value_objects::{bookings::BookingInsertOutcome, enums::booking_statuses::BookingStatus},
};

#[automock]
#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Inserts the booking and marks its slot booked in one transaction.
    ///
    /// A unique violation on `razorpay_order_id` yields `DuplicateOrder`; a slot
    /// already booked by another order yields `SlotTaken`. Neither writes anything.
    async fn create_and_claim_slot(
        &self,
        booking: InsertBookingEntity,
    ) -> Result<BookingInsertOutcome>;

    async fn find_by_order_id(&self, razorpay_order_id: String) -> Result<Option<BookingEntity>>;

    async fn find_by_id(&self, booking_id: Uuid) -> Result<Option<BookingEntity>>;

    async fn list(&self, status: Option<BookingStatus>) -> Result<Vec<BookingEntity>>;

    async fn list_for_mentor(
        &self,
        mentor_id: Uuid,
        from_date: NaiveDate,
    ) -> Result<Vec<BookingEntity>>;

    /// Moves `from -> to` only when the row is still in `from`. Cancelling also
    /// frees the slot. Returns `None` when the row was not in `from`.
    async fn transition_status(
        &self,
        booking_id: Uuid,
        from: BookingStatus,
        to: BookingStatus,
    ) -> Result<Option<BookingEntity>>;
}
