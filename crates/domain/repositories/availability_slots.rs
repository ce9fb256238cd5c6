use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::availability_slots::{
    AvailabilitySlotEntity, InsertAvailabilitySlotEntity,
};

#[automock]
#[async_trait]
pub trait AvailabilitySlotRepository: Send + Sync {
    async fn find_by_id(&self, slot_id: Uuid) -> Result<Option<AvailabilitySlotEntity>>;

    /// Slots on or after `from_date` that are not booked and carry no live reservation.
    async fn list_bookable(
        &self,
        mentor_id: Uuid,
        from_date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<Vec<AvailabilitySlotEntity>>;

    async fn list_for_mentor(
        &self,
        mentor_id: Uuid,
        from_date: NaiveDate,
    ) -> Result<Vec<AvailabilitySlotEntity>>;

    async fn create(&self, slot: InsertAvailabilitySlotEntity) -> Result<AvailabilitySlotEntity>;

    /// Deletes the slot when it belongs to the mentor and is neither booked nor
    /// under a live reservation. Returns whether a row was removed.
    async fn delete_unclaimed(
        &self,
        slot_id: Uuid,
        mentor_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<bool>;

    /// Conditional reservation; false when the slot is booked or held by someone else.
    async fn reserve(
        &self,
        slot_id: Uuid,
        reserved_by: String,
        reserved_until: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<bool>;

    /// Drops a reservation only if it is still held by `reserved_by`.
    async fn release_reservation(&self, slot_id: Uuid, reserved_by: String) -> Result<()>;
}
