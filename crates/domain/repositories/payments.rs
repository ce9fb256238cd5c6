use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;

use crate::domain::entities::payments::{PaymentEntity, UpsertPaymentEntity};

#[automock]
#[async_trait]
pub trait PaymentRepository: Send + Sync {
    /// Insert, or merge into the row that already carries this gateway order id.
    /// The stored `invoice_id` is kept, nullable audit fields only take non-null
    /// values, and the fallback method never replaces a known one. Returns the
    /// row as stored.
    async fn upsert_by_order_id(&self, payment: UpsertPaymentEntity) -> Result<PaymentEntity>;

    async fn find_by_order_id(&self, razorpay_order_id: String) -> Result<Option<PaymentEntity>>;
}
