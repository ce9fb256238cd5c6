use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infra::db::postgres::schema::payments;

#[derive(Debug, Clone, PartialEq, Identifiable, Selectable, Queryable)]
#[diesel(table_name = payments)]
pub struct PaymentEntity {
    pub id: Uuid,
    pub booking_id: Option<Uuid>,
    pub razorpay_order_id: String,
    pub razorpay_payment_id: String,
    pub razorpay_signature: Option<String>,
    /// Paise.
    pub amount: i64,
    pub currency: String,
    pub status: String,
    pub invoice_id: String,
    pub payment_method: String,
    pub card_network: Option<String>,
    pub card_last4: Option<String>,
    pub bank: Option<String>,
    pub wallet: Option<String>,
    pub vpa: Option<String>,
    pub fee: Option<i64>,
    pub tax: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Row written by the settlement upsert. Also used as the `ON CONFLICT` changeset,
/// so every field here is overwritten when the order id already exists.
/// Insert half of the payment upsert. On conflict the repository merges it
/// into the stored row instead of overwriting it wholesale.
#[derive(Debug, Clone, PartialEq, Insertable)]
#[diesel(table_name = payments)]
pub struct UpsertPaymentEntity {
    pub booking_id: Option<Uuid>,
    pub razorpay_order_id: String,
    pub razorpay_payment_id: String,
    pub razorpay_signature: Option<String>,
    pub amount: i64,
    pub currency: String,
    pub status: String,
    pub invoice_id: String,
    pub payment_method: String,
    pub card_network: Option<String>,
    pub card_last4: Option<String>,
    pub bank: Option<String>,
    pub wallet: Option<String>,
    pub vpa: Option<String>,
    pub fee: Option<i64>,
    pub tax: Option<i64>,
    pub updated_at: DateTime<Utc>,
}
