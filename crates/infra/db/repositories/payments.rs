use anyhow::Result;
use async_trait::async_trait;
use diesel::{
    OptionalExtension, PgConnection, RunQueryDsl,
    insert_into,
    pg::Pg,
    prelude::*,
    query_builder::QueryFragment,
    query_dsl::methods::LoadQuery,
    sql_types::{BigInt, Nullable, Text, Uuid as SqlUuid},
    upsert::excluded,
};
use std::sync::Arc;

use crate::{
    domain,
    infra::db::postgres::{postgres_connection::PgPoolSquad, schema::payments},
};
use domain::{
    entities::payments::{PaymentEntity, UpsertPaymentEntity},
    repositories::payments::PaymentRepository,
    value_objects::payments::PaymentMethodDetails,
};

diesel::define_sql_function! {
    #[sql_name = "COALESCE"]
    fn coalesce_text(value: Nullable<Text>, fallback: Nullable<Text>) -> Nullable<Text>;
}

diesel::define_sql_function! {
    #[sql_name = "COALESCE"]
    fn coalesce_bigint(value: Nullable<BigInt>, fallback: Nullable<BigInt>) -> Nullable<BigInt>;
}

diesel::define_sql_function! {
    #[sql_name = "COALESCE"]
    fn coalesce_uuid(value: Nullable<SqlUuid>, fallback: Nullable<SqlUuid>) -> Nullable<SqlUuid>;
}

diesel::define_sql_function! {
    #[sql_name = "NULLIF"]
    fn nullif_text(value: Text, unset: Text) -> Nullable<Text>;
}

/// `INSERT .. ON CONFLICT (razorpay_order_id) DO UPDATE` that merges a retry
/// into the stored row. `invoice_id` is absent from the update list.
fn upsert_statement(
    payment: &UpsertPaymentEntity,
) -> impl QueryFragment<Pg> + LoadQuery<'_, PgConnection, PaymentEntity> {
    insert_into(payments::table)
        .values(payment)
        .on_conflict(payments::razorpay_order_id)
        .do_update()
        .set((
            payments::booking_id.eq(coalesce_uuid(
                excluded(payments::booking_id),
                payments::booking_id,
            )),
            payments::razorpay_payment_id.eq(excluded(payments::razorpay_payment_id)),
            payments::razorpay_signature.eq(coalesce_text(
                excluded(payments::razorpay_signature),
                payments::razorpay_signature,
            )),
            payments::amount.eq(excluded(payments::amount)),
            payments::currency.eq(excluded(payments::currency)),
            payments::status.eq(excluded(payments::status)),
            payments::payment_method.eq(coalesce_text(
                nullif_text(
                    excluded(payments::payment_method),
                    PaymentMethodDetails::FALLBACK_METHOD,
                ),
                payments::payment_method.nullable(),
            )
            .assume_not_null()),
            payments::card_network.eq(coalesce_text(
                excluded(payments::card_network),
                payments::card_network,
            )),
            payments::card_last4.eq(coalesce_text(
                excluded(payments::card_last4),
                payments::card_last4,
            )),
            payments::bank.eq(coalesce_text(excluded(payments::bank), payments::bank)),
            payments::wallet.eq(coalesce_text(excluded(payments::wallet), payments::wallet)),
            payments::vpa.eq(coalesce_text(excluded(payments::vpa), payments::vpa)),
            payments::fee.eq(coalesce_bigint(excluded(payments::fee), payments::fee)),
            payments::tax.eq(coalesce_bigint(excluded(payments::tax), payments::tax)),
            payments::updated_at.eq(excluded(payments::updated_at)),
        ))
        .returning(PaymentEntity::as_returning())
}

pub struct PaymentPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl PaymentPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl PaymentRepository for PaymentPostgres {
    async fn upsert_by_order_id(&self, payment: UpsertPaymentEntity) -> Result<PaymentEntity> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let row = upsert_statement(&payment).get_result::<PaymentEntity>(&mut conn)?;

        Ok(row)
    }

    async fn find_by_order_id(&self, razorpay_order_id: String) -> Result<Option<PaymentEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let row = payments::table
            .filter(payments::razorpay_order_id.eq(razorpay_order_id))
            .select(PaymentEntity::as_select())
            .first::<PaymentEntity>(&mut conn)
            .optional()?;

        Ok(row)
    }
}
