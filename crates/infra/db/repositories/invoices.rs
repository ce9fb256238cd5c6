use anyhow::Result;
use async_trait::async_trait;
use diesel::{RunQueryDsl, sql_types::Text};
use std::sync::Arc;

use crate::{
    domain::repositories::invoices::InvoiceRepository,
    infra::db::postgres::postgres_connection::PgPoolSquad,
};

const INVOICE_SEQUENCE: &str = "invoice_number_seq";

diesel::define_sql_function! {
    fn nextval(sequence_name: Text) -> diesel::sql_types::BigInt;
}

pub struct InvoicePostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl InvoicePostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl InvoiceRepository for InvoicePostgres {
    async fn next_invoice_number(&self) -> Result<i64> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let value = diesel::select(nextval(INVOICE_SEQUENCE)).get_result::<i64>(&mut conn)?;

        Ok(value)
    }
}
