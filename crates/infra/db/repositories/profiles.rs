use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use diesel::{RunQueryDsl, prelude::*, update};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain::repositories::profiles::ProfileRepository,
    infra::db::postgres::{postgres_connection::PgPoolSquad, schema::profiles},
};

pub struct ProfilePostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl ProfilePostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl ProfileRepository for ProfilePostgres {
    async fn update_phone(
        &self,
        user_id: Option<Uuid>,
        email: String,
        phone: String,
    ) -> Result<usize> {
        let mut conn = Arc::clone(&self.db_pool).get()?;
        let now = Utc::now();

        let affected = match user_id {
            Some(user_id) => update(profiles::table.find(user_id))
                .set((profiles::phone.eq(Some(phone)), profiles::updated_at.eq(now)))
                .execute(&mut conn)?,
            None => update(profiles::table.filter(profiles::email.eq(email)))
                .set((profiles::phone.eq(Some(phone)), profiles::updated_at.eq(now)))
                .execute(&mut conn)?,
        };

        Ok(affected)
    }
}
