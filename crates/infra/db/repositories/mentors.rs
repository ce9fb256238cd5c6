use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use diesel::{OptionalExtension, RunQueryDsl, insert_into, prelude::*, update};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{postgres_connection::PgPoolSquad, schema::mentors},
};
use domain::{
    entities::mentors::{InsertMentorEntity, MentorEntity, UpdateMentorEntity},
    repositories::mentors::MentorRepository,
};

pub struct MentorPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl MentorPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl MentorRepository for MentorPostgres {
    async fn find_by_id(&self, mentor_id: Uuid) -> Result<Option<MentorEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let mentor = mentors::table
            .find(mentor_id)
            .select(MentorEntity::as_select())
            .first::<MentorEntity>(&mut conn)
            .optional()?;

        Ok(mentor)
    }

    async fn find_by_user_id(&self, user_id: Uuid) -> Result<Option<MentorEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let mentor = mentors::table
            .filter(mentors::user_id.eq(user_id))
            .select(MentorEntity::as_select())
            .first::<MentorEntity>(&mut conn)
            .optional()?;

        Ok(mentor)
    }

    async fn list_active(&self) -> Result<Vec<MentorEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let results = mentors::table
            .filter(mentors::is_active.eq(true))
            .order(mentors::name.asc())
            .select(MentorEntity::as_select())
            .load::<MentorEntity>(&mut conn)?;

        Ok(results)
    }

    async fn list_all(&self) -> Result<Vec<MentorEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let results = mentors::table
            .order(mentors::created_at.desc())
            .select(MentorEntity::as_select())
            .load::<MentorEntity>(&mut conn)?;

        Ok(results)
    }

    async fn create(&self, mentor: InsertMentorEntity) -> Result<MentorEntity> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let created = insert_into(mentors::table)
            .values(&mentor)
            .returning(MentorEntity::as_returning())
            .get_result::<MentorEntity>(&mut conn)?;

        Ok(created)
    }

    async fn update(
        &self,
        mentor_id: Uuid,
        mut changeset: UpdateMentorEntity,
    ) -> Result<Option<MentorEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;
        changeset.updated_at = Some(Utc::now());

        let updated = update(mentors::table.find(mentor_id))
            .set(&changeset)
            .returning(MentorEntity::as_returning())
            .get_result::<MentorEntity>(&mut conn)
            .optional()?;

        Ok(updated)
    }
}
