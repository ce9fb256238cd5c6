use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::mentors::{InsertMentorEntity, MentorEntity, UpdateMentorEntity};

#[automock]
#[async_trait]
pub trait MentorRepository: Send + Sync {
    async fn find_by_id(&self, mentor_id: Uuid) -> Result<Option<MentorEntity>>;

    /// Mentor linked to a Supabase auth user.
    async fn find_by_user_id(&self, user_id: Uuid) -> Result<Option<MentorEntity>>;

    async fn list_active(&self) -> Result<Vec<MentorEntity>>;

    async fn list_all(&self) -> Result<Vec<MentorEntity>>;

    async fn create(&self, mentor: InsertMentorEntity) -> Result<MentorEntity>;

    async fn update(
        &self,
        mentor_id: Uuid,
        changeset: UpdateMentorEntity,
    ) -> Result<Option<MentorEntity>>;
}
