use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

#[automock]
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// Updates by user id when known, otherwise by email. Returns affected rows.
    async fn update_phone(
        &self,
        user_id: Option<Uuid>,
        email: String,
        phone: String,
    ) -> Result<usize>;
}
