use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;

#[automock]
#[async_trait]
pub trait InvoiceRepository: Send + Sync {
    /// Next value of the database invoice sequence.
    async fn next_invoice_number(&self) -> Result<i64>;
}
