use anyhow::Result as AnyResult;
use async_trait::async_trait;
use crates::{
    email::resend_client::{EmailMessage, ResendClient},
    payments::razorpay_client::{CreateOrderParams, RazorpayClient, RazorpayOrder, RazorpayPayment},
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    fn key_id(&self) -> String;

    fn verify_payment_signature(&self, order_id: &str, payment_id: &str, signature: &str) -> bool;

    fn verify_webhook_signature(&self, payload: &[u8], signature: &str) -> bool;

    async fn create_order(&self, params: CreateOrderParams) -> AnyResult<RazorpayOrder>;

    async fn fetch_order(&self, order_id: &str) -> AnyResult<RazorpayOrder>;

    async fn fetch_payment(&self, payment_id: &str) -> AnyResult<RazorpayPayment>;
}

#[async_trait]
impl PaymentGateway for RazorpayClient {
    fn key_id(&self) -> String {
        RazorpayClient::key_id(self).to_string()
    }

    fn verify_payment_signature(&self, order_id: &str, payment_id: &str, signature: &str) -> bool {
        RazorpayClient::verify_payment_signature(self, order_id, payment_id, signature)
    }

    fn verify_webhook_signature(&self, payload: &[u8], signature: &str) -> bool {
        RazorpayClient::verify_webhook_signature(self, payload, signature)
    }

    async fn create_order(&self, params: CreateOrderParams) -> AnyResult<RazorpayOrder> {
        RazorpayClient::create_order(self, &params).await
    }

    async fn fetch_order(&self, order_id: &str) -> AnyResult<RazorpayOrder> {
        RazorpayClient::fetch_order(self, order_id).await
    }

    async fn fetch_payment(&self, payment_id: &str) -> AnyResult<RazorpayPayment> {
        RazorpayClient::fetch_payment(self, payment_id).await
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: EmailMessage) -> AnyResult<()>;
}

#[async_trait]
impl Mailer for ResendClient {
    async fn send(&self, message: EmailMessage) -> AnyResult<()> {
        ResendClient::send(self, &message).await?;
        Ok(())
    }
}
