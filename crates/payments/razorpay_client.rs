use std::collections::HashMap;

use anyhow::Result;
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::error;

use crate::domain::value_objects::payments::PaymentMethodDetails;
use crate::payments::razorpay_signature;

const RAZORPAY_API_BASE: &str = "https://api.razorpay.com/v1";

/// Minimal Razorpay client built on reqwest.
pub struct RazorpayClient {
    http: reqwest::Client,
    api_base: String,
    key_id: String,
    key_secret: String,
    webhook_secret: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CreateOrderParams {
    /// Paise.
    pub amount: i64,
    pub currency: String,
    pub receipt: String,
    pub notes: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RazorpayOrder {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    pub receipt: Option<String>,
    pub status: Option<String>,
    #[serde(default, deserialize_with = "notes_map")]
    pub notes: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RazorpayCard {
    pub network: Option<String>,
    pub last4: Option<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RazorpayPayment {
    pub id: String,
    pub order_id: Option<String>,
    pub amount: i64,
    pub currency: String,
    pub status: String,
    pub method: Option<String>,
    pub card: Option<RazorpayCard>,
    pub bank: Option<String>,
    pub wallet: Option<String>,
    pub vpa: Option<String>,
    pub email: Option<String>,
    pub contact: Option<String>,
    pub fee: Option<i64>,
    pub tax: Option<i64>,
    #[serde(default, deserialize_with = "notes_map")]
    pub notes: HashMap<String, String>,
}

impl RazorpayPayment {
    pub fn method_details(&self) -> PaymentMethodDetails {
        PaymentMethodDetails {
            method: self
                .method
                .clone()
                .filter(|method| !method.is_empty())
                .unwrap_or_else(|| PaymentMethodDetails::FALLBACK_METHOD.to_string()),
            card_network: self.card.as_ref().and_then(|card| card.network.clone()),
            card_last4: self.card.as_ref().and_then(|card| card.last4.clone()),
            bank: self.bank.clone(),
            wallet: self.wallet.clone(),
            vpa: self.vpa.clone(),
            fee: self.fee,
            tax: self.tax,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RazorpayWebhookEvent {
    pub event: String,
    #[serde(default)]
    pub payload: RazorpayWebhookPayload,
    pub created_at: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RazorpayWebhookPayload {
    pub payment: Option<EntityWrapper<RazorpayPayment>>,
    pub order: Option<EntityWrapper<RazorpayOrder>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EntityWrapper<T> {
    pub entity: T,
}

#[derive(Debug, Deserialize)]
struct RazorpayErrorEnvelope {
    error: RazorpayErrorDetails,
}

#[derive(Debug, Deserialize)]
struct RazorpayErrorDetails {
    code: Option<String>,
    description: Option<String>,
    source: Option<String>,
    step: Option<String>,
    reason: Option<String>,
    field: Option<String>,
}

/// Razorpay serializes empty notes as `[]` rather than `{}`.
fn notes_map<'de, D>(deserializer: D) -> std::result::Result<HashMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Notes {
        Map(HashMap<String, serde_json::Value>),
        List(#[allow(dead_code)] Vec<serde_json::Value>),
    }

    let notes = Option::<Notes>::deserialize(deserializer)?;
    Ok(match notes {
        Some(Notes::Map(map)) => map
            .into_iter()
            .map(|(key, value)| {
                let value = match value {
                    serde_json::Value::String(text) => text,
                    other => other.to_string(),
                };
                (key, value)
            })
            .collect(),
        Some(Notes::List(_)) | None => HashMap::new(),
    })
}

impl RazorpayClient {
    pub fn new(key_id: String, key_secret: String, webhook_secret: String) -> Self {
        Self::with_api_base(
            key_id,
            key_secret,
            webhook_secret,
            RAZORPAY_API_BASE.to_string(),
        )
    }

    pub fn with_api_base(
        key_id: String,
        key_secret: String,
        webhook_secret: String,
        api_base: String,
    ) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(15))
                .build()
                .unwrap_or_default(),
            api_base: api_base.trim_end_matches('/').to_string(),
            key_id,
            key_secret,
            webhook_secret,
        }
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// Checkout callback check: HMAC over `order_id|payment_id` with the key secret.
    pub fn verify_payment_signature(&self, order_id: &str, payment_id: &str, signature: &str) -> bool {
        razorpay_signature::verify_payment_signature(&self.key_secret, order_id, payment_id, signature)
    }

    /// Webhook check: HMAC over the raw body with the webhook secret.
    pub fn verify_webhook_signature(&self, payload: &[u8], signature: &str) -> bool {
        razorpay_signature::verify_webhook_signature(&self.webhook_secret, payload, signature)
    }

    async fn ensure_success(resp: reqwest::Response, context: &str) -> Result<reqwest::Response> {
        if resp.status().is_success() {
            return Ok(resp);
        }

        let status = resp.status();
        let request_id = resp
            .headers()
            .get("x-razorpay-request-id")
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());

        let body = match resp.text().await {
            Ok(text) if !text.is_empty() => text,
            Ok(_) => "<empty response body>".to_string(),
            Err(err) => format!("<failed to read response body: {err}>"),
        };

        let details = serde_json::from_str::<RazorpayErrorEnvelope>(&body)
            .ok()
            .map(|envelope| envelope.error);

        error!(
            status = %status,
            razorpay_request_id = ?request_id,
            razorpay_error_code = ?details.as_ref().and_then(|d| d.code.as_deref()),
            razorpay_error_description = ?details.as_ref().and_then(|d| d.description.as_deref()),
            razorpay_error_source = ?details.as_ref().and_then(|d| d.source.as_deref()),
            razorpay_error_step = ?details.as_ref().and_then(|d| d.step.as_deref()),
            razorpay_error_reason = ?details.as_ref().and_then(|d| d.reason.as_deref()),
            razorpay_error_field = ?details.as_ref().and_then(|d| d.field.as_deref()),
            context = %context,
            "razorpay api request failed"
        );

        anyhow::bail!(
            "Razorpay API request failed: {} (status {}, request_id={:?})",
            context,
            status,
            request_id
        );
    }

    /// https://razorpay.com/docs/api/orders/create/
    pub async fn create_order(&self, params: &CreateOrderParams) -> Result<RazorpayOrder> {
        let resp = self
            .http
            .post(format!("{}/orders", self.api_base))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .header(CONTENT_TYPE, "application/json")
            .json(params)
            .send()
            .await?;
        let resp = Self::ensure_success(resp, "create order").await?;

        let order: RazorpayOrder = resp.json().await?;
        Ok(order)
    }

    /// https://razorpay.com/docs/api/orders/fetch-with-id/
    pub async fn fetch_order(&self, order_id: &str) -> Result<RazorpayOrder> {
        let resp = self
            .http
            .get(format!("{}/orders/{}", self.api_base, order_id))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .send()
            .await?;
        let resp = Self::ensure_success(resp, "fetch order").await?;

        let order: RazorpayOrder = resp.json().await?;
        Ok(order)
    }

    /// https://razorpay.com/docs/api/payments/fetch-with-id/
    /// Card network and last four digits only come back with `expand[]=card`.
    pub async fn fetch_payment(&self, payment_id: &str) -> Result<RazorpayPayment> {
        let resp = self
            .http
            .get(format!("{}/payments/{}", self.api_base, payment_id))
            .query(&[("expand[]", "card")])
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .send()
            .await?;
        let resp = Self::ensure_success(resp, "fetch payment").await?;

        let payment: RazorpayPayment = resp.json().await?;
        Ok(payment)
    }

    pub fn parse_webhook_event(payload: &[u8]) -> Result<RazorpayWebhookEvent> {
        let event: RazorpayWebhookEvent = serde_json::from_slice(payload)?;
        Ok(event)
    }
}
