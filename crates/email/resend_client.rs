use anyhow::Result;
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use tracing::error;

const RESEND_API_BASE: &str = "https://api.resend.com";

/// Transactional email over the Resend HTTP API.
pub struct ResendClient {
    http: reqwest::Client,
    api_base: String,
    api_key: String,
    from: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[derive(Debug, Serialize)]
struct SendEmailBody<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

#[derive(Debug, Deserialize)]
struct SendEmailAccepted {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ResendErrorBody {
    name: Option<String>,
    message: Option<String>,
}

impl ResendClient {
    pub fn new(api_key: String, from: String) -> Self {
        Self::with_api_base(api_key, from, RESEND_API_BASE.to_string())
    }

    pub fn with_api_base(api_key: String, from: String, api_base: String) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key,
            from,
        }
    }

    pub fn from_address(&self) -> &str {
        &self.from
    }

    /// Returns the Resend message id.
    pub async fn send(&self, message: &EmailMessage) -> Result<String> {
        let body = SendEmailBody {
            from: &self.from,
            to: [message.to.as_str()],
            subject: &message.subject,
            html: &message.html,
        };

        let resp = self
            .http
            .post(format!("{}/emails", self.api_base))
            .bearer_auth(&self.api_key)
            .header(CONTENT_TYPE, "application/json")
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let raw = resp.text().await.unwrap_or_default();
            let details = serde_json::from_str::<ResendErrorBody>(&raw).ok();
            error!(
                status = %status,
                resend_error_name = ?details.as_ref().and_then(|d| d.name.as_deref()),
                resend_error_message = ?details.as_ref().and_then(|d| d.message.as_deref()),
                subject = %message.subject,
                "resend api request failed"
            );
            anyhow::bail!("Resend API request failed with status {}", status);
        }

        let accepted: SendEmailAccepted = resp.json().await?;
        Ok(accepted.id)
    }
}
