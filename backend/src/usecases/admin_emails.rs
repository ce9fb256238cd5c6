use std::sync::Arc;

use axum::http::StatusCode;
use crates::{
    domain::value_objects::emails::{BroadcastTemplate, SendEmailReport, SendEmailRequest},
    email::templates::{self, BroadcastContent, RenderedEmail},
};
use thiserror::Error;
use tracing::info;

use super::{gateways::Mailer, notifications::send_best_effort};
use crate::axum_http::error_responses::StatusCodeError;

const MAX_RECIPIENTS: usize = 500;

#[derive(Debug, Error)]
pub enum AdminEmailError {
    #[error("{0}")]
    InvalidRequest(String),
}

impl StatusCodeError for AdminEmailError {
    fn status_code(&self) -> StatusCode {
        match self {
            AdminEmailError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

pub struct AdminEmailUseCase {
    mailer: Arc<dyn Mailer>,
    site_url: String,
}

impl AdminEmailUseCase {
    pub fn new(mailer: Arc<dyn Mailer>, site_url: String) -> Self {
        Self { mailer, site_url }
    }

    fn render(&self, request: &SendEmailRequest) -> Result<RenderedEmail, AdminEmailError> {
        let content = BroadcastContent {
            subject: request.subject.clone(),
            heading: request.heading.clone(),
            body: request.body.clone(),
            cta_label: request.cta_label.clone(),
            cta_url: request.cta_url.clone(),
        };

        Ok(match request.template {
            BroadcastTemplate::Promotional => templates::promotional(&content, &self.site_url),
            BroadcastTemplate::Custom => {
                let subject = request
                    .subject
                    .as_deref()
                    .map(str::trim)
                    .filter(|subject| !subject.is_empty())
                    .ok_or_else(|| {
                        AdminEmailError::InvalidRequest(
                            "custom emails need a subject".to_string(),
                        )
                    })?;
                if content.body.as_deref().is_none_or(|body| body.trim().is_empty()) {
                    return Err(AdminEmailError::InvalidRequest(
                        "custom emails need a body".to_string(),
                    ));
                }
                templates::custom(subject, &content)
            }
            BroadcastTemplate::Onboarding => {
                templates::mentor_onboarding(request.recipient_name.as_deref(), &self.site_url)
            }
        })
    }

    /// Sends one email per recipient, in order, and reports who failed.
    pub async fn send(&self, request: SendEmailRequest) -> Result<SendEmailReport, AdminEmailError> {
        let mut recipients: Vec<String> = request
            .recipients
            .iter()
            .map(|email| email.trim().to_ascii_lowercase())
            .filter(|email| !email.is_empty())
            .collect();
        recipients.dedup();

        if recipients.is_empty() {
            return Err(AdminEmailError::InvalidRequest(
                "at least one recipient is required".to_string(),
            ));
        }
        if recipients.len() > MAX_RECIPIENTS {
            return Err(AdminEmailError::InvalidRequest(format!(
                "at most {MAX_RECIPIENTS} recipients per request"
            )));
        }

        let email = self.render(&request)?;
        let mut report = SendEmailReport {
            sent: 0,
            failed: Vec::new(),
        };

        for recipient in recipients {
            if !recipient.contains('@') {
                report.failed.push(recipient);
                continue;
            }
            let delivered = send_best_effort(
                self.mailer.as_ref(),
                &recipient,
                email.clone(),
                "admin_broadcast",
            )
            .await;
            if delivered {
                report.sent += 1;
            } else {
                report.failed.push(recipient);
            }
        }

        info!(
            template = %request.template,
            sent = report.sent,
            failed = report.failed.len(),
            "admin_emails: broadcast finished"
        );
        Ok(report)
    }
}
