use std::sync::Arc;

use axum::http::StatusCode;
use chrono::Utc;
use crates::domain::{
    entities::referral_codes::{
        InsertReferralCodeEntity, InsertReferralUseEntity, ReferralCodeEntity,
    },
    repositories::referral_codes::ReferralCodeRepository,
    value_objects::referrals::{
        CreateReferralCodeRequest, RecordReferralUseRequest, ReferralCodeDto, ReferralUseOutcome,
        ReferralValidationDto, normalize_code,
    },
};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::axum_http::error_responses::StatusCodeError;

#[derive(Debug, Error)]
pub enum ReferralError {
    #[error("{0}")]
    InvalidRequest(String),
    #[error("referral code not found")]
    NotFound,
    #[error("{0}")]
    Unusable(&'static str),
    #[error("referral code already exists")]
    AlreadyExists,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl StatusCodeError for ReferralError {
    fn status_code(&self) -> StatusCode {
        match self {
            ReferralError::InvalidRequest(_) | ReferralError::Unusable(_) => {
                StatusCode::BAD_REQUEST
            }
            ReferralError::NotFound => StatusCode::NOT_FOUND,
            ReferralError::AlreadyExists => StatusCode::CONFLICT,
            ReferralError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Loads a code and checks it can still be applied.
pub async fn find_usable_code<R>(
    referral_repo: &R,
    raw_code: &str,
) -> Result<ReferralCodeEntity, ReferralError>
where
    R: ReferralCodeRepository + ?Sized,
{
    let code = normalize_code(raw_code);
    if code.is_empty() {
        return Err(ReferralError::InvalidRequest(
            "referral code is required".to_string(),
        ));
    }

    let referral = referral_repo
        .find_by_code(code.clone())
        .await
        .map_err(|err| {
            error!(%code, db_error = ?err, "referrals: lookup failed");
            ReferralError::Internal(err)
        })?
        .ok_or_else(|| {
            info!(%code, "referrals: unknown code");
            ReferralError::NotFound
        })?;

    if let Some(reason) = referral.rejection_reason(Utc::now()) {
        info!(%code, reason, "referrals: code rejected");
        return Err(ReferralError::Unusable(reason));
    }

    Ok(referral)
}

pub struct ReferralUseCase<R>
where
    R: ReferralCodeRepository + Send + Sync + 'static,
{
    referral_repo: Arc<R>,
}

impl<R> ReferralUseCase<R>
where
    R: ReferralCodeRepository + Send + Sync + 'static,
{
    pub fn new(referral_repo: Arc<R>) -> Self {
        Self { referral_repo }
    }

    pub async fn validate(&self, raw_code: &str) -> Result<ReferralValidationDto, ReferralError> {
        let referral = find_usable_code(self.referral_repo.as_ref(), raw_code).await?;
        Ok(ReferralValidationDto {
            valid: true,
            code: referral.code,
            discount_percent: referral.discount_percent,
        })
    }

    pub async fn record_use(
        &self,
        request: RecordReferralUseRequest,
    ) -> Result<ReferralUseOutcome, ReferralError> {
        let user_email = request.user_email.trim().to_ascii_lowercase();
        let order_id = request.razorpay_order_id.trim().to_string();
        if user_email.is_empty() || order_id.is_empty() {
            return Err(ReferralError::InvalidRequest(
                "user_email and razorpay_order_id are required".to_string(),
            ));
        }

        let code = normalize_code(&request.code);
        let referral = self
            .referral_repo
            .find_by_code(code.clone())
            .await
            .map_err(|err| {
                error!(%code, db_error = ?err, "referrals: lookup failed");
                ReferralError::Internal(err)
            })?
            .ok_or(ReferralError::NotFound)?;

        let outcome = self
            .referral_repo
            .record_use(InsertReferralUseEntity {
                referral_code_id: referral.id,
                code: referral.code,
                user_email,
                razorpay_order_id: order_id.clone(),
            })
            .await
            .map_err(|err| {
                error!(%code, %order_id, db_error = ?err, "referrals: record use failed");
                ReferralError::Internal(err)
            })?;

        info!(%code, %order_id, ?outcome, "referrals: use recorded");
        Ok(outcome)
    }

    pub async fn create_code(
        &self,
        request: CreateReferralCodeRequest,
    ) -> Result<ReferralCodeDto, ReferralError> {
        let code = normalize_code(&request.code);
        if code.is_empty()
            || !code
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(ReferralError::InvalidRequest(
                "code must be letters, digits, '-' or '_'".to_string(),
            ));
        }
        if !(1..=100).contains(&request.discount_percent) {
            return Err(ReferralError::InvalidRequest(
                "discount_percent must be between 1 and 100".to_string(),
            ));
        }
        if request.max_uses.is_some_and(|max_uses| max_uses < 1) {
            return Err(ReferralError::InvalidRequest(
                "max_uses must be at least 1".to_string(),
            ));
        }

        let existing = self
            .referral_repo
            .find_by_code(code.clone())
            .await
            .map_err(ReferralError::Internal)?;
        if existing.is_some() {
            warn!(%code, "referrals: code already exists");
            return Err(ReferralError::AlreadyExists);
        }

        let created = self
            .referral_repo
            .create(InsertReferralCodeEntity {
                code: code.clone(),
                discount_percent: request.discount_percent,
                max_uses: request.max_uses,
                times_used: 0,
                is_active: true,
                expires_at: request.expires_at,
            })
            .await
            .map_err(|err| {
                error!(%code, db_error = ?err, "referrals: create failed");
                ReferralError::Internal(err)
            })?;

        info!(%code, referral_code_id = %created.id, "referrals: code created");
        Ok(created.into())
    }
}
