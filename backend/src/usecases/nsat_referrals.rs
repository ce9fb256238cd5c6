use std::sync::Arc;

use axum::http::StatusCode;
use crates::{
    domain::{
        entities::{
            nsat_referrals::{InsertNsatReferralEntity, NsatReferralEntity},
            referral_codes::InsertReferralCodeEntity,
        },
        repositories::{
            nsat_referrals::NsatReferralRepository, referral_codes::ReferralCodeRepository,
        },
        value_objects::{
            enums::nsat_statuses::NsatStatus,
            nsat_referrals::{CreateNsatReferralRequest, NsatReferralDto},
        },
    },
    email::templates::{self, BroadcastContent},
};
use rand::{Rng, distributions::Uniform};
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::{gateways::Mailer, notifications::send_best_effort};
use crate::axum_http::error_responses::StatusCodeError;

const CODE_PREFIX: &str = "NSAT-";
const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const CODE_LENGTH: usize = 6;
const CODE_ATTEMPTS: usize = 5;

#[derive(Debug, Error)]
pub enum NsatError {
    #[error("{0}")]
    InvalidRequest(String),
    #[error("a request for this NSAT registration is already open")]
    DuplicateRegistration,
    #[error("NSAT referral not found")]
    NotFound,
    #[error("NSAT referral is already {0}")]
    AlreadyReviewed(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl StatusCodeError for NsatError {
    fn status_code(&self) -> StatusCode {
        match self {
            NsatError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            NsatError::DuplicateRegistration | NsatError::AlreadyReviewed(_) => {
                StatusCode::CONFLICT
            }
            NsatError::NotFound => StatusCode::NOT_FOUND,
            NsatError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// `NSAT-` followed by six characters without look-alikes (no 0/O, 1/I).
pub fn generate_nsat_code<R: Rng>(rng: &mut R) -> String {
    let index = Uniform::from(0..CODE_ALPHABET.len());
    let suffix: String = (0..CODE_LENGTH)
        .map(|_| CODE_ALPHABET[rng.sample(index)] as char)
        .collect();
    format!("{CODE_PREFIX}{suffix}")
}

pub struct NsatReferralUseCase<N, R>
where
    N: NsatReferralRepository + Send + Sync + 'static,
    R: ReferralCodeRepository + Send + Sync + 'static,
{
    nsat_repo: Arc<N>,
    referral_repo: Arc<R>,
    mailer: Arc<dyn Mailer>,
    site_url: String,
    admin_notification_email: Option<String>,
}

impl<N, R> NsatReferralUseCase<N, R>
where
    N: NsatReferralRepository + Send + Sync + 'static,
    R: ReferralCodeRepository + Send + Sync + 'static,
{
    pub fn new(
        nsat_repo: Arc<N>,
        referral_repo: Arc<R>,
        mailer: Arc<dyn Mailer>,
        site_url: String,
        admin_notification_email: Option<String>,
    ) -> Self {
        Self {
            nsat_repo,
            referral_repo,
            mailer,
            site_url,
            admin_notification_email,
        }
    }

    pub async fn submit(
        &self,
        request: CreateNsatReferralRequest,
    ) -> Result<NsatReferralDto, NsatError> {
        let student_name = request.student_name.trim().to_string();
        let student_email = request.student_email.trim().to_ascii_lowercase();
        let registration_id = request.nsat_registration_id.trim().to_ascii_uppercase();

        if student_name.is_empty() || registration_id.is_empty() {
            return Err(NsatError::InvalidRequest(
                "student_name and nsat_registration_id are required".to_string(),
            ));
        }
        if !student_email.contains('@') {
            return Err(NsatError::InvalidRequest(
                "a valid student_email is required".to_string(),
            ));
        }

        let open = self
            .nsat_repo
            .find_open_by_registration_id(registration_id.clone())
            .await
            .map_err(|err| {
                error!(db_error = ?err, "nsat_referrals: duplicate check failed");
                NsatError::Internal(err)
            })?;
        if open.is_some() {
            info!(%registration_id, "nsat_referrals: duplicate registration rejected");
            return Err(NsatError::DuplicateRegistration);
        }

        let created = self
            .nsat_repo
            .create(InsertNsatReferralEntity {
                student_name,
                student_email,
                student_phone: request
                    .student_phone
                    .map(|phone| phone.trim().to_string())
                    .filter(|phone| !phone.is_empty()),
                nsat_registration_id: registration_id,
                preferred_mentor_id: request.preferred_mentor_id,
                status: NsatStatus::Pending.to_string(),
            })
            .await
            .map_err(|err| {
                error!(db_error = ?err, "nsat_referrals: create failed");
                NsatError::Internal(err)
            })?;

        info!(nsat_referral_id = %created.id, "nsat_referrals: request submitted");

        send_best_effort(
            self.mailer.as_ref(),
            &created.student_email,
            templates::nsat_request_received(&created.student_name, &created.nsat_registration_id),
            "nsat_request_received",
        )
        .await;

        if let Some(admin_email) = self.admin_notification_email.as_deref() {
            let alert = BroadcastContent {
                heading: Some("New NSAT free-session request".to_string()),
                body: Some(format!(
                    "{} ({}) submitted NSAT registration {}.",
                    created.student_name, created.student_email, created.nsat_registration_id
                )),
                cta_label: Some("Review requests".to_string()),
                cta_url: Some(format!(
                    "{}/admin/nsat-referrals",
                    self.site_url.trim_end_matches('/')
                )),
                ..BroadcastContent::default()
            };
            send_best_effort(
                self.mailer.as_ref(),
                admin_email,
                templates::custom("New NSAT referral request", &alert),
                "nsat_admin_alert",
            )
            .await;
        }

        Ok(created.into())
    }

    pub async fn list(&self, status: Option<&str>) -> Result<Vec<NsatReferralDto>, NsatError> {
        let status = match status.map(str::trim).filter(|raw| !raw.is_empty()) {
            Some(raw) => Some(NsatStatus::from_str(raw).ok_or_else(|| {
                NsatError::InvalidRequest(format!("unknown NSAT status: {raw}"))
            })?),
            None => None,
        };

        let referrals = self.nsat_repo.list(status).await.map_err(|err| {
            error!(db_error = ?err, "nsat_referrals: list failed");
            NsatError::Internal(err)
        })?;
        Ok(referrals.into_iter().map(NsatReferralDto::from).collect())
    }

    async fn load_pending(&self, referral_id: Uuid) -> Result<NsatReferralEntity, NsatError> {
        let referral = self
            .nsat_repo
            .find_by_id(referral_id)
            .await
            .map_err(NsatError::Internal)?
            .ok_or(NsatError::NotFound)?;

        if referral.status != NsatStatus::Pending.as_str() {
            warn!(
                %referral_id,
                status = %referral.status,
                "nsat_referrals: review of non-pending request rejected"
            );
            return Err(NsatError::AlreadyReviewed(referral.status));
        }
        Ok(referral)
    }

    async fn issue_code(&self) -> Result<String, NsatError> {
        for _ in 0..CODE_ATTEMPTS {
            let code = generate_nsat_code(&mut rand::thread_rng());
            let taken = self
                .referral_repo
                .find_by_code(code.clone())
                .await
                .map_err(NsatError::Internal)?
                .is_some();
            if taken {
                continue;
            }

            self.referral_repo
                .create(InsertReferralCodeEntity {
                    code: code.clone(),
                    discount_percent: 100,
                    max_uses: Some(1),
                    times_used: 0,
                    is_active: true,
                    expires_at: None,
                })
                .await
                .map_err(|err| {
                    error!(db_error = ?err, "nsat_referrals: referral code create failed");
                    NsatError::Internal(err)
                })?;
            return Ok(code);
        }

        Err(NsatError::Internal(anyhow::anyhow!(
            "could not find a free NSAT code after {CODE_ATTEMPTS} attempts"
        )))
    }

    pub async fn approve(
        &self,
        referral_id: Uuid,
        note: Option<String>,
    ) -> Result<NsatReferralDto, NsatError> {
        self.load_pending(referral_id).await?;
        let code = self.issue_code().await?;

        let reviewed = self
            .nsat_repo
            .review(referral_id, NsatStatus::Approved, note, Some(code.clone()))
            .await
            .map_err(NsatError::Internal)?
            .ok_or_else(|| {
                warn!(%referral_id, %code, "nsat_referrals: reviewed concurrently, code left unused");
                NsatError::AlreadyReviewed("reviewed".to_string())
            })?;

        info!(%referral_id, %code, "nsat_referrals: request approved");

        send_best_effort(
            self.mailer.as_ref(),
            &reviewed.student_email,
            templates::nsat_approval(&reviewed.student_name, &code, &self.site_url),
            "nsat_approval",
        )
        .await;

        Ok(reviewed.into())
    }

    pub async fn reject(
        &self,
        referral_id: Uuid,
        note: Option<String>,
    ) -> Result<NsatReferralDto, NsatError> {
        self.load_pending(referral_id).await?;
        let note = note
            .map(|note| note.trim().to_string())
            .filter(|note| !note.is_empty());

        let reviewed = self
            .nsat_repo
            .review(referral_id, NsatStatus::Rejected, note.clone(), None)
            .await
            .map_err(NsatError::Internal)?
            .ok_or_else(|| NsatError::AlreadyReviewed("reviewed".to_string()))?;

        info!(%referral_id, "nsat_referrals: request rejected");

        send_best_effort(
            self.mailer.as_ref(),
            &reviewed.student_email,
            templates::nsat_rejection(&reviewed.student_name, note.as_deref()),
            "nsat_rejection",
        )
        .await;

        Ok(reviewed.into())
    }
}
