use std::sync::Arc;

use axum::{
    Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::post,
};
use crates::{
    domain::{
        repositories::{
            nsat_referrals::NsatReferralRepository, referral_codes::ReferralCodeRepository,
        },
        value_objects::nsat_referrals::CreateNsatReferralRequest,
    },
    infra::db::repositories::{
        nsat_referrals::NsatReferralPostgres, referral_codes::ReferralCodePostgres,
    },
};

use super::AppDependencies;
use crate::{axum_http::error_responses::AppError, usecases::nsat_referrals::NsatReferralUseCase};

pub type PostgresNsatReferralUseCase = NsatReferralUseCase<NsatReferralPostgres, ReferralCodePostgres>;

pub fn usecase(deps: &AppDependencies) -> PostgresNsatReferralUseCase {
    NsatReferralUseCase::new(
        Arc::new(NsatReferralPostgres::new(Arc::clone(&deps.db_pool))),
        Arc::new(ReferralCodePostgres::new(Arc::clone(&deps.db_pool))),
        Arc::clone(&deps.mailer),
        deps.config.email.site_url.clone(),
        deps.config.email.admin_notification_email.clone(),
    )
}

pub fn routes(deps: &AppDependencies) -> Router {
    router(Arc::new(usecase(deps)))
}

pub fn router<N, R>(nsat_usecase: Arc<NsatReferralUseCase<N, R>>) -> Router
where
    N: NsatReferralRepository + Send + Sync + 'static,
    R: ReferralCodeRepository + Send + Sync + 'static,
{
    Router::new()
        .route("/", post(submit::<N, R>))
        .with_state(nsat_usecase)
}

pub async fn submit<N, R>(
    State(nsat_usecase): State<Arc<NsatReferralUseCase<N, R>>>,
    Json(request): Json<CreateNsatReferralRequest>,
) -> Result<impl IntoResponse, AppError>
where
    N: NsatReferralRepository + Send + Sync + 'static,
    R: ReferralCodeRepository + Send + Sync + 'static,
{
    let created = nsat_usecase
        .submit(request)
        .await
        .map_err(AppError::from_usecase)?;
    Ok((StatusCode::CREATED, Json(created)))
}
