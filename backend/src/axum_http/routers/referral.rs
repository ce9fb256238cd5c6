use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    response::IntoResponse,
    routing::get,
};
use crates::{
    domain::{
        repositories::referral_codes::ReferralCodeRepository,
        value_objects::referrals::{RecordReferralUseRequest, ValidateReferralQuery},
    },
    infra::db::repositories::referral_codes::ReferralCodePostgres,
};
use serde_json::json;

use super::AppDependencies;
use crate::{axum_http::error_responses::AppError, usecases::referrals::ReferralUseCase};

pub fn routes(deps: &AppDependencies) -> Router {
    let referral_repository = ReferralCodePostgres::new(Arc::clone(&deps.db_pool));
    router(Arc::new(ReferralUseCase::new(Arc::new(referral_repository))))
}

pub fn router<R>(referral_usecase: Arc<ReferralUseCase<R>>) -> Router
where
    R: ReferralCodeRepository + Send + Sync + 'static,
{
    Router::new()
        .route("/", get(validate::<R>).post(record_use::<R>))
        .with_state(referral_usecase)
}

pub async fn validate<R>(
    State(referral_usecase): State<Arc<ReferralUseCase<R>>>,
    Query(query): Query<ValidateReferralQuery>,
) -> Result<impl IntoResponse, AppError>
where
    R: ReferralCodeRepository + Send + Sync + 'static,
{
    let validation = referral_usecase
        .validate(&query.code)
        .await
        .map_err(AppError::from_usecase)?;
    Ok(Json(validation))
}

pub async fn record_use<R>(
    State(referral_usecase): State<Arc<ReferralUseCase<R>>>,
    Json(request): Json<RecordReferralUseRequest>,
) -> Result<impl IntoResponse, AppError>
where
    R: ReferralCodeRepository + Send + Sync + 'static,
{
    let outcome = referral_usecase
        .record_use(request)
        .await
        .map_err(AppError::from_usecase)?;
    Ok(Json(json!({"success": true, "outcome": outcome})))
}
