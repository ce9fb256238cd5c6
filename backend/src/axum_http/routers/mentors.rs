use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    response::IntoResponse,
    routing::get,
};
use crates::{
    domain::repositories::{
        availability_slots::AvailabilitySlotRepository, mentors::MentorRepository,
    },
    infra::db::repositories::{
        availability_slots::AvailabilitySlotPostgres, mentors::MentorPostgres,
    },
};
use uuid::Uuid;

use super::AppDependencies;
use crate::{axum_http::error_responses::AppError, usecases::mentors::MentorUseCase};

pub fn routes(deps: &AppDependencies) -> Router {
    let mentor_repository = MentorPostgres::new(Arc::clone(&deps.db_pool));
    let slot_repository = AvailabilitySlotPostgres::new(Arc::clone(&deps.db_pool));
    let mentor_usecase = MentorUseCase::new(Arc::new(mentor_repository), Arc::new(slot_repository));

    router(Arc::new(mentor_usecase))
}

pub fn router<M, S>(mentor_usecase: Arc<MentorUseCase<M, S>>) -> Router
where
    M: MentorRepository + Send + Sync + 'static,
    S: AvailabilitySlotRepository + Send + Sync + 'static,
{
    Router::new()
        .route("/", get(list::<M, S>))
        .route("/:mentor_id", get(get_one::<M, S>))
        .route("/:mentor_id/slots", get(slots::<M, S>))
        .with_state(mentor_usecase)
}

pub async fn list<M, S>(
    State(mentor_usecase): State<Arc<MentorUseCase<M, S>>>,
) -> Result<impl IntoResponse, AppError>
where
    M: MentorRepository + Send + Sync + 'static,
    S: AvailabilitySlotRepository + Send + Sync + 'static,
{
    let mentors = mentor_usecase
        .list_active()
        .await
        .map_err(AppError::from_usecase)?;
    Ok(Json(mentors))
}

pub async fn get_one<M, S>(
    State(mentor_usecase): State<Arc<MentorUseCase<M, S>>>,
    Path(mentor_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError>
where
    M: MentorRepository + Send + Sync + 'static,
    S: AvailabilitySlotRepository + Send + Sync + 'static,
{
    let mentor = mentor_usecase
        .get_active(mentor_id)
        .await
        .map_err(AppError::from_usecase)?;
    Ok(Json(mentor))
}

pub async fn slots<M, S>(
    State(mentor_usecase): State<Arc<MentorUseCase<M, S>>>,
    Path(mentor_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError>
where
    M: MentorRepository + Send + Sync + 'static,
    S: AvailabilitySlotRepository + Send + Sync + 'static,
{
    let slots = mentor_usecase
        .list_bookable_slots(mentor_id)
        .await
        .map_err(AppError::from_usecase)?;
    Ok(Json(slots))
}
