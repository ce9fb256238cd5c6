use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, patch},
};
use crates::{
    domain::{
        repositories::{
            availability_slots::AvailabilitySlotRepository, bookings::BookingRepository,
            mentors::MentorRepository,
        },
        value_objects::{mentors::MentorProfileUpdateRequest, slots::CreateSlotRequest},
    },
    infra::db::repositories::{
        availability_slots::AvailabilitySlotPostgres, bookings::BookingPostgres,
        mentors::MentorPostgres,
    },
};
use uuid::Uuid;

use super::AppDependencies;
use crate::{
    auth::AuthUser, axum_http::error_responses::AppError,
    usecases::mentor_dashboard::MentorDashboardUseCase,
};

pub fn routes(deps: &AppDependencies) -> Router {
    let db_pool = &deps.db_pool;
    let dashboard_usecase = MentorDashboardUseCase::new(
        Arc::new(MentorPostgres::new(Arc::clone(db_pool))),
        Arc::new(AvailabilitySlotPostgres::new(Arc::clone(db_pool))),
        Arc::new(BookingPostgres::new(Arc::clone(db_pool))),
    );

    router(Arc::new(dashboard_usecase))
}

pub fn router<M, S, B>(dashboard_usecase: Arc<MentorDashboardUseCase<M, S, B>>) -> Router
where
    M: MentorRepository + Send + Sync + 'static,
    S: AvailabilitySlotRepository + Send + Sync + 'static,
    B: BookingRepository + Send + Sync + 'static,
{
    Router::new()
        .route("/slots", get(list_slots::<M, S, B>).post(create_slot::<M, S, B>))
        .route("/slots/:slot_id", delete(delete_slot::<M, S, B>))
        .route("/profile", patch(update_profile::<M, S, B>))
        .route("/bookings", get(bookings::<M, S, B>))
        .with_state(dashboard_usecase)
}

pub async fn list_slots<M, S, B>(
    State(dashboard_usecase): State<Arc<MentorDashboardUseCase<M, S, B>>>,
    auth: AuthUser,
) -> Result<impl IntoResponse, AppError>
where
    M: MentorRepository + Send + Sync + 'static,
    S: AvailabilitySlotRepository + Send + Sync + 'static,
    B: BookingRepository + Send + Sync + 'static,
{
    let slots = dashboard_usecase
        .list_slots(auth.user_id)
        .await
        .map_err(AppError::from_usecase)?;
    Ok(Json(slots))
}

pub async fn create_slot<M, S, B>(
    State(dashboard_usecase): State<Arc<MentorDashboardUseCase<M, S, B>>>,
    auth: AuthUser,
    Json(request): Json<CreateSlotRequest>,
) -> Result<impl IntoResponse, AppError>
where
    M: MentorRepository + Send + Sync + 'static,
    S: AvailabilitySlotRepository + Send + Sync + 'static,
    B: BookingRepository + Send + Sync + 'static,
{
    let slot = dashboard_usecase
        .create_slot(auth.user_id, request)
        .await
        .map_err(AppError::from_usecase)?;
    Ok((StatusCode::CREATED, Json(slot)))
}

pub async fn delete_slot<M, S, B>(
    State(dashboard_usecase): State<Arc<MentorDashboardUseCase<M, S, B>>>,
    auth: AuthUser,
    Path(slot_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError>
where
    M: MentorRepository + Send + Sync + 'static,
    S: AvailabilitySlotRepository + Send + Sync + 'static,
    B: BookingRepository + Send + Sync + 'static,
{
    dashboard_usecase
        .delete_slot(auth.user_id, slot_id)
        .await
        .map_err(AppError::from_usecase)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn update_profile<M, S, B>(
    State(dashboard_usecase): State<Arc<MentorDashboardUseCase<M, S, B>>>,
    auth: AuthUser,
    Json(request): Json<MentorProfileUpdateRequest>,
) -> Result<impl IntoResponse, AppError>
where
    M: MentorRepository + Send + Sync + 'static,
    S: AvailabilitySlotRepository + Send + Sync + 'static,
    B: BookingRepository + Send + Sync + 'static,
{
    let mentor = dashboard_usecase
        .update_profile(auth.user_id, request)
        .await
        .map_err(AppError::from_usecase)?;
    Ok(Json(mentor))
}

pub async fn bookings<M, S, B>(
    State(dashboard_usecase): State<Arc<MentorDashboardUseCase<M, S, B>>>,
    auth: AuthUser,
) -> Result<impl IntoResponse, AppError>
where
    M: MentorRepository + Send + Sync + 'static,
    S: AvailabilitySlotRepository + Send + Sync + 'static,
    B: BookingRepository + Send + Sync + 'static,
{
    let bookings = dashboard_usecase
        .upcoming_bookings(auth.user_id)
        .await
        .map_err(AppError::from_usecase)?;
    Ok(Json(bookings))
}
