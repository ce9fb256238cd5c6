use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, post},
};
use crates::{
    domain::{
        repositories::{
            availability_slots::AvailabilitySlotRepository, bookings::BookingRepository,
            mentors::MentorRepository, nsat_referrals::NsatReferralRepository,
            referral_codes::ReferralCodeRepository,
        },
        value_objects::{
            bookings::{ListBookingsFilter, UpdateBookingStatusRequest},
            emails::SendEmailRequest,
            mentors::{CreateMentorRequest, UpdateMentorRequest},
            nsat_referrals::{ListNsatReferralsFilter, ReviewNsatReferralRequest},
            referrals::CreateReferralCodeRequest,
        },
    },
    infra::db::repositories::{
        availability_slots::AvailabilitySlotPostgres, bookings::BookingPostgres,
        mentors::MentorPostgres, referral_codes::ReferralCodePostgres,
    },
};
use tracing::info;
use uuid::Uuid;

use super::{AppDependencies, nsat_referrals};
use crate::{
    auth::AdminUser,
    axum_http::error_responses::AppError,
    usecases::{
        admin_bookings::AdminBookingUseCase, admin_emails::AdminEmailUseCase,
        mentors::MentorUseCase, nsat_referrals::NsatReferralUseCase, referrals::ReferralUseCase,
    },
};

pub fn routes(deps: &AppDependencies) -> Router {
    let db_pool = &deps.db_pool;

    let mentor_usecase = MentorUseCase::new(
        Arc::new(MentorPostgres::new(Arc::clone(db_pool))),
        Arc::new(AvailabilitySlotPostgres::new(Arc::clone(db_pool))),
    );
    let booking_usecase = AdminBookingUseCase::new(Arc::new(BookingPostgres::new(Arc::clone(db_pool))));
    let referral_usecase =
        ReferralUseCase::new(Arc::new(ReferralCodePostgres::new(Arc::clone(db_pool))));
    let email_usecase =
        AdminEmailUseCase::new(Arc::clone(&deps.mailer), deps.config.email.site_url.clone());

    Router::new()
        .merge(nsat_router(Arc::new(nsat_referrals::usecase(deps))))
        .merge(mentors_router(Arc::new(mentor_usecase)))
        .merge(bookings_router(Arc::new(booking_usecase)))
        .merge(referral_codes_router(Arc::new(referral_usecase)))
        .merge(emails_router(Arc::new(email_usecase)))
}

// NSAT review

pub fn nsat_router<N, R>(nsat_usecase: Arc<NsatReferralUseCase<N, R>>) -> Router
where
    N: NsatReferralRepository + Send + Sync + 'static,
    R: ReferralCodeRepository + Send + Sync + 'static,
{
    Router::new()
        .route("/nsat-referrals", get(list_nsat::<N, R>))
        .route("/nsat-referrals/:referral_id/approve", post(approve_nsat::<N, R>))
        .route("/nsat-referrals/:referral_id/reject", post(reject_nsat::<N, R>))
        .with_state(nsat_usecase)
}

pub async fn list_nsat<N, R>(
    State(nsat_usecase): State<Arc<NsatReferralUseCase<N, R>>>,
    _admin: AdminUser,
    Query(filter): Query<ListNsatReferralsFilter>,
) -> Result<impl IntoResponse, AppError>
where
    N: NsatReferralRepository + Send + Sync + 'static,
    R: ReferralCodeRepository + Send + Sync + 'static,
{
    let referrals = nsat_usecase
        .list(filter.status.as_deref())
        .await
        .map_err(AppError::from_usecase)?;
    Ok(Json(referrals))
}

pub async fn approve_nsat<N, R>(
    State(nsat_usecase): State<Arc<NsatReferralUseCase<N, R>>>,
    AdminUser(admin): AdminUser,
    Path(referral_id): Path<Uuid>,
    body: Option<Json<ReviewNsatReferralRequest>>,
) -> Result<impl IntoResponse, AppError>
where
    N: NsatReferralRepository + Send + Sync + 'static,
    R: ReferralCodeRepository + Send + Sync + 'static,
{
    info!(admin_id = %admin.user_id, %referral_id, "admin: approving NSAT referral");
    let note = body.and_then(|Json(body)| body.note);
    let reviewed = nsat_usecase
        .approve(referral_id, note)
        .await
        .map_err(AppError::from_usecase)?;
    Ok(Json(reviewed))
}

pub async fn reject_nsat<N, R>(
    State(nsat_usecase): State<Arc<NsatReferralUseCase<N, R>>>,
    AdminUser(admin): AdminUser,
    Path(referral_id): Path<Uuid>,
    body: Option<Json<ReviewNsatReferralRequest>>,
) -> Result<impl IntoResponse, AppError>
where
    N: NsatReferralRepository + Send + Sync + 'static,
    R: ReferralCodeRepository + Send + Sync + 'static,
{
    info!(admin_id = %admin.user_id, %referral_id, "admin: rejecting NSAT referral");
    let note = body.and_then(|Json(body)| body.note);
    let reviewed = nsat_usecase
        .reject(referral_id, note)
        .await
        .map_err(AppError::from_usecase)?;
    Ok(Json(reviewed))
}

// Mentors

pub fn mentors_router<M, S>(mentor_usecase: Arc<MentorUseCase<M, S>>) -> Router
where
    M: MentorRepository + Send + Sync + 'static,
    S: AvailabilitySlotRepository + Send + Sync + 'static,
{
    Router::new()
        .route(
            "/mentors",
            get(list_mentors::<M, S>).post(create_mentor::<M, S>),
        )
        .route("/mentors/:mentor_id", patch(update_mentor::<M, S>))
        .with_state(mentor_usecase)
}

pub async fn list_mentors<M, S>(
    State(mentor_usecase): State<Arc<MentorUseCase<M, S>>>,
    _admin: AdminUser,
) -> Result<impl IntoResponse, AppError>
where
    M: MentorRepository + Send + Sync + 'static,
    S: AvailabilitySlotRepository + Send + Sync + 'static,
{
    let mentors = mentor_usecase
        .list_all_for_admin()
        .await
        .map_err(AppError::from_usecase)?;
    Ok(Json(mentors))
}

pub async fn create_mentor<M, S>(
    State(mentor_usecase): State<Arc<MentorUseCase<M, S>>>,
    _admin: AdminUser,
    Json(request): Json<CreateMentorRequest>,
) -> Result<impl IntoResponse, AppError>
where
    M: MentorRepository + Send + Sync + 'static,
    S: AvailabilitySlotRepository + Send + Sync + 'static,
{
    let created = mentor_usecase
        .create(request)
        .await
        .map_err(AppError::from_usecase)?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_mentor<M, S>(
    State(mentor_usecase): State<Arc<MentorUseCase<M, S>>>,
    _admin: AdminUser,
    Path(mentor_id): Path<Uuid>,
    Json(request): Json<UpdateMentorRequest>,
) -> Result<impl IntoResponse, AppError>
where
    M: MentorRepository + Send + Sync + 'static,
    S: AvailabilitySlotRepository + Send + Sync + 'static,
{
    let updated = mentor_usecase
        .update(mentor_id, request)
        .await
        .map_err(AppError::from_usecase)?;
    Ok(Json(updated))
}

// Bookings

pub fn bookings_router<B>(booking_usecase: Arc<AdminBookingUseCase<B>>) -> Router
where
    B: BookingRepository + Send + Sync + 'static,
{
    Router::new()
        .route("/bookings", get(list_bookings::<B>))
        .route("/bookings/:booking_id/status", patch(update_booking_status::<B>))
        .with_state(booking_usecase)
}

pub async fn list_bookings<B>(
    State(booking_usecase): State<Arc<AdminBookingUseCase<B>>>,
    _admin: AdminUser,
    Query(filter): Query<ListBookingsFilter>,
) -> Result<impl IntoResponse, AppError>
where
    B: BookingRepository + Send + Sync + 'static,
{
    let bookings = booking_usecase
        .list(filter.status.as_deref())
        .await
        .map_err(AppError::from_usecase)?;
    Ok(Json(bookings))
}

pub async fn update_booking_status<B>(
    State(booking_usecase): State<Arc<AdminBookingUseCase<B>>>,
    AdminUser(admin): AdminUser,
    Path(booking_id): Path<Uuid>,
    Json(request): Json<UpdateBookingStatusRequest>,
) -> Result<impl IntoResponse, AppError>
where
    B: BookingRepository + Send + Sync + 'static,
{
    info!(admin_id = %admin.user_id, %booking_id, status = %request.status, "admin: booking status change");
    let updated = booking_usecase
        .update_status(booking_id, &request.status)
        .await
        .map_err(AppError::from_usecase)?;
    Ok(Json(updated))
}

// Referral codes

pub fn referral_codes_router<R>(referral_usecase: Arc<ReferralUseCase<R>>) -> Router
where
    R: ReferralCodeRepository + Send + Sync + 'static,
{
    Router::new()
        .route("/referral-codes", post(create_referral_code::<R>))
        .with_state(referral_usecase)
}

pub async fn create_referral_code<R>(
    State(referral_usecase): State<Arc<ReferralUseCase<R>>>,
    _admin: AdminUser,
    Json(request): Json<CreateReferralCodeRequest>,
) -> Result<impl IntoResponse, AppError>
where
    R: ReferralCodeRepository + Send + Sync + 'static,
{
    let created = referral_usecase
        .create_code(request)
        .await
        .map_err(AppError::from_usecase)?;
    Ok((StatusCode::CREATED, Json(created)))
}

// Email broadcast

pub fn emails_router(email_usecase: Arc<AdminEmailUseCase>) -> Router {
    Router::new()
        .route("/send-email", post(send_email))
        .with_state(email_usecase)
}

pub async fn send_email(
    State(email_usecase): State<Arc<AdminEmailUseCase>>,
    AdminUser(admin): AdminUser,
    Json(request): Json<SendEmailRequest>,
) -> Result<impl IntoResponse, AppError> {
    info!(
        admin_id = %admin.user_id,
        template = %request.template,
        recipients = request.recipients.len(),
        "admin: email broadcast requested"
    );
    let report = email_usecase
        .send(request)
        .await
        .map_err(AppError::from_usecase)?;
    Ok(Json(report))
}
