use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
};
use crates::{
    domain::{
        repositories::{
            availability_slots::AvailabilitySlotRepository, bookings::BookingRepository,
            invoices::InvoiceRepository, mentors::MentorRepository, payments::PaymentRepository,
            profiles::ProfileRepository, referral_codes::ReferralCodeRepository,
        },
        value_objects::payments::{CreateOrderRequest, VerifyPaymentRequest},
    },
    infra::db::repositories::{
        availability_slots::AvailabilitySlotPostgres, bookings::BookingPostgres,
        invoices::InvoicePostgres, mentors::MentorPostgres, payments::PaymentPostgres,
        profiles::ProfilePostgres, referral_codes::ReferralCodePostgres,
    },
};
use serde_json::json;
use tracing::info;

use super::AppDependencies;
use crate::{
    axum_http::error_responses::AppError,
    usecases::{
        orders::OrderUseCase,
        settlement::{SettlementUseCase, WebhookOutcome},
    },
};

const SIGNATURE_HEADER: &str = "x-razorpay-signature";

pub fn routes(deps: &AppDependencies) -> Router {
    let db_pool = &deps.db_pool;
    let mentor_repository = Arc::new(MentorPostgres::new(Arc::clone(db_pool)));
    let slot_repository = Arc::new(AvailabilitySlotPostgres::new(Arc::clone(db_pool)));
    let referral_repository = Arc::new(ReferralCodePostgres::new(Arc::clone(db_pool)));

    let order_usecase = OrderUseCase::new(
        Arc::clone(&mentor_repository),
        Arc::clone(&slot_repository),
        Arc::clone(&referral_repository),
        Arc::clone(&deps.gateway),
        deps.config.booking.slot_reservation_minutes,
    );

    let settlement_usecase = SettlementUseCase::new(
        mentor_repository,
        slot_repository,
        Arc::new(BookingPostgres::new(Arc::clone(db_pool))),
        Arc::new(PaymentPostgres::new(Arc::clone(db_pool))),
        Arc::new(InvoicePostgres::new(Arc::clone(db_pool))),
        Arc::new(ProfilePostgres::new(Arc::clone(db_pool))),
        referral_repository,
        Arc::clone(&deps.gateway),
        Arc::clone(&deps.mailer),
    );

    Router::new()
        .merge(orders_router(Arc::new(order_usecase)))
        .merge(settlement_router(Arc::new(settlement_usecase)))
}

pub fn orders_router<M, S, R>(order_usecase: Arc<OrderUseCase<M, S, R>>) -> Router
where
    M: MentorRepository + Send + Sync + 'static,
    S: AvailabilitySlotRepository + Send + Sync + 'static,
    R: ReferralCodeRepository + Send + Sync + 'static,
{
    Router::new()
        .route("/create-order", post(create_order::<M, S, R>))
        .with_state(order_usecase)
}

pub fn settlement_router<M, S, B, Pay, Inv, Prof, R>(
    settlement_usecase: Arc<SettlementUseCase<M, S, B, Pay, Inv, Prof, R>>,
) -> Router
where
    M: MentorRepository + Send + Sync + 'static,
    S: AvailabilitySlotRepository + Send + Sync + 'static,
    B: BookingRepository + Send + Sync + 'static,
    Pay: PaymentRepository + Send + Sync + 'static,
    Inv: InvoiceRepository + Send + Sync + 'static,
    Prof: ProfileRepository + Send + Sync + 'static,
    R: ReferralCodeRepository + Send + Sync + 'static,
{
    Router::new()
        .route("/verify", post(verify::<M, S, B, Pay, Inv, Prof, R>))
        .route("/webhook", post(webhook::<M, S, B, Pay, Inv, Prof, R>))
        .with_state(settlement_usecase)
}

pub async fn create_order<M, S, R>(
    State(order_usecase): State<Arc<OrderUseCase<M, S, R>>>,
    Json(request): Json<CreateOrderRequest>,
) -> Result<impl IntoResponse, AppError>
where
    M: MentorRepository + Send + Sync + 'static,
    S: AvailabilitySlotRepository + Send + Sync + 'static,
    R: ReferralCodeRepository + Send + Sync + 'static,
{
    let response = order_usecase
        .create_order(request)
        .await
        .map_err(AppError::from_usecase)?;
    Ok(Json(response))
}

pub async fn verify<M, S, B, Pay, Inv, Prof, R>(
    State(settlement_usecase): State<Arc<SettlementUseCase<M, S, B, Pay, Inv, Prof, R>>>,
    Json(request): Json<VerifyPaymentRequest>,
) -> Result<impl IntoResponse, AppError>
where
    M: MentorRepository + Send + Sync + 'static,
    S: AvailabilitySlotRepository + Send + Sync + 'static,
    B: BookingRepository + Send + Sync + 'static,
    Pay: PaymentRepository + Send + Sync + 'static,
    Inv: InvoiceRepository + Send + Sync + 'static,
    Prof: ProfileRepository + Send + Sync + 'static,
    R: ReferralCodeRepository + Send + Sync + 'static,
{
    let response = settlement_usecase
        .verify_and_settle(request)
        .await
        .map_err(AppError::from_usecase)?;
    Ok(Json(response))
}

/// Raw body is required: the signature covers the exact bytes Razorpay sent.
pub async fn webhook<M, S, B, Pay, Inv, Prof, R>(
    State(settlement_usecase): State<Arc<SettlementUseCase<M, S, B, Pay, Inv, Prof, R>>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, AppError>
where
    M: MentorRepository + Send + Sync + 'static,
    S: AvailabilitySlotRepository + Send + Sync + 'static,
    B: BookingRepository + Send + Sync + 'static,
    Pay: PaymentRepository + Send + Sync + 'static,
    Inv: InvoiceRepository + Send + Sync + 'static,
    Prof: ProfileRepository + Send + Sync + 'static,
    R: ReferralCodeRepository + Send + Sync + 'static,
{
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());

    let outcome = settlement_usecase
        .handle_webhook(&body, signature)
        .await
        .map_err(AppError::from_usecase)?;

    let body = match outcome {
        WebhookOutcome::Settled {
            booking_id,
            duplicate,
        } => json!({"status": "ok", "bookingId": booking_id, "duplicate": duplicate}),
        WebhookOutcome::Ignored { reason } => {
            info!(%reason, "payments: webhook acknowledged without settlement");
            json!({"status": "ignored", "reason": reason})
        }
    };

    Ok((StatusCode::OK, Json(body)))
}
