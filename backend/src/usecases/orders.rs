use std::sync::Arc;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use crates::{
    domain::{
        repositories::{
            availability_slots::AvailabilitySlotRepository, mentors::MentorRepository,
            referral_codes::ReferralCodeRepository,
        },
        value_objects::{
            enums::session_types::SessionType,
            payments::{BookingOrderNotes, CreateOrderRequest, CreateOrderResponse},
        },
    },
    payments::razorpay_client::CreateOrderParams,
};
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::{
    gateways::PaymentGateway,
    referrals::{ReferralError, find_usable_code},
};
use crate::axum_http::error_responses::StatusCodeError;

const MIN_PRICE_RUPEES: i32 = 1;

#[derive(Debug, Error)]
pub enum OrderError {
    #[error("{0}")]
    InvalidRequest(String),
    #[error("mentor not found")]
    MentorNotFound,
    #[error("slot not found")]
    SlotNotFound,
    #[error("slot does not belong to this mentor")]
    SlotMentorMismatch,
    #[error("slot unavailable")]
    SlotUnavailable,
    #[error(transparent)]
    Referral(#[from] ReferralError),
    #[error("payment gateway error: {0}")]
    Gateway(anyhow::Error),
    #[error(transparent)]
    Internal(anyhow::Error),
}

impl StatusCodeError for OrderError {
    fn status_code(&self) -> StatusCode {
        match self {
            OrderError::InvalidRequest(_) | OrderError::SlotMentorMismatch => {
                StatusCode::BAD_REQUEST
            }
            OrderError::MentorNotFound | OrderError::SlotNotFound => StatusCode::NOT_FOUND,
            OrderError::SlotUnavailable => StatusCode::CONFLICT,
            OrderError::Referral(err) => err.status_code(),
            OrderError::Gateway(_) => StatusCode::BAD_GATEWAY,
            OrderError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Returns `(final_price, discount)` in whole rupees.
pub fn apply_discount(base_price: i32, discount_percent: i32) -> (i32, i32) {
    let percent = discount_percent.clamp(0, 100);
    let discount = (i64::from(base_price) * i64::from(percent) / 100) as i32;
    let final_price = (base_price - discount).max(MIN_PRICE_RUPEES);
    (final_price, base_price - final_price)
}

pub fn new_receipt() -> String {
    format!("cc_{}", Uuid::new_v4().simple())
}

pub struct OrderUseCase<M, S, R>
where
    M: MentorRepository + Send + Sync + 'static,
    S: AvailabilitySlotRepository + Send + Sync + 'static,
    R: ReferralCodeRepository + Send + Sync + 'static,
{
    mentor_repo: Arc<M>,
    slot_repo: Arc<S>,
    referral_repo: Arc<R>,
    gateway: Arc<dyn PaymentGateway>,
    reservation_minutes: i64,
}

impl<M, S, R> OrderUseCase<M, S, R>
where
    M: MentorRepository + Send + Sync + 'static,
    S: AvailabilitySlotRepository + Send + Sync + 'static,
    R: ReferralCodeRepository + Send + Sync + 'static,
{
    pub fn new(
        mentor_repo: Arc<M>,
        slot_repo: Arc<S>,
        referral_repo: Arc<R>,
        gateway: Arc<dyn PaymentGateway>,
        reservation_minutes: i64,
    ) -> Self {
        Self {
            mentor_repo,
            slot_repo,
            referral_repo,
            gateway,
            reservation_minutes,
        }
    }

    pub async fn create_order(
        &self,
        request: CreateOrderRequest,
    ) -> Result<CreateOrderResponse, OrderError> {
        let user_email = request.user_email.trim().to_ascii_lowercase();
        if user_email.is_empty() || !user_email.contains('@') {
            return Err(OrderError::InvalidRequest(
                "a valid user_email is required".to_string(),
            ));
        }
        let session_type = SessionType::from_str(&request.session_type).ok_or_else(|| {
            OrderError::InvalidRequest(format!("unknown session type {}", request.session_type))
        })?;

        let mentor = self
            .mentor_repo
            .find_by_id(request.mentor_id)
            .await
            .map_err(|err| {
                error!(mentor_id = %request.mentor_id, db_error = ?err, "orders: failed to load mentor");
                OrderError::Internal(err)
            })?
            .filter(|mentor| mentor.is_active)
            .ok_or(OrderError::MentorNotFound)?;

        let slot = self
            .slot_repo
            .find_by_id(request.slot_id)
            .await
            .map_err(|err| {
                error!(slot_id = %request.slot_id, db_error = ?err, "orders: failed to load slot");
                OrderError::Internal(err)
            })?
            .ok_or(OrderError::SlotNotFound)?;

        if slot.mentor_id != mentor.id {
            return Err(OrderError::SlotMentorMismatch);
        }

        let now = Utc::now();
        if slot.date < now.date_naive() || !slot.is_bookable(now) {
            info!(slot_id = %slot.id, "orders: slot not bookable");
            return Err(OrderError::SlotUnavailable);
        }

        let base_price = session_type.price_for(mentor.price);
        let (referral_code, (price, discount)) = match request
            .referral_code
            .as_deref()
            .map(str::trim)
            .filter(|code| !code.is_empty())
        {
            Some(raw_code) => {
                let referral = find_usable_code(self.referral_repo.as_ref(), raw_code).await?;
                let priced = apply_discount(base_price, referral.discount_percent);
                (Some(referral.code), priced)
            }
            None => (None, (base_price, 0)),
        };

        let receipt = new_receipt();
        let reserved_until = now + Duration::minutes(self.reservation_minutes);
        let reserved = self
            .slot_repo
            .reserve(slot.id, receipt.clone(), reserved_until, now)
            .await
            .map_err(|err| {
                error!(slot_id = %slot.id, db_error = ?err, "orders: slot reservation failed");
                OrderError::Internal(err)
            })?;
        if !reserved {
            info!(slot_id = %slot.id, "orders: slot reserved or booked concurrently");
            return Err(OrderError::SlotUnavailable);
        }

        let notes = BookingOrderNotes {
            slot_id: slot.id,
            mentor_id: mentor.id,
            session_type: session_type.to_string(),
            user_email,
            user_name: request.user_name.filter(|name| !name.trim().is_empty()),
            user_phone: request.user_phone.filter(|phone| !phone.trim().is_empty()),
            user_id: request.user_id,
            referral_code,
        };

        let params = CreateOrderParams {
            amount: i64::from(price) * 100,
            currency: "INR".to_string(),
            receipt: receipt.clone(),
            notes: notes.into_map(),
        };

        let order = match self.gateway.create_order(params).await {
            Ok(order) => order,
            Err(err) => {
                error!(
                    slot_id = %slot.id,
                    %receipt,
                    error = ?err,
                    "orders: gateway order creation failed, releasing slot"
                );
                if let Err(release_err) = self
                    .slot_repo
                    .release_reservation(slot.id, receipt.clone())
                    .await
                {
                    warn!(
                        slot_id = %slot.id,
                        db_error = ?release_err,
                        "orders: reservation release failed, it will lapse on its own"
                    );
                }
                return Err(OrderError::Gateway(err));
            }
        };

        info!(
            order_id = %order.id,
            slot_id = %slot.id,
            mentor_id = %mentor.id,
            price,
            discount,
            "orders: order created"
        );

        Ok(CreateOrderResponse {
            order_id: order.id,
            amount: order.amount,
            currency: order.currency,
            key_id: self.gateway.key_id(),
            price,
            discount,
        })
    }
}
