use std::sync::Arc;

use axum::http::StatusCode;
use chrono::{Datelike, Utc};
use crates::{
    domain::{
        entities::{
            availability_slots::AvailabilitySlotEntity,
            bookings::{BookingEntity, InsertBookingEntity},
            mentors::MentorEntity,
            payments::{PaymentEntity, UpsertPaymentEntity},
            referral_codes::InsertReferralUseEntity,
        },
        repositories::{
            availability_slots::AvailabilitySlotRepository, bookings::BookingRepository,
            invoices::InvoiceRepository, mentors::MentorRepository, payments::PaymentRepository,
            profiles::ProfileRepository, referral_codes::ReferralCodeRepository,
        },
        value_objects::{
            bookings::BookingInsertOutcome,
            enums::{
                booking_statuses::BookingStatus, payment_statuses::PaymentStatus,
                session_types::SessionType,
            },
            payments::{
                BookingOrderNotes, PaymentMethodDetails, VerifyPaymentRequest,
                VerifyPaymentResponse,
            },
            referrals::normalize_code,
        },
    },
    email::templates::{self, ReceiptDetails},
    payments::razorpay_client::{RazorpayClient, RazorpayPayment},
};
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::{
    gateways::{Mailer, PaymentGateway},
    notifications::{send_best_effort, session_details},
};
use crate::axum_http::error_responses::StatusCodeError;

const CURRENCY_INR: &str = "INR";

#[derive(Debug, Error)]
pub enum SettlementError {
    #[error("missing required payment fields: {0}")]
    MissingPaymentFields(String),
    #[error("invalid payment signature")]
    InvalidSignature,
    #[error("missing booking details: {0}")]
    MissingBookingDetails(String),
    #[error("booking details do not match the paid order: {0}")]
    BookingMismatch(String),
    #[error("invalid session type: {0}")]
    InvalidSessionType(String),
    #[error("mentor not found")]
    MentorNotFound,
    #[error("slot not found")]
    SlotNotFound,
    #[error("slot does not belong to this mentor")]
    SlotMentorMismatch,
    #[error("slot already booked")]
    SlotTaken,
    #[error("invalid webhook payload: {0}")]
    InvalidWebhook(String),
    #[error("payment gateway error: {0}")]
    Gateway(anyhow::Error),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl StatusCodeError for SettlementError {
    fn status_code(&self) -> StatusCode {
        match self {
            SettlementError::MissingPaymentFields(_)
            | SettlementError::InvalidSignature
            | SettlementError::MissingBookingDetails(_)
            | SettlementError::BookingMismatch(_)
            | SettlementError::InvalidSessionType(_)
            | SettlementError::SlotMentorMismatch
            | SettlementError::InvalidWebhook(_) => StatusCode::BAD_REQUEST,
            SettlementError::MentorNotFound | SettlementError::SlotNotFound => {
                StatusCode::NOT_FOUND
            }
            SettlementError::SlotTaken => StatusCode::CONFLICT,
            SettlementError::Gateway(_) => StatusCode::BAD_GATEWAY,
            SettlementError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type SettlementResult<T> = std::result::Result<T, SettlementError>;

#[derive(Debug, Clone, PartialEq)]
pub enum WebhookOutcome {
    Settled { booking_id: Uuid, duplicate: bool },
    Ignored { reason: String },
}

/// Everything needed to turn a verified payment into a booking. Booking
/// fields come from the notes written at order creation.
#[derive(Debug, Clone)]
struct SettlementContext {
    order_id: String,
    payment_id: String,
    signature: Option<String>,
    amount: i64,
    slot_id: Uuid,
    mentor_id: Uuid,
    session_type: SessionType,
    user_id: Option<Uuid>,
    user_name: String,
    user_email: String,
    user_phone: Option<String>,
    referral_code: Option<String>,
}

/// Caller-supplied values used only where the order notes are silent.
#[derive(Debug, Default)]
struct ContactFallback {
    user_name: Option<String>,
    user_phone: Option<String>,
}

impl SettlementContext {
    fn from_notes(
        order_id: String,
        payment_id: String,
        signature: Option<String>,
        amount: i64,
        notes: BookingOrderNotes,
        fallback: ContactFallback,
    ) -> SettlementResult<Self> {
        let session_type = SessionType::from_str(&notes.session_type)
            .ok_or_else(|| SettlementError::InvalidSessionType(notes.session_type.clone()))?;
        let user_name = notes
            .user_name
            .or_else(|| non_blank(fallback.user_name))
            .unwrap_or_else(|| notes.user_email.clone());
        let user_phone = notes
            .user_phone
            .or_else(|| non_blank(fallback.user_phone));

        Ok(Self {
            order_id,
            payment_id,
            signature,
            amount,
            slot_id: notes.slot_id,
            mentor_id: notes.mentor_id,
            session_type,
            user_id: notes.user_id,
            user_name,
            user_email: notes.user_email,
            user_phone,
            referral_code: notes.referral_code,
        })
    }
}

/// Names every booking field where the checkout body disagrees with the order.
fn mismatched_fields(request: &VerifyPaymentRequest, notes: &BookingOrderNotes) -> Vec<&'static str> {
    let mut mismatched = Vec::new();
    if request.slot_id.is_some_and(|slot_id| slot_id != notes.slot_id) {
        mismatched.push("slot_id");
    }
    if request
        .mentor_id
        .is_some_and(|mentor_id| mentor_id != notes.mentor_id)
    {
        mismatched.push("mentor_id");
    }
    if let Some(session_type) = non_blank(request.session_type.clone()) {
        if SessionType::from_str(&session_type) != SessionType::from_str(&notes.session_type) {
            mismatched.push("session_type");
        }
    }
    mismatched
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Invoice ids look like `CC-2025-000042`.
pub fn format_invoice_id(year: i32, sequence: i64) -> String {
    format!("CC-{year}-{sequence:06}")
}

fn fallback_invoice_id(millis: i64) -> String {
    format!("CC-{millis}")
}

pub struct SettlementUseCase<M, S, B, Pay, Inv, Prof, R>
where
    M: MentorRepository + Send + Sync + 'static,
    S: AvailabilitySlotRepository + Send + Sync + 'static,
    B: BookingRepository + Send + Sync + 'static,
    Pay: PaymentRepository + Send + Sync + 'static,
    Inv: InvoiceRepository + Send + Sync + 'static,
    Prof: ProfileRepository + Send + Sync + 'static,
    R: ReferralCodeRepository + Send + Sync + 'static,
{
    mentor_repo: Arc<M>,
    slot_repo: Arc<S>,
    booking_repo: Arc<B>,
    payment_repo: Arc<Pay>,
    invoice_repo: Arc<Inv>,
    profile_repo: Arc<Prof>,
    referral_repo: Arc<R>,
    gateway: Arc<dyn PaymentGateway>,
    mailer: Arc<dyn Mailer>,
}

impl<M, S, B, Pay, Inv, Prof, R> SettlementUseCase<M, S, B, Pay, Inv, Prof, R>
where
    M: MentorRepository + Send + Sync + 'static,
    S: AvailabilitySlotRepository + Send + Sync + 'static,
    B: BookingRepository + Send + Sync + 'static,
    Pay: PaymentRepository + Send + Sync + 'static,
    Inv: InvoiceRepository + Send + Sync + 'static,
    Prof: ProfileRepository + Send + Sync + 'static,
    R: ReferralCodeRepository + Send + Sync + 'static,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        mentor_repo: Arc<M>,
        slot_repo: Arc<S>,
        booking_repo: Arc<B>,
        payment_repo: Arc<Pay>,
        invoice_repo: Arc<Inv>,
        profile_repo: Arc<Prof>,
        referral_repo: Arc<R>,
        gateway: Arc<dyn PaymentGateway>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self {
            mentor_repo,
            slot_repo,
            booking_repo,
            payment_repo,
            invoice_repo,
            profile_repo,
            referral_repo,
            gateway,
            mailer,
        }
    }

    /// Checkout callback. The signature only covers `order_id|payment_id`, so
    /// the booking is taken from the order's own notes and the body must agree.
    pub async fn verify_and_settle(
        &self,
        request: VerifyPaymentRequest,
    ) -> SettlementResult<VerifyPaymentResponse> {
        let order_id = non_blank(request.razorpay_order_id.clone());
        let payment_id = non_blank(request.razorpay_payment_id.clone());
        let signature = non_blank(request.razorpay_signature.clone());

        let (order_id, payment_id, signature) = match (order_id, payment_id, signature) {
            (Some(order_id), Some(payment_id), Some(signature)) => {
                (order_id, payment_id, signature)
            }
            (order_id, payment_id, signature) => {
                let missing = [
                    ("razorpay_order_id", order_id.is_none()),
                    ("razorpay_payment_id", payment_id.is_none()),
                    ("razorpay_signature", signature.is_none()),
                ]
                .into_iter()
                .filter_map(|(name, is_missing)| is_missing.then_some(name))
                .collect::<Vec<_>>()
                .join(", ");
                warn!(%missing, "settlement: rejected verification with missing fields");
                return Err(SettlementError::MissingPaymentFields(missing));
            }
        };

        if !self
            .gateway
            .verify_payment_signature(&order_id, &payment_id, &signature)
        {
            warn!(%order_id, %payment_id, "settlement: payment signature mismatch");
            return Err(SettlementError::InvalidSignature);
        }

        info!(%order_id, %payment_id, "settlement: payment signature verified");

        let order = self.gateway.fetch_order(&order_id).await.map_err(|err| {
            error!(%order_id, error = ?err, "settlement: order fetch failed");
            SettlementError::Gateway(err)
        })?;

        let Some(notes) = BookingOrderNotes::from_map(&order.notes) else {
            warn!(%order_id, "settlement: paid order carries no booking notes");
            return Err(SettlementError::MissingBookingDetails(
                "order carries no booking notes".to_string(),
            ));
        };

        let mismatched = mismatched_fields(&request, &notes);
        if !mismatched.is_empty() {
            let fields = mismatched.join(", ");
            warn!(
                %order_id,
                %fields,
                order_slot_id = %notes.slot_id,
                "settlement: checkout body disagrees with order notes"
            );
            return Err(SettlementError::BookingMismatch(fields));
        }

        let body_referral = non_blank(request.referral_code.clone()).map(|code| normalize_code(&code));
        let notes_referral = notes.referral_code.as_deref().map(normalize_code);
        if body_referral.is_some() && body_referral != notes_referral {
            warn!(%order_id, "settlement: ignoring referral code absent from the order");
        }

        let context = SettlementContext::from_notes(
            order_id,
            payment_id,
            Some(signature),
            order.amount,
            notes,
            ContactFallback {
                user_name: request.user_name,
                user_phone: request.user_phone,
            },
        )?;
        let gateway_payment = self.fetch_payment_best_effort(&context.payment_id).await;

        self.settle(context, gateway_payment).await
    }

    /// Razorpay webhook: the same settlement, keyed by the order notes.
    pub async fn handle_webhook(
        &self,
        payload: &[u8],
        signature: Option<&str>,
    ) -> SettlementResult<WebhookOutcome> {
        let Some(signature) = signature.map(str::trim).filter(|s| !s.is_empty()) else {
            warn!("settlement: webhook without signature header");
            return Err(SettlementError::InvalidSignature);
        };

        if !self.gateway.verify_webhook_signature(payload, signature) {
            warn!("settlement: webhook signature mismatch");
            return Err(SettlementError::InvalidSignature);
        }

        let event = RazorpayClient::parse_webhook_event(payload).map_err(|err| {
            warn!(error = %err, "settlement: unreadable webhook body");
            SettlementError::InvalidWebhook(err.to_string())
        })?;

        info!(event = %event.event, "settlement: webhook received");

        let (notes, amount, payment) = match event.event.as_str() {
            "order.paid" => {
                let order = event.payload.order.map(|wrapper| wrapper.entity);
                let payment = event.payload.payment.map(|wrapper| wrapper.entity);
                match (order, payment) {
                    (Some(order), Some(payment)) => (order.notes, order.amount, payment),
                    _ => {
                        return Err(SettlementError::InvalidWebhook(
                            "order.paid without order and payment entities".to_string(),
                        ));
                    }
                }
            }
            "payment.captured" => match event.payload.payment.map(|wrapper| wrapper.entity) {
                Some(payment) => (payment.notes.clone(), payment.amount, payment),
                None => {
                    return Err(SettlementError::InvalidWebhook(
                        "payment.captured without payment entity".to_string(),
                    ));
                }
            },
            other => {
                info!(event = %other, "settlement: webhook event ignored");
                return Ok(WebhookOutcome::Ignored {
                    reason: format!("unhandled event {other}"),
                });
            }
        };

        let Some(order_id) = payment.order_id.clone().filter(|id| !id.is_empty()) else {
            return Ok(WebhookOutcome::Ignored {
                reason: "payment is not attached to an order".to_string(),
            });
        };

        let Some(booking_notes) = BookingOrderNotes::from_map(&notes) else {
            info!(%order_id, "settlement: webhook order carries no booking notes");
            return Ok(WebhookOutcome::Ignored {
                reason: "order carries no booking notes".to_string(),
            });
        };

        let context = match SettlementContext::from_notes(
            order_id.clone(),
            payment.id.clone(),
            None,
            amount,
            booking_notes,
            ContactFallback {
                user_name: None,
                user_phone: payment.contact.clone(),
            },
        ) {
            Ok(context) => context,
            Err(err) => {
                let reason = err.to_string();
                warn!(%order_id, %reason, "settlement: webhook notes rejected");
                return Ok(WebhookOutcome::Ignored { reason });
            }
        };

        // The fetched copy carries card details that webhook payloads omit.
        let gateway_payment = match self.fetch_payment_best_effort(&payment.id).await {
            Some(fetched) => Some(fetched),
            None => Some(payment),
        };

        match self.settle(context, gateway_payment).await {
            Ok(response) => Ok(WebhookOutcome::Settled {
                booking_id: response.booking.id,
                duplicate: response.duplicate,
            }),
            Err(SettlementError::SlotTaken) => {
                error!(%order_id, "settlement: webhook paid for a slot booked by another order");
                Ok(WebhookOutcome::Ignored {
                    reason: "slot already booked".to_string(),
                })
            }
            Err(err) => Err(err),
        }
    }

    async fn fetch_payment_best_effort(&self, payment_id: &str) -> Option<RazorpayPayment> {
        match self.gateway.fetch_payment(payment_id).await {
            Ok(payment) => Some(payment),
            Err(err) => {
                warn!(
                    %payment_id,
                    error = ?err,
                    "settlement: payment fetch failed, continuing without method details"
                );
                None
            }
        }
    }

    async fn next_invoice_id(&self) -> String {
        let now = Utc::now();
        match self.invoice_repo.next_invoice_number().await {
            Ok(sequence) => format_invoice_id(now.year(), sequence),
            Err(err) => {
                let fallback = fallback_invoice_id(now.timestamp_millis());
                warn!(
                    db_error = ?err,
                    invoice_id = %fallback,
                    "settlement: invoice sequence failed, using timestamp id"
                );
                fallback
            }
        }
    }

    /// The stored invoice id when this order already has a payment row,
    /// otherwise a fresh one from the sequence.
    async fn invoice_id_for_retry(&self, order_id: &str) -> String {
        match self.existing_invoice_id(order_id).await {
            Some(invoice_id) => invoice_id,
            None => self.next_invoice_id().await,
        }
    }

    async fn settle(
        &self,
        context: SettlementContext,
        gateway_payment: Option<RazorpayPayment>,
    ) -> SettlementResult<VerifyPaymentResponse> {
        let order_id = context.order_id.clone();

        let method = gateway_payment
            .as_ref()
            .map(RazorpayPayment::method_details)
            .unwrap_or_else(PaymentMethodDetails::fallback);

        let mentor = self.load_mentor(context.mentor_id).await?;
        let slot = self.load_slot(context.slot_id).await?;
        if slot.mentor_id != mentor.id {
            warn!(
                %order_id,
                slot_id = %slot.id,
                mentor_id = %mentor.id,
                "settlement: slot belongs to a different mentor"
            );
            return Err(SettlementError::SlotMentorMismatch);
        }

        let session_price = Some(context.amount / 100)
            .filter(|rupees| *rupees > 0)
            .and_then(|rupees| i32::try_from(rupees).ok())
            .unwrap_or_else(|| context.session_type.price_for(mentor.price));

        let now = Utc::now();
        let insert = InsertBookingEntity {
            mentor_id: mentor.id,
            slot_id: Some(slot.id),
            user_id: context.user_id,
            user_name: context.user_name.clone(),
            user_email: context.user_email.clone(),
            user_phone: context.user_phone.clone(),
            session_type: context.session_type.to_string(),
            session_price,
            date: slot.date,
            start_time: slot.start_time,
            end_time: slot.end_time,
            status: BookingStatus::Confirmed.to_string(),
            meet_link: mentor.meet_link.clone(),
            razorpay_order_id: order_id.clone(),
            confirmed_at: Some(now),
        };

        let outcome = self
            .booking_repo
            .create_and_claim_slot(insert)
            .await
            .map_err(|err| {
                error!(%order_id, db_error = ?err, "settlement: booking insert failed");
                SettlementError::Internal(err)
            })?;

        let (booking, duplicate, invoice_id) = match outcome {
            BookingInsertOutcome::Created(booking) => {
                info!(
                    %order_id,
                    booking_id = %booking.id,
                    slot_id = %slot.id,
                    "settlement: booking created and slot claimed"
                );
                (booking, false, self.next_invoice_id().await)
            }
            BookingInsertOutcome::DuplicateOrder => {
                let existing = self
                    .booking_repo
                    .find_by_order_id(order_id.clone())
                    .await
                    .map_err(|err| {
                        error!(%order_id, db_error = ?err, "settlement: duplicate re-read failed");
                        SettlementError::Internal(err)
                    })?
                    .ok_or_else(|| {
                        error!(%order_id, "settlement: duplicate order but no booking to re-read");
                        SettlementError::Internal(anyhow::anyhow!(
                            "booking for order {order_id} vanished after unique violation"
                        ))
                    })?;
                info!(
                    %order_id,
                    booking_id = %existing.id,
                    "settlement: duplicate verification resolved to existing booking"
                );
                (existing, true, self.invoice_id_for_retry(&order_id).await)
            }
            BookingInsertOutcome::SlotTaken => {
                error!(
                    %order_id,
                    slot_id = %slot.id,
                    "settlement: slot already booked by another order, payment needs refund"
                );
                let invoice_id = self.invoice_id_for_retry(&order_id).await;
                self.upsert_payment(&context, None, &invoice_id, &method, gateway_payment.as_ref())
                    .await?;
                return Err(SettlementError::SlotTaken);
            }
        };

        let saved = self
            .upsert_payment(
                &context,
                Some(booking.id),
                &invoice_id,
                &method,
                gateway_payment.as_ref(),
            )
            .await?;

        if !duplicate {
            self.after_new_booking(&context, &booking, &mentor, &saved, &method)
                .await;
        }

        let meet_link = booking.meet_link.clone();
        Ok(VerifyPaymentResponse {
            success: true,
            message: if duplicate {
                "Booking already confirmed".to_string()
            } else {
                "Payment verified and booking confirmed".to_string()
            },
            booking: booking.into(),
            meet_link,
            invoice_id: saved.invoice_id,
            duplicate,
        })
    }

    async fn load_mentor(&self, mentor_id: Uuid) -> SettlementResult<MentorEntity> {
        self.mentor_repo
            .find_by_id(mentor_id)
            .await
            .map_err(|err| {
                error!(%mentor_id, db_error = ?err, "settlement: failed to load mentor");
                SettlementError::Internal(err)
            })?
            .ok_or_else(|| {
                warn!(%mentor_id, "settlement: mentor not found");
                SettlementError::MentorNotFound
            })
    }

    async fn load_slot(&self, slot_id: Uuid) -> SettlementResult<AvailabilitySlotEntity> {
        self.slot_repo
            .find_by_id(slot_id)
            .await
            .map_err(|err| {
                error!(%slot_id, db_error = ?err, "settlement: failed to load slot");
                SettlementError::Internal(err)
            })?
            .ok_or_else(|| {
                warn!(%slot_id, "settlement: slot not found");
                SettlementError::SlotNotFound
            })
    }

    async fn existing_invoice_id(&self, order_id: &str) -> Option<String> {
        match self.payment_repo.find_by_order_id(order_id.to_string()).await {
            Ok(payment) => payment.map(|p| p.invoice_id),
            Err(err) => {
                warn!(%order_id, db_error = ?err, "settlement: could not read existing invoice id");
                None
            }
        }
    }

    /// Returns the row as stored, whose invoice id wins over `invoice_id`
    /// when the order was already recorded.
    async fn upsert_payment(
        &self,
        context: &SettlementContext,
        booking_id: Option<Uuid>,
        invoice_id: &str,
        method: &PaymentMethodDetails,
        gateway_payment: Option<&RazorpayPayment>,
    ) -> SettlementResult<PaymentEntity> {
        let status = gateway_payment
            .and_then(|payment| PaymentStatus::from_str(&payment.status))
            .unwrap_or(PaymentStatus::Captured);

        let payment = UpsertPaymentEntity {
            booking_id,
            razorpay_order_id: context.order_id.clone(),
            razorpay_payment_id: context.payment_id.clone(),
            razorpay_signature: context.signature.clone(),
            amount: gateway_payment
                .map(|payment| payment.amount)
                .unwrap_or(context.amount),
            currency: gateway_payment
                .map(|payment| payment.currency.clone())
                .unwrap_or_else(|| CURRENCY_INR.to_string()),
            status: status.to_string(),
            invoice_id: invoice_id.to_string(),
            payment_method: method.method.clone(),
            card_network: method.card_network.clone(),
            card_last4: method.card_last4.clone(),
            bank: method.bank.clone(),
            wallet: method.wallet.clone(),
            vpa: method.vpa.clone(),
            fee: method.fee,
            tax: method.tax,
            updated_at: Utc::now(),
        };

        let saved = self
            .payment_repo
            .upsert_by_order_id(payment)
            .await
            .map_err(|err| {
                error!(
                    order_id = %context.order_id,
                    db_error = ?err,
                    "settlement: payment upsert failed"
                );
                SettlementError::Internal(err)
            })?;

        info!(
            order_id = %context.order_id,
            payment_row_id = %saved.id,
            invoice_id = %saved.invoice_id,
            booking_id = ?booking_id,
            "settlement: payment row upserted"
        );
        Ok(saved)
    }

    async fn after_new_booking(
        &self,
        context: &SettlementContext,
        booking: &BookingEntity,
        mentor: &MentorEntity,
        payment: &PaymentEntity,
        method: &PaymentMethodDetails,
    ) {
        if let Some(phone) = context.user_phone.clone() {
            if let Err(err) = self
                .profile_repo
                .update_phone(context.user_id, context.user_email.clone(), phone)
                .await
            {
                warn!(
                    booking_id = %booking.id,
                    db_error = ?err,
                    "settlement: profile phone update failed"
                );
            }
        }

        if let Some(code) = context.referral_code.as_deref() {
            self.record_referral_best_effort(code, context).await;
        }

        let details = session_details(booking, mentor);
        let mailer = self.mailer.as_ref();

        send_best_effort(
            mailer,
            &booking.user_email,
            templates::booking_confirmation(&details),
            "booking_confirmation",
        )
        .await;

        send_best_effort(
            mailer,
            &mentor.email,
            templates::mentor_notification(&details),
            "mentor_notification",
        )
        .await;

        let receipt = ReceiptDetails {
            user_name: booking.user_name.clone(),
            invoice_id: payment.invoice_id.clone(),
            order_id: context.order_id.clone(),
            payment_id: context.payment_id.clone(),
            amount: payment.amount,
            payment_method: method.describe(),
            paid_at: booking.confirmed_at.unwrap_or(booking.created_at),
            mentor_name: mentor.name.clone(),
            session_label: details.session_label.clone(),
        };

        send_best_effort(
            mailer,
            &booking.user_email,
            templates::payment_receipt(&receipt),
            "payment_receipt",
        )
        .await;
    }

    async fn record_referral_best_effort(&self, raw_code: &str, context: &SettlementContext) {
        let code = normalize_code(raw_code);
        let referral = match self.referral_repo.find_by_code(code.clone()).await {
            Ok(Some(referral)) => referral,
            Ok(None) => {
                warn!(%code, order_id = %context.order_id, "settlement: referral code not found");
                return;
            }
            Err(err) => {
                warn!(%code, db_error = ?err, "settlement: referral lookup failed");
                return;
            }
        };

        if let Some(reason) = referral.rejection_reason(Utc::now()) {
            warn!(
                %code,
                order_id = %context.order_id,
                %reason,
                "settlement: referral use not recorded"
            );
            return;
        }

        let referral_use = InsertReferralUseEntity {
            referral_code_id: referral.id,
            code: referral.code,
            user_email: context.user_email.clone(),
            razorpay_order_id: context.order_id.clone(),
        };

        match self.referral_repo.record_use(referral_use).await {
            Ok(outcome) => {
                info!(%code, order_id = %context.order_id, ?outcome, "settlement: referral use recorded")
            }
            Err(err) => warn!(%code, db_error = ?err, "settlement: referral use not recorded"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use chrono::{NaiveDate, NaiveTime};
    use crates::domain::{
        entities::referral_codes::ReferralCodeEntity,
        repositories::{
            availability_slots::MockAvailabilitySlotRepository, bookings::MockBookingRepository,
            invoices::MockInvoiceRepository, mentors::MockMentorRepository,
            payments::MockPaymentRepository, profiles::MockProfileRepository,
            referral_codes::MockReferralCodeRepository,
        },
        value_objects::referrals::ReferralUseOutcome,
    };
    use crates::payments::razorpay_client::{RazorpayCard, RazorpayOrder};
    use mockall::predicate::eq;

    use super::super::gateways::{MockMailer, MockPaymentGateway};
    use super::*;

    const ORDER_ID: &str = "order_abc";
    const PAYMENT_ID: &str = "pay_123";

    type MockedSettlement = SettlementUseCase<
        MockMentorRepository,
        MockAvailabilitySlotRepository,
        MockBookingRepository,
        MockPaymentRepository,
        MockInvoiceRepository,
        MockProfileRepository,
        MockReferralCodeRepository,
    >;

    struct Mocks {
        mentors: MockMentorRepository,
        slots: MockAvailabilitySlotRepository,
        bookings: MockBookingRepository,
        payments: MockPaymentRepository,
        invoices: MockInvoiceRepository,
        profiles: MockProfileRepository,
        referrals: MockReferralCodeRepository,
        gateway: MockPaymentGateway,
        mailer: MockMailer,
    }

    impl Mocks {
        fn new() -> Self {
            Self {
                mentors: MockMentorRepository::new(),
                slots: MockAvailabilitySlotRepository::new(),
                bookings: MockBookingRepository::new(),
                payments: MockPaymentRepository::new(),
                invoices: MockInvoiceRepository::new(),
                profiles: MockProfileRepository::new(),
                referrals: MockReferralCodeRepository::new(),
                gateway: MockPaymentGateway::new(),
                mailer: MockMailer::new(),
            }
        }

        fn into_usecase(self) -> MockedSettlement {
            SettlementUseCase::new(
                Arc::new(self.mentors),
                Arc::new(self.slots),
                Arc::new(self.bookings),
                Arc::new(self.payments),
                Arc::new(self.invoices),
                Arc::new(self.profiles),
                Arc::new(self.referrals),
                Arc::new(self.gateway),
                Arc::new(self.mailer),
            )
        }
    }

    fn sample_mentor(mentor_id: Uuid) -> MentorEntity {
        let now = Utc::now();
        MentorEntity {
            id: mentor_id,
            user_id: None,
            name: "Rohan".to_string(),
            email: "rohan@college.edu".to_string(),
            role: Some("B.Tech CSE".to_string()),
            college: "IIT Bombay".to_string(),
            price: 499,
            bio: None,
            expertise: vec!["JEE".to_string()],
            meet_link: Some("https://meet.google.com/abc-defg-hij".to_string()),
            image_url: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn sample_slot(slot_id: Uuid, mentor_id: Uuid) -> AvailabilitySlotEntity {
        AvailabilitySlotEntity {
            id: slot_id,
            mentor_id,
            date: NaiveDate::from_ymd_opt(2030, 1, 15).unwrap(),
            start_time: NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(17, 30, 0).unwrap(),
            is_booked: false,
            is_reserved: true,
            reserved_by: Some("rcpt_1".to_string()),
            reserved_until: None,
            created_at: Utc::now(),
        }
    }

    fn booking_from(insert: &InsertBookingEntity) -> BookingEntity {
        let now = Utc::now();
        BookingEntity {
            id: Uuid::new_v4(),
            mentor_id: insert.mentor_id,
            slot_id: insert.slot_id,
            user_id: insert.user_id,
            user_name: insert.user_name.clone(),
            user_email: insert.user_email.clone(),
            user_phone: insert.user_phone.clone(),
            session_type: insert.session_type.clone(),
            session_price: insert.session_price,
            date: insert.date,
            start_time: insert.start_time,
            end_time: insert.end_time,
            status: insert.status.clone(),
            meet_link: insert.meet_link.clone(),
            razorpay_order_id: insert.razorpay_order_id.clone(),
            confirmed_at: insert.confirmed_at,
            created_at: now,
            updated_at: now,
        }
    }

    fn payment_from(upsert: &UpsertPaymentEntity) -> PaymentEntity {
        PaymentEntity {
            id: Uuid::new_v4(),
            booking_id: upsert.booking_id,
            razorpay_order_id: upsert.razorpay_order_id.clone(),
            razorpay_payment_id: upsert.razorpay_payment_id.clone(),
            razorpay_signature: upsert.razorpay_signature.clone(),
            amount: upsert.amount,
            currency: upsert.currency.clone(),
            status: upsert.status.clone(),
            invoice_id: upsert.invoice_id.clone(),
            payment_method: upsert.payment_method.clone(),
            card_network: upsert.card_network.clone(),
            card_last4: upsert.card_last4.clone(),
            bank: upsert.bank.clone(),
            wallet: upsert.wallet.clone(),
            vpa: upsert.vpa.clone(),
            fee: upsert.fee,
            tax: upsert.tax,
            created_at: upsert.updated_at,
            updated_at: upsert.updated_at,
        }
    }

    fn stored_payment(order_id: String, invoice_id: &str) -> PaymentEntity {
        payment_from(&UpsertPaymentEntity {
            booking_id: Some(Uuid::new_v4()),
            razorpay_order_id: order_id,
            razorpay_payment_id: PAYMENT_ID.to_string(),
            razorpay_signature: None,
            amount: 49_900,
            currency: "INR".to_string(),
            status: "captured".to_string(),
            invoice_id: invoice_id.to_string(),
            payment_method: "card".to_string(),
            card_network: None,
            card_last4: None,
            bank: None,
            wallet: None,
            vpa: None,
            fee: None,
            tax: None,
            updated_at: Utc::now(),
        })
    }

    fn card_payment() -> RazorpayPayment {
        RazorpayPayment {
            id: PAYMENT_ID.to_string(),
            order_id: Some(ORDER_ID.to_string()),
            amount: 49_900,
            currency: "INR".to_string(),
            status: "captured".to_string(),
            method: Some("card".to_string()),
            card: Some(RazorpayCard {
                network: Some("Visa".to_string()),
                last4: Some("1111".to_string()),
            }),
            bank: None,
            wallet: None,
            vpa: None,
            email: None,
            contact: None,
            fee: Some(1178),
            tax: Some(180),
            notes: HashMap::new(),
        }
    }

    fn order_notes(slot_id: Uuid, mentor_id: Uuid) -> BookingOrderNotes {
        BookingOrderNotes {
            slot_id,
            mentor_id,
            session_type: "standard".to_string(),
            user_email: "asha@example.com".to_string(),
            user_name: Some("Asha".to_string()),
            user_phone: None,
            user_id: None,
            referral_code: None,
        }
    }

    fn paid_order(notes: BookingOrderNotes, amount: i64) -> RazorpayOrder {
        RazorpayOrder {
            id: ORDER_ID.to_string(),
            amount,
            currency: "INR".to_string(),
            receipt: Some("cc_receipt".to_string()),
            status: Some("paid".to_string()),
            notes: notes.into_map(),
        }
    }

    fn verify_request(slot_id: Uuid, mentor_id: Uuid) -> VerifyPaymentRequest {
        VerifyPaymentRequest {
            razorpay_order_id: Some(ORDER_ID.to_string()),
            razorpay_payment_id: Some(PAYMENT_ID.to_string()),
            razorpay_signature: Some("deadbeef".to_string()),
            slot_id: Some(slot_id),
            mentor_id: Some(mentor_id),
            session_type: Some("standard".to_string()),
            user_id: None,
            user_name: Some("Asha".to_string()),
            user_email: Some("asha@example.com".to_string()),
            user_phone: Some("+919800000000".to_string()),
            selected_date: Some("2030-01-15".to_string()),
            selected_time: Some("17:00".to_string()),
            referral_code: None,
        }
    }

    /// Wires the happy path up to the booking insert for an order carrying `notes`.
    fn expect_lookups_for(mocks: &mut Mocks, notes: BookingOrderNotes) {
        let slot_id = notes.slot_id;
        let mentor_id = notes.mentor_id;
        let order = paid_order(notes, 49_900);
        mocks
            .gateway
            .expect_verify_payment_signature()
            .returning(|_, _, _| true);
        mocks
            .gateway
            .expect_fetch_order()
            .times(1)
            .returning(move |_| Ok(order.clone()));
        mocks
            .mentors
            .expect_find_by_id()
            .with(eq(mentor_id))
            .returning(|id| Ok(Some(sample_mentor(id))));
        mocks
            .slots
            .expect_find_by_id()
            .with(eq(slot_id))
            .returning(move |id| Ok(Some(sample_slot(id, mentor_id))));
    }

    fn expect_lookups(mocks: &mut Mocks, slot_id: Uuid, mentor_id: Uuid) {
        expect_lookups_for(mocks, order_notes(slot_id, mentor_id));
    }

    #[tokio::test]
    async fn missing_gateway_fields_are_rejected_before_any_io() {
        for field in ["order", "payment", "signature"] {
            let mocks = Mocks::new();
            let usecase = mocks.into_usecase();

            let mut request = verify_request(Uuid::new_v4(), Uuid::new_v4());
            match field {
                "order" => request.razorpay_order_id = None,
                "payment" => request.razorpay_payment_id = Some("  ".to_string()),
                _ => request.razorpay_signature = None,
            }

            let err = usecase.verify_and_settle(request).await.unwrap_err();
            assert!(matches!(err, SettlementError::MissingPaymentFields(_)));
            assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        }
    }

    #[tokio::test]
    async fn signature_mismatch_is_rejected_without_writes() {
        let mut mocks = Mocks::new();
        mocks
            .gateway
            .expect_verify_payment_signature()
            .withf(|order, payment, signature| {
                order == ORDER_ID && payment == PAYMENT_ID && signature == "deadbeef"
            })
            .times(1)
            .returning(|_, _, _| false);
        mocks.gateway.expect_fetch_order().never();
        let usecase = mocks.into_usecase();

        let err = usecase
            .verify_and_settle(verify_request(Uuid::new_v4(), Uuid::new_v4()))
            .await
            .unwrap_err();

        assert!(matches!(err, SettlementError::InvalidSignature));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn body_naming_another_slot_is_rejected_before_booking() {
        let paid_slot = Uuid::new_v4();
        let cheap_mentor = Uuid::new_v4();
        let mut mocks = Mocks::new();
        mocks
            .gateway
            .expect_verify_payment_signature()
            .returning(|_, _, _| true);
        let cheap_order = paid_order(order_notes(paid_slot, cheap_mentor), 100);
        mocks
            .gateway
            .expect_fetch_order()
            .times(1)
            .returning(move |_| Ok(cheap_order.clone()));
        mocks.gateway.expect_fetch_payment().never();
        mocks.mentors.expect_find_by_id().never();
        mocks.bookings.expect_create_and_claim_slot().never();
        mocks.payments.expect_upsert_by_order_id().never();
        mocks.invoices.expect_next_invoice_number().never();
        mocks.mailer.expect_send().never();

        let mut request = verify_request(Uuid::new_v4(), Uuid::new_v4());
        request.referral_code = Some("FRIEND10".to_string());

        let usecase = mocks.into_usecase();
        let err = usecase.verify_and_settle(request).await.unwrap_err();

        match &err {
            SettlementError::BookingMismatch(fields) => assert_eq!(fields, "slot_id, mentor_id"),
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn body_with_other_session_type_is_rejected() {
        let slot_id = Uuid::new_v4();
        let mentor_id = Uuid::new_v4();
        let mut mocks = Mocks::new();
        mocks
            .gateway
            .expect_verify_payment_signature()
            .returning(|_, _, _| true);
        let mut notes = order_notes(slot_id, mentor_id);
        notes.session_type = "quick".to_string();
        let order = paid_order(notes, 25_000);
        mocks
            .gateway
            .expect_fetch_order()
            .returning(move |_| Ok(order.clone()));
        mocks.bookings.expect_create_and_claim_slot().never();

        let usecase = mocks.into_usecase();
        let err = usecase
            .verify_and_settle(verify_request(slot_id, mentor_id))
            .await
            .unwrap_err();

        assert!(matches!(err, SettlementError::BookingMismatch(ref fields) if fields == "session_type"));
    }

    #[tokio::test]
    async fn order_fetch_failure_is_a_gateway_error() {
        let mut mocks = Mocks::new();
        mocks
            .gateway
            .expect_verify_payment_signature()
            .returning(|_, _, _| true);
        mocks
            .gateway
            .expect_fetch_order()
            .returning(|_| Err(anyhow::anyhow!("razorpay 503")));
        mocks.bookings.expect_create_and_claim_slot().never();

        let usecase = mocks.into_usecase();
        let err = usecase
            .verify_and_settle(verify_request(Uuid::new_v4(), Uuid::new_v4()))
            .await
            .unwrap_err();

        assert!(matches!(err, SettlementError::Gateway(_)));
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn order_without_booking_notes_is_rejected() {
        let mut mocks = Mocks::new();
        mocks
            .gateway
            .expect_verify_payment_signature()
            .returning(|_, _, _| true);
        mocks.gateway.expect_fetch_order().returning(|_| {
            Ok(RazorpayOrder {
                id: ORDER_ID.to_string(),
                amount: 49_900,
                currency: "INR".to_string(),
                receipt: None,
                status: Some("paid".to_string()),
                notes: HashMap::new(),
            })
        });
        mocks.bookings.expect_create_and_claim_slot().never();

        let usecase = mocks.into_usecase();
        let err = usecase
            .verify_and_settle(verify_request(Uuid::new_v4(), Uuid::new_v4()))
            .await
            .unwrap_err();

        assert!(matches!(err, SettlementError::MissingBookingDetails(_)));
    }

    #[tokio::test]
    async fn new_booking_upserts_payment_and_sends_three_emails() {
        let slot_id = Uuid::new_v4();
        let mentor_id = Uuid::new_v4();
        let mut mocks = Mocks::new();
        expect_lookups(&mut mocks, slot_id, mentor_id);

        mocks
            .invoices
            .expect_next_invoice_number()
            .times(1)
            .returning(|| Ok(42));
        mocks
            .gateway
            .expect_fetch_payment()
            .returning(|_| Ok(card_payment()));
        mocks
            .bookings
            .expect_create_and_claim_slot()
            .withf(move |insert| {
                insert.razorpay_order_id == ORDER_ID
                    && insert.slot_id == Some(slot_id)
                    && insert.status == "confirmed"
                    && insert.session_price == 499
                    && insert.meet_link.as_deref() == Some("https://meet.google.com/abc-defg-hij")
            })
            .times(1)
            .returning(|insert| Ok(BookingInsertOutcome::Created(booking_from(&insert))));
        mocks
            .payments
            .expect_upsert_by_order_id()
            .withf(|payment| {
                payment.booking_id.is_some()
                    && payment.razorpay_signature.as_deref() == Some("deadbeef")
                    && payment.payment_method == "card"
                    && payment.card_last4.as_deref() == Some("1111")
                    && payment.amount == 49_900
                    && payment.invoice_id.ends_with("-000042")
            })
            .times(1)
            .returning(|payment| Ok(payment_from(&payment)));
        mocks
            .profiles
            .expect_update_phone()
            .withf(|user_id, email, phone| {
                user_id.is_none() && email == "asha@example.com" && phone == "+919800000000"
            })
            .times(1)
            .returning(|_, _, _| Ok(1));

        let recipients = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&recipients);
        mocks.mailer.expect_send().times(3).returning(move |message| {
            seen.lock().unwrap().push(message.to);
            Ok(())
        });

        let usecase = mocks.into_usecase();
        let response = usecase
            .verify_and_settle(verify_request(slot_id, mentor_id))
            .await
            .unwrap();

        assert!(response.success);
        assert!(!response.duplicate);
        assert_eq!(
            response.meet_link.as_deref(),
            Some("https://meet.google.com/abc-defg-hij")
        );
        assert!(response.invoice_id.starts_with("CC-"));
        assert_eq!(
            recipients.lock().unwrap().as_slice(),
            [
                "asha@example.com".to_string(),
                "rohan@college.edu".to_string(),
                "asha@example.com".to_string()
            ]
        );
    }

    #[tokio::test]
    async fn stored_invoice_id_wins_over_fresh_sequence() {
        let slot_id = Uuid::new_v4();
        let mentor_id = Uuid::new_v4();
        let mut mocks = Mocks::new();
        expect_lookups(&mut mocks, slot_id, mentor_id);

        mocks
            .invoices
            .expect_next_invoice_number()
            .returning(|| Ok(43));
        mocks
            .gateway
            .expect_fetch_payment()
            .returning(|_| Ok(card_payment()));
        mocks
            .bookings
            .expect_create_and_claim_slot()
            .returning(|insert| Ok(BookingInsertOutcome::Created(booking_from(&insert))));
        mocks.payments.expect_upsert_by_order_id().returning(|payment| {
            let mut stored = payment_from(&payment);
            stored.invoice_id = "CC-2030-000003".to_string();
            Ok(stored)
        });
        mocks.profiles.expect_update_phone().returning(|_, _, _| Ok(1));

        let receipt_bodies = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&receipt_bodies);
        mocks.mailer.expect_send().times(3).returning(move |message| {
            seen.lock().unwrap().push(message.html);
            Ok(())
        });

        let usecase = mocks.into_usecase();
        let response = usecase
            .verify_and_settle(verify_request(slot_id, mentor_id))
            .await
            .unwrap();

        assert_eq!(response.invoice_id, "CC-2030-000003");
        let bodies = receipt_bodies.lock().unwrap();
        assert!(bodies[2].contains("CC-2030-000003"));
        assert!(!bodies[2].contains("000043"));
    }

    #[tokio::test]
    async fn duplicate_verification_returns_existing_booking_without_emails() {
        let slot_id = Uuid::new_v4();
        let mentor_id = Uuid::new_v4();
        let mut mocks = Mocks::new();
        expect_lookups(&mut mocks, slot_id, mentor_id);

        let mentor = sample_mentor(mentor_id);
        let slot = sample_slot(slot_id, mentor_id);
        let existing = booking_from(&InsertBookingEntity {
            mentor_id,
            slot_id: Some(slot_id),
            user_id: None,
            user_name: "Asha".to_string(),
            user_email: "asha@example.com".to_string(),
            user_phone: None,
            session_type: "standard".to_string(),
            session_price: 499,
            date: slot.date,
            start_time: slot.start_time,
            end_time: slot.end_time,
            status: "confirmed".to_string(),
            meet_link: mentor.meet_link.clone(),
            razorpay_order_id: ORDER_ID.to_string(),
            confirmed_at: Some(Utc::now()),
        });
        let existing_id = existing.id;

        mocks.invoices.expect_next_invoice_number().never();
        mocks
            .gateway
            .expect_fetch_payment()
            .returning(|_| Ok(card_payment()));
        mocks
            .bookings
            .expect_create_and_claim_slot()
            .times(1)
            .returning(|_| Ok(BookingInsertOutcome::DuplicateOrder));
        mocks
            .bookings
            .expect_find_by_order_id()
            .withf(|order_id| order_id == ORDER_ID)
            .times(1)
            .returning(move |_| Ok(Some(existing.clone())));
        mocks
            .payments
            .expect_find_by_order_id()
            .returning(|order_id| Ok(Some(stored_payment(order_id, "CC-2030-000007"))));
        mocks
            .payments
            .expect_upsert_by_order_id()
            .withf(move |payment| {
                payment.booking_id == Some(existing_id) && payment.invoice_id == "CC-2030-000007"
            })
            .times(1)
            .returning(|payment| Ok(payment_from(&payment)));
        mocks.profiles.expect_update_phone().never();
        mocks.mailer.expect_send().never();

        let usecase = mocks.into_usecase();
        let response = usecase
            .verify_and_settle(verify_request(slot_id, mentor_id))
            .await
            .unwrap();

        assert!(response.success);
        assert!(response.duplicate);
        assert_eq!(response.booking.id, existing_id);
        assert_eq!(response.invoice_id, "CC-2030-000007");
    }

    #[tokio::test]
    async fn gateway_fetch_failure_falls_back_to_online() {
        let slot_id = Uuid::new_v4();
        let mentor_id = Uuid::new_v4();
        let mut mocks = Mocks::new();
        expect_lookups(&mut mocks, slot_id, mentor_id);

        mocks
            .invoices
            .expect_next_invoice_number()
            .returning(|| Ok(42));
        mocks
            .gateway
            .expect_fetch_payment()
            .returning(|_| Err(anyhow::anyhow!("gateway timeout")));
        mocks
            .bookings
            .expect_create_and_claim_slot()
            .returning(|insert| Ok(BookingInsertOutcome::Created(booking_from(&insert))));
        mocks
            .payments
            .expect_upsert_by_order_id()
            .withf(|payment| {
                payment.payment_method == "Online"
                    && payment.card_network.is_none()
                    && payment.card_last4.is_none()
                    && payment.bank.is_none()
                    && payment.wallet.is_none()
                    && payment.vpa.is_none()
                    && payment.fee.is_none()
                    && payment.amount == 49_900
            })
            .times(1)
            .returning(|payment| Ok(payment_from(&payment)));
        mocks.profiles.expect_update_phone().returning(|_, _, _| Ok(1));
        mocks.mailer.expect_send().times(3).returning(|_| Ok(()));

        let usecase = mocks.into_usecase();
        let response = usecase
            .verify_and_settle(verify_request(slot_id, mentor_id))
            .await
            .unwrap();

        assert!(response.success);
        assert_eq!(response.booking.session_price, 499);
    }

    #[tokio::test]
    async fn email_failures_still_report_success() {
        let slot_id = Uuid::new_v4();
        let mentor_id = Uuid::new_v4();
        let mut mocks = Mocks::new();
        expect_lookups(&mut mocks, slot_id, mentor_id);

        mocks
            .invoices
            .expect_next_invoice_number()
            .returning(|| Ok(42));
        mocks
            .gateway
            .expect_fetch_payment()
            .returning(|_| Ok(card_payment()));
        mocks
            .bookings
            .expect_create_and_claim_slot()
            .returning(|insert| Ok(BookingInsertOutcome::Created(booking_from(&insert))));
        mocks
            .payments
            .expect_upsert_by_order_id()
            .returning(|payment| Ok(payment_from(&payment)));
        mocks
            .profiles
            .expect_update_phone()
            .returning(|_, _, _| Err(anyhow::anyhow!("profiles table locked")));
        mocks
            .mailer
            .expect_send()
            .times(3)
            .returning(|_| Err(anyhow::anyhow!("resend 500")));

        let usecase = mocks.into_usecase();
        let response = usecase
            .verify_and_settle(verify_request(slot_id, mentor_id))
            .await
            .unwrap();

        assert!(response.success);
        assert_eq!(
            response.meet_link.as_deref(),
            Some("https://meet.google.com/abc-defg-hij")
        );
        assert_eq!(response.booking.razorpay_order_id, ORDER_ID);
    }

    #[tokio::test]
    async fn invoice_sequence_failure_uses_timestamp_id() {
        let slot_id = Uuid::new_v4();
        let mentor_id = Uuid::new_v4();
        let mut mocks = Mocks::new();
        expect_lookups(&mut mocks, slot_id, mentor_id);

        mocks
            .gateway
            .expect_fetch_payment()
            .returning(|_| Ok(card_payment()));
        mocks
            .invoices
            .expect_next_invoice_number()
            .returning(|| Err(anyhow::anyhow!("permission denied for sequence")));
        mocks
            .bookings
            .expect_create_and_claim_slot()
            .returning(|insert| Ok(BookingInsertOutcome::Created(booking_from(&insert))));
        mocks
            .payments
            .expect_upsert_by_order_id()
            .returning(|payment| Ok(payment_from(&payment)));
        mocks.profiles.expect_update_phone().returning(|_, _, _| Ok(0));
        mocks.mailer.expect_send().returning(|_| Ok(()));

        let usecase = mocks.into_usecase();
        let response = usecase
            .verify_and_settle(verify_request(slot_id, mentor_id))
            .await
            .unwrap();

        let suffix = response.invoice_id.strip_prefix("CC-").unwrap();
        assert!(suffix.len() >= 13);
        assert!(suffix.chars().all(|c| c.is_ascii_digit()));
    }

    #[tokio::test]
    async fn slot_taken_by_other_order_keeps_payment_and_conflicts() {
        let slot_id = Uuid::new_v4();
        let mentor_id = Uuid::new_v4();
        let mut mocks = Mocks::new();
        expect_lookups(&mut mocks, slot_id, mentor_id);

        mocks
            .gateway
            .expect_fetch_payment()
            .returning(|_| Ok(card_payment()));
        mocks
            .bookings
            .expect_create_and_claim_slot()
            .returning(|_| Ok(BookingInsertOutcome::SlotTaken));
        mocks
            .payments
            .expect_find_by_order_id()
            .times(1)
            .returning(|_| Ok(None));
        mocks
            .invoices
            .expect_next_invoice_number()
            .times(1)
            .returning(|| Ok(5));
        mocks
            .payments
            .expect_upsert_by_order_id()
            .withf(|payment| {
                payment.booking_id.is_none()
                    && payment.razorpay_order_id == ORDER_ID
                    && payment.invoice_id.ends_with("-000005")
            })
            .times(1)
            .returning(|payment| Ok(payment_from(&payment)));
        mocks.mailer.expect_send().never();

        let usecase = mocks.into_usecase();
        let err = usecase
            .verify_and_settle(verify_request(slot_id, mentor_id))
            .await
            .unwrap_err();

        assert!(matches!(err, SettlementError::SlotTaken));
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn unknown_mentor_is_not_found() {
        let slot_id = Uuid::new_v4();
        let mentor_id = Uuid::new_v4();
        let mut mocks = Mocks::new();
        mocks
            .gateway
            .expect_verify_payment_signature()
            .returning(|_, _, _| true);
        let order = paid_order(order_notes(slot_id, mentor_id), 49_900);
        mocks
            .gateway
            .expect_fetch_order()
            .returning(move |_| Ok(order.clone()));
        mocks
            .gateway
            .expect_fetch_payment()
            .returning(|_| Ok(card_payment()));
        mocks.invoices.expect_next_invoice_number().never();
        mocks.mentors.expect_find_by_id().returning(|_| Ok(None));
        mocks.bookings.expect_create_and_claim_slot().never();

        let usecase = mocks.into_usecase();
        let err = usecase
            .verify_and_settle(verify_request(slot_id, mentor_id))
            .await
            .unwrap_err();

        assert!(matches!(err, SettlementError::MentorNotFound));
    }

    fn referral(code: String, code_id: Uuid, max_uses: Option<i32>, times_used: i32) -> ReferralCodeEntity {
        ReferralCodeEntity {
            id: code_id,
            code,
            discount_percent: 10,
            max_uses,
            times_used,
            is_active: true,
            expires_at: None,
            created_at: Utc::now(),
        }
    }

    /// Mocks a settled new booking, leaving referral expectations to the caller.
    fn expect_new_booking(mocks: &mut Mocks) {
        mocks
            .invoices
            .expect_next_invoice_number()
            .returning(|| Ok(42));
        mocks
            .gateway
            .expect_fetch_payment()
            .returning(|_| Ok(card_payment()));
        mocks
            .bookings
            .expect_create_and_claim_slot()
            .returning(|insert| Ok(BookingInsertOutcome::Created(booking_from(&insert))));
        mocks
            .payments
            .expect_upsert_by_order_id()
            .returning(|payment| Ok(payment_from(&payment)));
        mocks.profiles.expect_update_phone().returning(|_, _, _| Ok(1));
        mocks.mailer.expect_send().returning(|_| Ok(()));
    }

    #[tokio::test]
    async fn referral_code_from_order_notes_is_recorded() {
        let slot_id = Uuid::new_v4();
        let mentor_id = Uuid::new_v4();
        let mut mocks = Mocks::new();
        let mut notes = order_notes(slot_id, mentor_id);
        notes.referral_code = Some("welcome10".to_string());
        expect_lookups_for(&mut mocks, notes);
        expect_new_booking(&mut mocks);

        let code_id = Uuid::new_v4();
        mocks
            .referrals
            .expect_find_by_code()
            .withf(|code| code == "WELCOME10")
            .returning(move |code| Ok(Some(referral(code, code_id, None, 3))));
        mocks
            .referrals
            .expect_record_use()
            .withf(move |referral_use| {
                referral_use.referral_code_id == code_id
                    && referral_use.razorpay_order_id == ORDER_ID
                    && referral_use.user_email == "asha@example.com"
            })
            .times(1)
            .returning(|_| Ok(ReferralUseOutcome::Recorded));

        let usecase = mocks.into_usecase();
        let response = usecase
            .verify_and_settle(verify_request(slot_id, mentor_id))
            .await
            .unwrap();
        assert!(response.success);
    }

    #[tokio::test]
    async fn referral_code_only_in_request_body_is_ignored() {
        let slot_id = Uuid::new_v4();
        let mentor_id = Uuid::new_v4();
        let mut mocks = Mocks::new();
        expect_lookups(&mut mocks, slot_id, mentor_id);
        expect_new_booking(&mut mocks);
        mocks.referrals.expect_find_by_code().never();
        mocks.referrals.expect_record_use().never();

        let mut request = verify_request(slot_id, mentor_id);
        request.referral_code = Some(" welcome10 ".to_string());

        let usecase = mocks.into_usecase();
        let response = usecase.verify_and_settle(request).await.unwrap();
        assert!(response.success);
    }

    #[tokio::test]
    async fn exhausted_referral_code_is_not_recorded() {
        let slot_id = Uuid::new_v4();
        let mentor_id = Uuid::new_v4();
        let mut mocks = Mocks::new();
        let mut notes = order_notes(slot_id, mentor_id);
        notes.referral_code = Some("FRIEND10".to_string());
        expect_lookups_for(&mut mocks, notes);
        expect_new_booking(&mut mocks);

        mocks
            .referrals
            .expect_find_by_code()
            .returning(|code| Ok(Some(referral(code, Uuid::new_v4(), Some(1), 1))));
        mocks.referrals.expect_record_use().never();

        let usecase = mocks.into_usecase();
        let response = usecase
            .verify_and_settle(verify_request(slot_id, mentor_id))
            .await
            .unwrap();
        assert!(response.success);
        assert!(!response.duplicate);
    }

    #[tokio::test]
    async fn webhook_with_bad_signature_is_rejected() {
        let mut mocks = Mocks::new();
        mocks
            .gateway
            .expect_verify_webhook_signature()
            .returning(|_, _| false);
        let usecase = mocks.into_usecase();

        let err = usecase
            .handle_webhook(br#"{"event":"order.paid"}"#, Some("abc"))
            .await
            .unwrap_err();
        assert!(matches!(err, SettlementError::InvalidSignature));

        let err = usecase
            .handle_webhook(br#"{"event":"order.paid"}"#, None)
            .await
            .unwrap_err();
        assert!(matches!(err, SettlementError::InvalidSignature));
    }

    #[tokio::test]
    async fn webhook_ignores_unhandled_events() {
        let mut mocks = Mocks::new();
        mocks
            .gateway
            .expect_verify_webhook_signature()
            .returning(|_, _| true);
        let usecase = mocks.into_usecase();

        let outcome = usecase
            .handle_webhook(br#"{"event":"refund.created","payload":{}}"#, Some("sig"))
            .await
            .unwrap();
        assert!(matches!(outcome, WebhookOutcome::Ignored { .. }));
    }

    #[tokio::test]
    async fn webhook_with_unknown_session_type_is_ignored() {
        let mut mocks = Mocks::new();
        mocks
            .gateway
            .expect_verify_webhook_signature()
            .returning(|_, _| true);
        mocks.bookings.expect_create_and_claim_slot().never();
        let usecase = mocks.into_usecase();

        let body = serde_json::json!({
            "event": "payment.captured",
            "payload": {"payment": {"entity": {
                "id": PAYMENT_ID, "order_id": ORDER_ID, "amount": 49_900,
                "currency": "INR", "status": "captured",
                "notes": {
                    "slot_id": Uuid::new_v4().to_string(),
                    "mentor_id": Uuid::new_v4().to_string(),
                    "session_type": "group",
                    "user_email": "asha@example.com"
                }
            }}}
        });
        let payload = serde_json::to_vec(&body).unwrap();

        let outcome = usecase.handle_webhook(&payload, Some("sig")).await.unwrap();
        assert!(matches!(outcome, WebhookOutcome::Ignored { ref reason } if reason.contains("group")));
    }

    #[tokio::test]
    async fn order_paid_webhook_settles_from_order_notes() {
        let slot_id = Uuid::new_v4();
        let mentor_id = Uuid::new_v4();
        let mut mocks = Mocks::new();

        mocks
            .gateway
            .expect_verify_webhook_signature()
            .returning(|_, _| true);
        mocks.gateway.expect_fetch_order().never();
        mocks
            .gateway
            .expect_fetch_payment()
            .returning(|_| Err(anyhow::anyhow!("rate limited")));
        mocks
            .invoices
            .expect_next_invoice_number()
            .returning(|| Ok(9));
        mocks
            .mentors
            .expect_find_by_id()
            .with(eq(mentor_id))
            .returning(|id| Ok(Some(sample_mentor(id))));
        mocks
            .slots
            .expect_find_by_id()
            .with(eq(slot_id))
            .returning(move |id| Ok(Some(sample_slot(id, mentor_id))));
        mocks
            .bookings
            .expect_create_and_claim_slot()
            .withf(|insert| {
                insert.user_name == "Asha"
                    && insert.session_type == "quick"
                    && insert.session_price == 250
            })
            .returning(|insert| Ok(BookingInsertOutcome::Created(booking_from(&insert))));
        mocks
            .payments
            .expect_upsert_by_order_id()
            .withf(|payment| {
                payment.razorpay_signature.is_none()
                    && payment.payment_method == "upi"
                    && payment.vpa.as_deref() == Some("asha@upi")
            })
            .returning(|payment| Ok(payment_from(&payment)));
        mocks.profiles.expect_update_phone().never();
        mocks.mailer.expect_send().times(3).returning(|_| Ok(()));

        let body = serde_json::json!({
            "entity": "event",
            "event": "order.paid",
            "payload": {
                "payment": {"entity": {
                    "id": PAYMENT_ID, "order_id": ORDER_ID, "amount": 25_000,
                    "currency": "INR", "status": "captured", "method": "upi", "vpa": "asha@upi"
                }},
                "order": {"entity": {
                    "id": ORDER_ID, "amount": 25_000, "currency": "INR", "status": "paid",
                    "notes": {
                        "slot_id": slot_id.to_string(),
                        "mentor_id": mentor_id.to_string(),
                        "session_type": "quick",
                        "user_email": "asha@example.com",
                        "user_name": "Asha"
                    }
                }}
            }
        });
        let payload = serde_json::to_vec(&body).unwrap();

        let usecase = mocks.into_usecase();
        let outcome = usecase.handle_webhook(&payload, Some("sig")).await.unwrap();

        assert!(matches!(
            outcome,
            WebhookOutcome::Settled {
                duplicate: false,
                ..
            }
        ));
    }

    #[test]
    fn invoice_ids_are_zero_padded() {
        assert_eq!(format_invoice_id(2025, 42), "CC-2025-000042");
        assert_eq!(format_invoice_id(2025, 1_234_567), "CC-2025-1234567");
        assert_eq!(fallback_invoice_id(1_700_000_000_000), "CC-1700000000000");
    }
}
