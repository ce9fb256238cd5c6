use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::value_objects::bookings::BookingDto;

/// Body of `POST /api/payments/verify`, posted by the checkout widget callback.
///
/// The three gateway fields are optional at the serde level so that a missing
/// field is reported as a validation error instead of an extractor rejection.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct VerifyPaymentRequest {
    pub razorpay_order_id: Option<String>,
    pub razorpay_payment_id: Option<String>,
    pub razorpay_signature: Option<String>,
    pub slot_id: Option<Uuid>,
    pub mentor_id: Option<Uuid>,
    pub session_type: Option<String>,
    pub user_id: Option<Uuid>,
    pub user_name: Option<String>,
    pub user_email: Option<String>,
    pub user_phone: Option<String>,
    pub selected_date: Option<String>,
    pub selected_time: Option<String>,
    /// Code applied when the order was created, recorded once the booking exists.
    pub referral_code: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPaymentResponse {
    pub success: bool,
    pub message: String,
    pub booking: BookingDto,
    pub meet_link: Option<String>,
    pub invoice_id: String,
    /// True when this call resolved to a booking created by an earlier call.
    pub duplicate: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreateOrderRequest {
    pub mentor_id: Uuid,
    pub slot_id: Uuid,
    pub session_type: String,
    pub user_email: String,
    pub user_name: Option<String>,
    pub user_phone: Option<String>,
    pub user_id: Option<Uuid>,
    pub referral_code: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderResponse {
    pub order_id: String,
    /// Paise, as sent to the gateway.
    pub amount: i64,
    pub currency: String,
    pub key_id: String,
    /// Whole rupees after discount.
    pub price: i32,
    /// Whole rupees taken off by the referral code.
    pub discount: i32,
}

/// Booking context carried on the gateway order so webhooks can settle
/// without the browser callback.
#[derive(Debug, Clone, PartialEq)]
pub struct BookingOrderNotes {
    pub slot_id: Uuid,
    pub mentor_id: Uuid,
    pub session_type: String,
    pub user_email: String,
    pub user_name: Option<String>,
    pub user_phone: Option<String>,
    pub user_id: Option<Uuid>,
    pub referral_code: Option<String>,
}

impl BookingOrderNotes {
    pub fn into_map(self) -> HashMap<String, String> {
        let mut notes = HashMap::from([
            ("slot_id".to_string(), self.slot_id.to_string()),
            ("mentor_id".to_string(), self.mentor_id.to_string()),
            ("session_type".to_string(), self.session_type),
            ("user_email".to_string(), self.user_email),
        ]);
        let optional = [
            ("user_name", self.user_name),
            ("user_phone", self.user_phone),
            ("user_id", self.user_id.map(|id| id.to_string())),
            ("referral_code", self.referral_code),
        ];
        for (key, value) in optional {
            if let Some(value) = value.filter(|v| !v.is_empty()) {
                notes.insert(key.to_string(), value);
            }
        }
        notes
    }

    /// `None` unless slot, mentor, session type and email are all present.
    pub fn from_map(notes: &HashMap<String, String>) -> Option<Self> {
        let text = |key: &str| {
            notes
                .get(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        Some(Self {
            slot_id: text("slot_id")?.parse().ok()?,
            mentor_id: text("mentor_id")?.parse().ok()?,
            session_type: text("session_type")?,
            user_email: text("user_email")?,
            user_name: text("user_name"),
            user_phone: text("user_phone"),
            user_id: text("user_id").and_then(|id| id.parse().ok()),
            referral_code: text("referral_code"),
        })
    }
}

/// How the customer paid, as far as the gateway told us.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaymentMethodDetails {
    pub method: String,
    pub card_network: Option<String>,
    pub card_last4: Option<String>,
    pub bank: Option<String>,
    pub wallet: Option<String>,
    pub vpa: Option<String>,
    pub fee: Option<i64>,
    pub tax: Option<i64>,
}

impl PaymentMethodDetails {
    pub const FALLBACK_METHOD: &'static str = "Online";

    /// Used when the gateway lookup fails; the booking still goes through.
    pub fn fallback() -> Self {
        Self {
            method: Self::FALLBACK_METHOD.to_string(),
            ..Self::default()
        }
    }

    /// Human readable summary for the receipt email.
    pub fn describe(&self) -> String {
        match (
            self.card_network.as_deref(),
            self.card_last4.as_deref(),
            self.bank.as_deref(),
            self.wallet.as_deref(),
            self.vpa.as_deref(),
        ) {
            (Some(network), Some(last4), _, _, _) => format!("{network} card ending {last4}"),
            (_, _, Some(bank), _, _) => format!("Netbanking ({bank})"),
            (_, _, _, Some(wallet), _) => format!("Wallet ({wallet})"),
            (_, _, _, _, Some(vpa)) => format!("UPI ({vpa})"),
            _ => self.method.clone(),
        }
    }
}
