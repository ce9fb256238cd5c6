//! Razorpay signature checks.
//!
//! Checkout callbacks are signed with the API key secret over
//! `"{order_id}|{payment_id}"`; webhooks are signed with the webhook secret over
//! the raw request body. Both are lower-case hex HMAC-SHA256 digests.

use anyhow::{Result, anyhow};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

fn payment_message(order_id: &str, payment_id: &str) -> String {
    format!("{}|{}", order_id, payment_id)
}

/// Signature Razorpay attaches to a successful checkout for this order/payment pair.
pub fn payment_signature(key_secret: &str, order_id: &str, payment_id: &str) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(key_secret.as_bytes())
        .map_err(|err| anyhow!("invalid hmac key: {err}"))?;
    mac.update(payment_message(order_id, payment_id).as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Constant-time comparison of the client supplied checkout signature.
pub fn verify_payment_signature(
    key_secret: &str,
    order_id: &str,
    payment_id: &str,
    signature: &str,
) -> bool {
    verify(
        key_secret,
        payment_message(order_id, payment_id).as_bytes(),
        signature,
    )
}

/// Checks the `X-Razorpay-Signature` header against the raw webhook body.
pub fn verify_webhook_signature(webhook_secret: &str, payload: &[u8], signature: &str) -> bool {
    verify(webhook_secret, payload, signature)
}

fn verify(secret: &str, message: &[u8], signature: &str) -> bool {
    let Ok(provided) = hex::decode(signature.trim()) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(message);
    mac.verify_slice(&provided).is_ok()
}
