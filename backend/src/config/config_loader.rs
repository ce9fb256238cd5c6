use std::str::FromStr;

use anyhow::{Context, Result};

use super::{
    config_model::{Booking, Database, DotEnvyConfig, Email, Razorpay, Server, Supabase},
    stage::Stage,
};

pub fn load() -> Result<DotEnvyConfig> {
    dotenvy::dotenv().ok();

    let server = Server {
        port: parsed_or("SERVER_PORT", 8080)?,
        body_limit: parsed_or("SERVER_BODY_LIMIT", 10)?,
        timeout: parsed_or("SERVER_TIMEOUT", 30)?,
        cors_allowed_origins: optional("CORS_ALLOWED_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(|origin| origin.trim().to_string())
                    .filter(|origin| !origin.is_empty())
                    .collect()
            })
            .unwrap_or_default(),
    };

    let database = Database {
        url: required("DATABASE_URL")?,
    };

    let supabase = Supabase {
        jwt_secret: get_supabase_jwt_secret()?,
    };

    let razorpay = Razorpay {
        key_id: required("RAZORPAY_KEY_ID")?,
        key_secret: required("RAZORPAY_KEY_SECRET")?,
        webhook_secret: required("RAZORPAY_WEBHOOK_SECRET")?,
    };

    let email = Email {
        resend_api_key: required("RESEND_API_KEY")?,
        from: required("EMAIL_FROM")?,
        admin_notification_email: optional("ADMIN_NOTIFICATION_EMAIL"),
        site_url: required("SITE_URL")?,
    };

    let booking = Booking {
        slot_reservation_minutes: parsed_or("SLOT_RESERVATION_MINUTES", 10)?,
    };

    Ok(DotEnvyConfig {
        stage: get_stage(),
        server,
        database,
        supabase,
        razorpay,
        email,
        booking,
    })
}

pub fn get_stage() -> Stage {
    optional("STAGE")
        .and_then(|raw| Stage::from_str(&raw))
        .unwrap_or_default()
}

/// Read on its own by the auth extractor, which has no access to router state.
pub fn get_supabase_jwt_secret() -> Result<String> {
    dotenvy::dotenv().ok();
    required("SUPABASE_JWT_SECRET")
}

fn required(key: &str) -> Result<String> {
    optional(key).with_context(|| format!("{key} is not set"))
}

fn optional(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parsed_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional(key) {
        Some(raw) => raw
            .parse::<T>()
            .with_context(|| format!("{key} is invalid: {raw}")),
        None => Ok(default),
    }
}
