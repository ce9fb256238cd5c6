use super::stage::Stage;

#[derive(Debug, Clone)]
pub struct DotEnvyConfig {
    pub stage: Stage,
    pub server: Server,
    pub database: Database,
    pub supabase: Supabase,
    pub razorpay: Razorpay,
    pub email: Email,
    pub booking: Booking,
}

#[derive(Debug, Clone)]
pub struct Server {
    pub port: u16,
    /// MiB.
    pub body_limit: u64,
    /// Seconds.
    pub timeout: u64,
    /// Empty means any origin.
    pub cors_allowed_origins: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Database {
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct Supabase {
    pub jwt_secret: String,
}

#[derive(Debug, Clone)]
pub struct Razorpay {
    pub key_id: String,
    pub key_secret: String,
    pub webhook_secret: String,
}

#[derive(Debug, Clone)]
pub struct Email {
    pub resend_api_key: String,
    pub from: String,
    pub admin_notification_email: Option<String>,
    /// Public site origin used in email links.
    pub site_url: String,
}

#[derive(Debug, Clone)]
pub struct Booking {
    pub slot_reservation_minutes: i64,
}
