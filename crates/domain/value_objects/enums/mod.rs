pub mod booking_statuses;
pub mod nsat_statuses;
pub mod payment_statuses;
pub mod session_types;
