pub mod admin_bookings;
pub mod admin_emails;
pub mod gateways;
pub mod mentor_dashboard;
pub mod mentors;
pub mod notifications;
pub mod nsat_referrals;
pub mod orders;
pub mod referrals;
pub mod settlement;
