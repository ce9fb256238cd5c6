pub mod bookings;
pub mod emails;
pub mod enums;
pub mod mentors;
pub mod nsat_referrals;
pub mod payments;
pub mod referrals;
pub mod slots;
