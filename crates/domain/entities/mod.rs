pub mod availability_slots;
pub mod bookings;
pub mod mentors;
pub mod nsat_referrals;
pub mod payments;
pub mod referral_codes;
