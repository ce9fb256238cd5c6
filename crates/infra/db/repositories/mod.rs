pub mod availability_slots;
pub mod bookings;
pub mod invoices;
pub mod mentors;
pub mod nsat_referrals;
pub mod payments;
pub mod profiles;
pub mod referral_codes;
