pub mod domain;
pub mod email;
pub mod infra;
pub mod observability;
pub mod payments;
