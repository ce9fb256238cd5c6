use std::sync::Arc;

use crates::infra::db::postgres::postgres_connection::PgPoolSquad;

use crate::{
    config::config_model::DotEnvyConfig,
    usecases::gateways::{Mailer, PaymentGateway},
};

pub mod admin;
pub mod mentor_dashboard;
pub mod mentors;
pub mod nsat_referrals;
pub mod payments;
pub mod referral;

/// Shared handles every router builds its usecases from.
#[derive(Clone)]
pub struct AppDependencies {
    pub config: Arc<DotEnvyConfig>,
    pub db_pool: Arc<PgPoolSquad>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub mailer: Arc<dyn Mailer>,
}
