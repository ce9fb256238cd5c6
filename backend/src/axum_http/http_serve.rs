use crate::{
    axum_http::{
        default_routers,
        routers::{self, AppDependencies},
    },
    config::config_model::DotEnvyConfig,
    usecases::gateways::{Mailer, PaymentGateway},
};
use anyhow::Result;
use axum::{
    Router,
    http::{
        HeaderValue, Method,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    routing::get,
};
use crates::{
    email::resend_client::ResendClient, infra::db::postgres::postgres_connection::PgPoolSquad,
    payments::razorpay_client::RazorpayClient,
};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{info, warn};

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::PUT,
            Method::DELETE,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE]);

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(%origin, "http: ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(AllowOrigin::list(origins))
    }
}

/// All `/api` routes with the shared middleware stack.
pub fn build_router(deps: AppDependencies) -> Result<Router> {
    let server = deps.config.server.clone();

    let app = Router::new()
        .fallback(default_routers::not_found)
        .route("/api/health-check", get(default_routers::health_check))
        .nest("/api/mentors", routers::mentors::routes(&deps))
        .nest("/api/payments", routers::payments::routes(&deps))
        .nest("/api/referral", routers::referral::routes(&deps))
        .nest("/api/nsat-referrals", routers::nsat_referrals::routes(&deps))
        .nest("/api/admin", routers::admin::routes(&deps))
        .nest("/api/mentor", routers::mentor_dashboard::routes(&deps))
        .layer(TimeoutLayer::new(Duration::from_secs(server.timeout)))
        .layer(RequestBodyLimitLayer::new(
            (server.body_limit * 1024 * 1024).try_into()?,
        ))
        .layer(cors_layer(&server.cors_allowed_origins))
        .layer(TraceLayer::new_for_http());

    Ok(app)
}

pub async fn start(config: Arc<DotEnvyConfig>, db_pool: Arc<PgPoolSquad>) -> Result<()> {
    let gateway: Arc<dyn PaymentGateway> = Arc::new(RazorpayClient::new(
        config.razorpay.key_id.clone(),
        config.razorpay.key_secret.clone(),
        config.razorpay.webhook_secret.clone(),
    ));
    let mailer: Arc<dyn Mailer> = Arc::new(ResendClient::new(
        config.email.resend_api_key.clone(),
        config.email.from.clone(),
    ));

    let app = build_router(AppDependencies {
        config: Arc::clone(&config),
        db_pool,
        gateway,
        mailer,
    })?;

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    let listener = TcpListener::bind(addr).await?;

    info!(port = config.server.port, stage = %config.stage, "http: server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "http: failed to install CTRL+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "http: failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("http: received CTRL+C, shutting down"),
        _ = terminate => info!("http: received SIGTERM, shutting down"),
    }
}
