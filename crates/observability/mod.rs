mod config;
mod discord;
mod layer;
mod notifier;

use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use config::ObservabilityConfig;
use discord::DiscordAlertSink;
use layer::AlertLayer;
use notifier::AlertDispatcher;

/// Installs the global subscriber. Must run inside a tokio runtime when
/// `DISCORD_WEBHOOK_URL` is set.
pub fn init_observability(component: &str) -> Result<()> {
    let config = ObservabilityConfig::from_env(component);

    let alert_layer = config.alerts.as_ref().map(|alerts| {
        let dispatcher = AlertDispatcher::spawn(vec![Arc::new(DiscordAlertSink::new(
            alerts.discord_webhook.clone(),
        ))]);
        AlertLayer::new(dispatcher, config.labels.clone(), alerts.min_level)
            .with_filter(LevelFilter::from_level(alerts.min_level))
    });

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339());

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(alert_layer)
        .with(env_filter)
        .try_init()?;

    for warning in &config.warnings {
        warn!(
            component = %config.labels.component,
            warning = %warning,
            "observability: config warning"
        );
    }

    info!(
        service = %config.labels.service,
        stage = %config.labels.stage,
        component = %config.labels.component,
        alerts_enabled = config.alerts.is_some(),
        "observability: initialized"
    );

    Ok(())
}
