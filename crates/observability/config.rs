use std::env;

use tracing::Level;
use url::Url;

#[derive(Debug, Clone)]
pub(crate) struct ServiceLabels {
    pub(crate) service: String,
    pub(crate) stage: String,
    pub(crate) component: String,
}

#[derive(Debug, Clone)]
pub(crate) struct AlertSinkConfig {
    pub(crate) discord_webhook: Url,
    pub(crate) min_level: Level,
}

#[derive(Debug, Clone)]
pub(crate) struct ObservabilityConfig {
    pub(crate) labels: ServiceLabels,
    pub(crate) alerts: Option<AlertSinkConfig>,
    /// Logged once the subscriber is installed.
    pub(crate) warnings: Vec<String>,
}

impl ObservabilityConfig {
    pub(crate) fn from_env(component: &str) -> Self {
        Self::from_lookup(component, |key| env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(component: &str, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let component = component.trim().to_string();
        let labels = ServiceLabels {
            service: non_empty("SERVICE_NAME").unwrap_or_else(|| "campus-connect".to_string()),
            stage: non_empty("STAGE").unwrap_or_else(|| "local".to_string()),
            component,
        };

        let mut warnings = Vec::new();

        let discord_webhook = match non_empty("DISCORD_WEBHOOK_URL") {
            None => None,
            Some(raw) => match Url::parse(&raw) {
                Ok(url) => Some(url),
                Err(err) => {
                    // The URL embeds the webhook token, so only the parse error is reported.
                    warnings.push(format!(
                        "DISCORD_WEBHOOK_URL could not be parsed ({err}); alerts disabled"
                    ));
                    None
                }
            },
        };

        let min_level = match non_empty("ALERT_NOTIFY_LEVEL") {
            None => Level::ERROR,
            Some(raw) => parse_level(&raw).unwrap_or_else(|| {
                warnings.push(format!("ALERT_NOTIFY_LEVEL={raw} is not a log level; using ERROR"));
                Level::ERROR
            }),
        };

        let alerts = discord_webhook.map(|discord_webhook| AlertSinkConfig {
            discord_webhook,
            min_level,
        });

        Self {
            labels,
            alerts,
            warnings,
        }
    }
}

pub(crate) fn parse_level(input: &str) -> Option<Level> {
    match input.trim().to_ascii_lowercase().as_str() {
        "error" => Some(Level::ERROR),
        "warn" | "warning" => Some(Level::WARN),
        "info" => Some(Level::INFO),
        "debug" => Some(Level::DEBUG),
        "trace" => Some(Level::TRACE),
        _ => None,
    }
}
