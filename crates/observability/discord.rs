use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::SecondsFormat;
use reqwest::Client;
use serde_json::json;
use url::Url;

use super::notifier::{AlertEvent, AlertSink};

/// Discord rejects messages longer than this.
const DISCORD_CONTENT_LIMIT: usize = 2000;

pub(crate) struct DiscordAlertSink {
    webhook_url: Url,
    client: Client,
}

impl DiscordAlertSink {
    pub(crate) fn new(webhook_url: Url) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(3))
            .build()
            .unwrap_or_default();

        Self {
            webhook_url,
            client,
        }
    }
}

pub(crate) fn render(event: &AlertEvent) -> String {
    let mut lines = vec![format!(
        "**{}** [{}] `{}` {}",
        event.service,
        event.stage,
        event.component,
        event.level.as_str()
    )];

    let location = event
        .location
        .as_deref()
        .map(|loc| format!(" ({loc})"))
        .unwrap_or_default();
    lines.push(format!(
        "{} `{}`{}",
        event.at.to_rfc3339_opts(SecondsFormat::Secs, true),
        event.target,
        location
    ));

    if let Some(message) = event.message.as_deref().map(str::trim).filter(|m| !m.is_empty()) {
        lines.push(format!("> {message}"));
    }

    for (key, value) in &event.fields {
        lines.push(format!("• {key}: `{value}`"));
    }

    for (span, fields) in &event.spans {
        if fields.is_empty() {
            continue;
        }
        let rendered = fields
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(" ");
        lines.push(format!("in `{span}` {rendered}"));
    }

    clamp(lines.join("\n"))
}

fn clamp(content: String) -> String {
    const MARKER: &str = "\n[truncated]";

    if content.chars().count() <= DISCORD_CONTENT_LIMIT {
        return content;
    }

    let keep = DISCORD_CONTENT_LIMIT - MARKER.chars().count();
    let mut clamped: String = content.chars().take(keep).collect();
    clamped.push_str(MARKER);
    clamped
}

#[async_trait]
impl AlertSink for DiscordAlertSink {
    async fn deliver(&self, event: &AlertEvent) -> Result<()> {
        let response = self
            .client
            .post(self.webhook_url.clone())
            .json(&json!({ "content": render(event) }))
            .send()
            .await
            // reqwest errors carry the URL, which holds the webhook token.
            .map_err(|err| anyhow!("discord webhook request failed (timeout: {})", err.is_timeout()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("discord webhook answered {status}"));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "discord"
    }
}
