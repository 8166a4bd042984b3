//! Webhook notifications
//!
//! Formats categorized, timestamped event embeds and POSTs them to a
//! Discord-style webhook. Delivery is fire-and-forget: failures are logged
//! and never reach the supervisor.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, error};

use crate::config::Config;
use crate::error::{Result, SentinelError};
use crate::LOCAL_TZ;

/// Display name attached to webhook messages.
const BOT_USERNAME: &str = "Server Status";

/// Webhook POST timeout.
const DELIVERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Event categories reported to the webhook, each with a fixed title and
/// embed color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Server launched (green)
    Init,
    /// Server restarted (orange)
    Restart,
    /// Failure detected (red)
    Error,
    /// Corrective measure taken (blue)
    Action,
    /// Uncategorized notice (neutral blue)
    Log,
}

impl EventKind {
    pub fn title(&self) -> &'static str {
        match self {
            EventKind::Init => "\u{2705} Server started",
            EventKind::Restart => "\u{1f504} Server restarted",
            EventKind::Error => "\u{26a0}\u{fe0f} Server failure",
            EventKind::Action => "\u{1f6e0}\u{fe0f} Corrective action",
            EventKind::Log => "\u{1f535} General log",
        }
    }

    /// 24-bit embed color for this category.
    pub fn color(&self) -> u32 {
        match self {
            EventKind::Init => 0x57F287,
            EventKind::Restart => 0xFF9800,
            EventKind::Error => 0xE74C3C,
            EventKind::Action => 0x3498DB,
            EventKind::Log => 0x7289DA,
        }
    }
}

/// Best-effort event dispatch to the external channel.
#[async_trait]
pub trait Notify: Send + Sync {
    /// No-op when notifications are disabled or no target is configured.
    /// Never raises to the caller.
    async fn notify(&self, config: &Config, kind: EventKind, detail: Option<&str>);
}

#[derive(Serialize)]
struct WebhookPayload<'a> {
    username: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    avatar_url: Option<&'a str>,
    embeds: Vec<Embed>,
}

#[derive(Serialize)]
struct Embed {
    title: String,
    description: String,
    color: u32,
}

fn render(kind: EventKind, detail: Option<&str>, time: &str) -> Embed {
    let detail = detail.unwrap_or("(no detail)");
    let description = match kind {
        EventKind::Init => format!("The server was started successfully at {time}."),
        EventKind::Restart => format!("The server was restarted at {time}."),
        EventKind::Error => format!("Error: {detail} at {time}"),
        EventKind::Action => format!("Action taken: {detail} at {time}"),
        EventKind::Log => format!("{detail} at {time}"),
    };
    Embed {
        title: kind.title().to_string(),
        description,
        color: kind.color(),
    }
}

/// Webhook notification client
#[derive(Clone)]
pub struct WebhookNotifier {
    client: Client,
}

impl WebhookNotifier {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    async fn send(&self, url: &str, payload: &WebhookPayload<'_>) -> Result<()> {
        let response = self
            .client
            .post(url)
            .json(payload)
            .timeout(DELIVERY_TIMEOUT)
            .send()
            .await?;

        // Discord signals accepted webhook posts with 204 No Content.
        let status = response.status();
        if status.as_u16() == 204 {
            debug!("webhook notification sent");
            return Ok(());
        }
        let body: String = response
            .text()
            .await
            .unwrap_or_default()
            .chars()
            .take(300)
            .collect();
        Err(SentinelError::Webhook(format!("HTTP {status}: {body}")))
    }
}

impl Default for WebhookNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Notify for WebhookNotifier {
    async fn notify(&self, config: &Config, kind: EventKind, detail: Option<&str>) {
        // The global toggle silences notifications entirely.
        if !config.active {
            return;
        }
        let Some(url) = config.webhook_url.as_deref() else {
            return;
        };

        let time = Utc::now()
            .with_timezone(&LOCAL_TZ)
            .format("%H:%M:%S")
            .to_string();
        let payload = WebhookPayload {
            username: BOT_USERNAME,
            avatar_url: config.icon_url.as_deref(),
            embeds: vec![render(kind, detail, &time)],
        };

        if let Err(e) = self.send(url, &payload).await {
            error!("{e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_colors_match_channel_mapping() {
        assert_eq!(EventKind::Init.color(), 0x57F287);
        assert_eq!(EventKind::Restart.color(), 0xFF9800);
        assert_eq!(EventKind::Error.color(), 0xE74C3C);
        assert_eq!(EventKind::Action.color(), 0x3498DB);
        assert_eq!(EventKind::Log.color(), 0x7289DA);
    }

    #[test]
    fn render_includes_detail_and_time() {
        let embed = render(EventKind::Error, Some("probe failing"), "06:30:00");
        assert!(embed.description.contains("probe failing"));
        assert!(embed.description.contains("06:30:00"));
        assert_eq!(embed.color, 0xE74C3C);
    }

    #[test]
    fn payload_serializes_one_embed() {
        let payload = WebhookPayload {
            username: BOT_USERNAME,
            avatar_url: Some("https://example.invalid/icon.png"),
            embeds: vec![render(EventKind::Init, None, "12:00:00")],
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["username"], "Server Status");
        assert_eq!(json["embeds"].as_array().unwrap().len(), 1);
        assert_eq!(json["embeds"][0]["color"], 0x57F287);
    }

    #[test]
    fn payload_omits_missing_avatar() {
        let payload = WebhookPayload {
            username: BOT_USERNAME,
            avatar_url: None,
            embeds: Vec::new(),
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert!(json.get("avatar_url").is_none());
    }
}
