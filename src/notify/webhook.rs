use crate::config::WebhookConfig;
use crate::models::Listing;
use crate::notify::Notifier;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::fmt::Write;

/// Slack-compatible incoming webhook body
#[derive(Debug, Serialize, PartialEq)]
pub struct WebhookPayload {
    pub text: String,
    pub username: String,
    pub icon_emoji: String,
}

pub struct WebhookNotifier {
    config: WebhookConfig,
    client: Client,
}

impl WebhookNotifier {
    pub fn new(config: WebhookConfig, client: Client) -> Self {
        Self { config, client }
    }

    pub fn payload(&self, listings: &[Listing]) -> WebhookPayload {
        let mut text = String::from("🏠 *Neue Wohnungsangebote gefunden!*\n\n");
        for listing in listings {
            let _ = writeln!(text, "• *{}*", listing.title);
            let _ = writeln!(text, "  💰 {} | 📍 {}", listing.price, listing.location);
            let _ = writeln!(text, "  🔗 <{}|Anzeige ansehen>\n", listing.url);
        }

        WebhookPayload {
            text,
            username: self.config.username.clone(),
            icon_emoji: self.config.icon_emoji.clone(),
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    fn name(&self) -> &'static str {
        "webhook"
    }

    /// One POST, no retry; a non-2xx answer is an error
    async fn send(&self, listings: &[Listing]) -> Result<()> {
        let response = self
            .client
            .post(&self.config.url)
            .json(&self.payload(listings))
            .send()
            .await
            .context("Failed to POST webhook")?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("Webhook returned status {}", status);
        }
        Ok(())
    }
}
