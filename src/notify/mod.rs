//! Notification fan-out for new listings.
//!
//! Each enabled channel gets the whole batch. A failing channel is logged
//! and does not affect the others; nothing is propagated to the caller.

pub mod email;
pub mod webhook;

pub use email::EmailNotifier;
pub use webhook::WebhookNotifier;

use crate::config::NotificationConfig;
use crate::models::Listing;
use anyhow::Result;
use async_trait::async_trait;
use tracing::{error, info};

/// A delivery channel for new listings
#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &'static str;

    async fn send(&self, listings: &[Listing]) -> Result<()>;
}

pub struct Dispatcher {
    channels: Vec<Box<dyn Notifier>>,
}

impl Dispatcher {
    pub fn new(channels: Vec<Box<dyn Notifier>>) -> Self {
        Self { channels }
    }

    /// Build the enabled channels; disabled ones are simply left out
    pub fn from_config(config: &NotificationConfig, client: reqwest::Client) -> Self {
        let mut channels: Vec<Box<dyn Notifier>> = Vec::new();
        if config.email.enabled {
            channels.push(Box::new(EmailNotifier::new(config.email.clone())));
        }
        if config.webhook.enabled {
            channels.push(Box::new(WebhookNotifier::new(config.webhook.clone(), client)));
        }
        Self::new(channels)
    }

    pub fn channel_names(&self) -> Vec<&'static str> {
        self.channels.iter().map(|c| c.name()).collect()
    }

    /// Send to every channel. Returns how many channels succeeded.
    pub async fn notify(&self, listings: &[Listing]) -> usize {
        if listings.is_empty() {
            return 0;
        }

        let mut delivered = 0;
        for channel in &self.channels {
            match channel.send(listings).await {
                Ok(()) => {
                    info!(channel = channel.name(), count = listings.len(), "Notification sent");
                    delivered += 1;
                }
                Err(e) => {
                    error!(channel = channel.name(), error = %e, "Notification failed");
                }
            }
        }
        delivered
    }
}
