use crate::config::EmailConfig;
use crate::models::Listing;
use crate::notify::Notifier;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Local;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::fmt::Write;

/// Plain text mail over authenticated STARTTLS submission
pub struct EmailNotifier {
    config: EmailConfig,
}

impl EmailNotifier {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    pub fn subject(listings: &[Listing]) -> String {
        format!(
            "Neue Wohnungsangebote gefunden! ({} Angebote)",
            listings.len()
        )
    }

    /// Numbered summary of every listing in the batch
    pub fn render_body(listings: &[Listing]) -> String {
        let mut body = String::new();
        let _ = writeln!(body, "Hallo!\n");
        let _ = writeln!(
            body,
            "Ich habe {} neue Wohnungsangebote gefunden, die Ihren Kriterien entsprechen:\n",
            listings.len()
        );

        for (i, listing) in listings.iter().enumerate() {
            let _ = writeln!(body, "{}. {}", i + 1, listing.title);
            let _ = writeln!(body, "   Preis: {}", listing.price);
            let _ = writeln!(body, "   Ort: {}", listing.location);
            let _ = writeln!(body, "   Zimmer: {}", listing.rooms);
            let _ = writeln!(body, "   Größe: {}", listing.size);
            let _ = writeln!(body, "   Quelle: {}", listing.source);
            let _ = writeln!(body, "   Link: {}\n", listing.url);
        }

        let _ = writeln!(body, "Viel Erfolg bei der Wohnungssuche!\n");
        let _ = write!(
            body,
            "Gesendet am: {}",
            Local::now().format("%d.%m.%Y %H:%M:%S")
        );
        body
    }

    fn build_message(&self, listings: &[Listing]) -> Result<Message> {
        Message::builder()
            .from(
                self.config
                    .sender_email
                    .parse::<Mailbox>()
                    .context("Invalid sender address")?,
            )
            .to(self
                .config
                .recipient_email
                .parse::<Mailbox>()
                .context("Invalid recipient address")?)
            .subject(Self::subject(listings))
            .header(ContentType::TEXT_PLAIN)
            .body(Self::render_body(listings))
            .context("Failed to build email")
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    fn name(&self) -> &'static str {
        "email"
    }

    async fn send(&self, listings: &[Listing]) -> Result<()> {
        let message = self.build_message(listings)?;

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.smtp_server)
            .with_context(|| format!("Invalid SMTP server {}", self.config.smtp_server))?
            .port(self.config.smtp_port)
            .credentials(Credentials::new(
                self.config.sender_email.clone(),
                self.config.sender_password.clone(),
            ))
            .build();

        mailer
            .send(message)
            .await
            .with_context(|| format!("SMTP submission to {} failed", self.config.smtp_server))?;
        Ok(())
    }
}
