//! Scraper configuration.
//!
//! One JSON file holds everything. A missing file is created with the
//! defaults below, a malformed one is moved aside with a timestamp suffix
//! and regenerated. Loading never fails because of the file's content.

use anyhow::{Context, Result};
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info, warn};

/// Environment variable that overrides `notification.email.sender_password`
pub const SMTP_PASSWORD_ENV: &str = "SCOUT_SMTP_PASSWORD";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub search_criteria: SearchCriteria,
    pub notification: NotificationConfig,
    pub scraping: ScrapingConfig,
    pub storage: StorageConfig,
}

/// What a listing has to satisfy to be reported
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SearchCriteria {
    pub max_price: f64,
    pub min_rooms: f64,
    pub max_rooms: f64,
    pub cities: Vec<String>,
    /// Match-any; empty means no keyword requirement
    pub keywords: Vec<String>,
    /// Match-any; wins over `keywords`
    pub excluded_keywords: Vec<String>,
    /// Apply the room range when a listing's room count is numeric
    pub enforce_room_range: bool,
}

impl Default for SearchCriteria {
    fn default() -> Self {
        Self {
            max_price: 1200.0,
            min_rooms: 3.0,
            max_rooms: 4.0,
            cities: vec!["Soest".to_string()],
            keywords: vec![
                "haustier".to_string(),
                "haustiere".to_string(),
                "garten".to_string(),
            ],
            excluded_keywords: vec!["möbliert".to_string(), "zwischenmiete".to_string()],
            enforce_room_range: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NotificationConfig {
    pub email: EmailConfig,
    pub webhook: WebhookConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EmailConfig {
    pub enabled: bool,
    pub smtp_server: String,
    pub smtp_port: u16,
    pub sender_email: String,
    pub sender_password: String,
    pub recipient_email: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            smtp_server: "smtp.example.com".to_string(),
            smtp_port: 587,
            sender_email: "your_email@example.com".to_string(),
            sender_password: "your_password_here".to_string(),
            recipient_email: "recipient@example.com".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WebhookConfig {
    pub enabled: bool,
    pub url: String,
    pub username: String,
    pub icon_emoji: String,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: "https://hooks.slack.com/services/YOUR/WEBHOOK/URL".to_string(),
            username: "Wohnungs-Bot".to_string(),
            icon_emoji: ":house:".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScrapingConfig {
    pub interval_minutes: u64,
    pub max_results_per_site: usize,
    /// Pause after every site request
    pub request_delay_secs: u64,
    pub request_timeout_secs: u64,
    /// Pause after a failed pass in continuous mode
    pub recovery_interval_secs: u64,
}

impl Default for ScrapingConfig {
    fn default() -> Self {
        Self {
            interval_minutes: 30,
            max_results_per_site: 20,
            request_delay_secs: 2,
            request_timeout_secs: 30,
            recovery_interval_secs: 60,
        }
    }
}

impl ScrapingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_minutes * 60)
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_secs(self.request_delay_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn recovery_interval(&self) -> Duration {
        Duration::from_secs(self.recovery_interval_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    pub seen_file: PathBuf,
    pub audit_dir: PathBuf,
    /// Oldest fingerprints are dropped beyond this many entries; `None` keeps all
    pub max_seen_entries: Option<usize>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            seen_file: PathBuf::from("seen_apartments.json"),
            audit_dir: PathBuf::from("."),
            max_seen_entries: None,
        }
    }
}

impl Config {
    /// Load the config file, creating or regenerating it as needed.
    ///
    /// Only a failure to write the regenerated defaults is an error.
    pub async fn load_or_init(path: &Path) -> Result<Self> {
        let mut config = match tokio::fs::read(path).await {
            Ok(raw) => match serde_json::from_slice::<Config>(&raw) {
                Ok(config) => config,
                Err(e) => {
                    error!(path = %path.display(), error = %e, "Malformed configuration file");
                    let config = Config::default();
                    match backup_file(path).await {
                        Ok(backup) => {
                            info!(backup = %backup.display(), "Backed up malformed configuration");
                            config.write(path).await?;
                            info!(path = %path.display(), "Regenerated default configuration");
                        }
                        Err(e) => warn!(
                            error = %e,
                            "Could not back up malformed configuration, using defaults without overwriting it"
                        ),
                    }
                    config
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let config = Config::default();
                config.write(path).await?;
                info!(path = %path.display(), "Created default configuration");
                config
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "Could not read configuration, using defaults");
                Config::default()
            }
        };

        if let Ok(password) = std::env::var(SMTP_PASSWORD_ENV) {
            config.notification.email.sender_password = password;
        }

        Ok(config)
    }

    pub async fn write(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, json)
            .await
            .with_context(|| format!("Failed to write configuration to {}", path.display()))
    }

    /// Copy suitable for display, with the SMTP password masked
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if !copy.notification.email.sender_password.is_empty() {
            copy.notification.email.sender_password = "********".to_string();
        }
        copy
    }
}

/// Move `path` aside to `<path>.backup_YYYYMMDD_HHMMSS` and return the new name.
pub async fn backup_file(path: &Path) -> std::io::Result<PathBuf> {
    let mut name = path.as_os_str().to_owned();
    name.push(format!(".backup_{}", Local::now().format("%Y%m%d_%H%M%S")));
    let backup = PathBuf::from(name);
    tokio::fs::rename(path, &backup).await?;
    Ok(backup)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn backups_in(dir: &Path, prefix: &str) -> Vec<PathBuf> {
        std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .filter(|p| {
                p.file_name()
                    .unwrap()
                    .to_string_lossy()
                    .starts_with(&format!("{}.backup_", prefix))
            })
            .collect()
    }

    #[tokio::test]
    async fn missing_file_is_created_with_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("scraper_config.json");

        let config = Config::load_or_init(&path).await.unwrap();
        assert_eq!(config.search_criteria, SearchCriteria::default());
        assert!(path.exists());

        let written: Config =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written.scraping.max_results_per_site, 20);
        assert_eq!(written.storage, StorageConfig::default());
    }

    #[tokio::test]
    async fn malformed_file_is_backed_up_and_regenerated() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("scraper_config.json");
        std::fs::write(&path, "{ \"search_criteria\": ").unwrap();

        let config = Config::load_or_init(&path).await.unwrap();
        assert_eq!(config.scraping, ScrapingConfig::default());

        let backups = backups_in(tmp.path(), "scraper_config.json");
        assert_eq!(backups.len(), 1);
        assert_eq!(
            std::fs::read_to_string(&backups[0]).unwrap(),
            "{ \"search_criteria\": "
        );
        let regenerated: Config =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(regenerated.notification.email.smtp_port, 587);
    }

    #[tokio::test]
    async fn non_utf8_file_is_backed_up_and_regenerated() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("scraper_config.json");
        let latin1: &[u8] =
            b"{\"search_criteria\":{\"max_price\":700,\"excluded_keywords\":[\"m\xF6bliert\"]}}";
        std::fs::write(&path, latin1).unwrap();

        let config = Config::load_or_init(&path).await.unwrap();
        assert_eq!(config.search_criteria, SearchCriteria::default());

        let backups = backups_in(tmp.path(), "scraper_config.json");
        assert_eq!(backups.len(), 1);
        assert_eq!(std::fs::read(&backups[0]).unwrap(), latin1);
        let regenerated: Config =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(regenerated, Config::default());
    }

    #[tokio::test]
    async fn partial_file_fills_in_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("scraper_config.json");
        std::fs::write(
            &path,
            r#"{"search_criteria": {"max_price": 950, "cities": ["Lippstadt"]},
                "scraping": {"interval_minutes": 5}}"#,
        )
        .unwrap();

        let config = Config::load_or_init(&path).await.unwrap();
        assert_eq!(config.search_criteria.max_price, 950.0);
        assert_eq!(config.search_criteria.cities, vec!["Lippstadt"]);
        assert_eq!(config.search_criteria.excluded_keywords.len(), 2);
        assert_eq!(config.scraping.interval(), Duration::from_secs(300));
        assert_eq!(config.scraping.max_results_per_site, 20);
        assert!(!config.notification.webhook.enabled);
        assert!(backups_in(tmp.path(), "scraper_config.json").is_empty());
    }

    #[test]
    fn redacted_masks_password() {
        let config = Config::default();
        let shown = config.redacted();
        assert_eq!(shown.notification.email.sender_password, "********");
        assert_eq!(shown.notification.email.sender_email, config.notification.email.sender_email);
    }
}
