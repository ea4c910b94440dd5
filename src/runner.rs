//! Pass orchestration: fetch → match → dedup → notify → persist → audit.
//!
//! Everything is sequential. Sites are visited one after another per city
//! with a pause in between, and no two passes ever overlap.

use crate::audit::AuditLog;
use crate::config::{Config, ScrapingConfig, SearchCriteria};
use crate::error::PassError;
use crate::matcher;
use crate::models::Listing;
use crate::notify::Dispatcher;
use crate::scrapers::{self, ScraperTrait};
use crate::store::SeenStore;
use anyhow::Result;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Timing of a run
#[derive(Debug, Clone, PartialEq)]
pub struct RunSettings {
    /// Sleep between passes in continuous mode
    pub interval: Duration,
    /// Sleep after a failed pass
    pub recovery_interval: Duration,
    /// Pause after each site request
    pub request_delay: Duration,
}

impl From<&ScrapingConfig> for RunSettings {
    fn from(config: &ScrapingConfig) -> Self {
        Self {
            interval: config.interval(),
            recovery_interval: config.recovery_interval(),
            request_delay: config.request_delay(),
        }
    }
}

/// Outcome of one pass
#[derive(Debug, Clone, Default)]
pub struct PassReport {
    pub fetched: usize,
    pub matched: usize,
    pub new_listings: Vec<Listing>,
}

pub struct Runner {
    scrapers: Vec<Box<dyn ScraperTrait>>,
    criteria: SearchCriteria,
    store: SeenStore,
    dispatcher: Dispatcher,
    audit: AuditLog,
    settings: RunSettings,
}

impl Runner {
    pub fn new(
        scrapers: Vec<Box<dyn ScraperTrait>>,
        criteria: SearchCriteria,
        store: SeenStore,
        dispatcher: Dispatcher,
        audit: AuditLog,
        settings: RunSettings,
    ) -> Self {
        Self {
            scrapers,
            criteria,
            store,
            dispatcher,
            audit,
            settings,
        }
    }

    /// Wire up the real sites, channels and seen-set from the config
    pub async fn from_config(config: &Config) -> Result<Self> {
        let scrapers = scrapers::build_scrapers(config)?;
        let client = scrapers::http::build_client(&config.scraping)?;
        let dispatcher = Dispatcher::from_config(&config.notification, client);
        let store = SeenStore::load(
            &config.storage.seen_file,
            config.storage.max_seen_entries,
        )
        .await;

        info!(
            sites = scrapers.len(),
            channels = ?dispatcher.channel_names(),
            seen = store.len(),
            "Runner ready"
        );

        Ok(Self::new(
            scrapers,
            config.search_criteria.clone(),
            store,
            dispatcher,
            AuditLog::new(&config.storage.audit_dir),
            RunSettings::from(&config.scraping),
        ))
    }

    #[cfg(test)]
    pub fn store(&self) -> &SeenStore {
        &self.store
    }

    async fn fetch_all(&self) -> Vec<Listing> {
        let mut all = Vec::new();
        for city in &self.criteria.cities {
            info!(city = %city, "Scraping city");
            for scraper in &self.scrapers {
                let listings = scraper.scrape(city).await;
                debug!(source = %scraper.source(), city = %city, count = listings.len(), "Site done");
                all.extend(listings);
                tokio::time::sleep(self.settings.request_delay).await;
            }
        }
        all
    }

    /// Run a single pass and return what was new.
    ///
    /// Only a failure to save the seen-set fails the pass; by then the
    /// notifications have already gone out.
    pub async fn run_once(&mut self) -> Result<PassReport, PassError> {
        info!("Starting scraping pass");

        let fetched = self.fetch_all().await;
        let matched: Vec<Listing> = fetched
            .iter()
            .filter(|listing| matcher::matches(listing, &self.criteria))
            .cloned()
            .collect();

        let new_listings: Vec<Listing> = matched
            .iter()
            .filter(|listing| self.store.is_new(listing))
            .cloned()
            .collect();

        let report = PassReport {
            fetched: fetched.len(),
            matched: matched.len(),
            new_listings,
        };

        if report.new_listings.is_empty() {
            info!(
                fetched = report.fetched,
                matched = report.matched,
                "No new listings found"
            );
            return Ok(report);
        }

        info!(
            fetched = report.fetched,
            matched = report.matched,
            new = report.new_listings.len(),
            "New listings found"
        );

        self.dispatcher.notify(&report.new_listings).await;

        let persisted = self.store.persist_with_retry().await;

        match self.audit.record(&report.new_listings).await {
            Ok(path) => info!(path = %path.display(), "Wrote audit file"),
            Err(e) => error!(error = %e, "Could not write audit file"),
        }

        match persisted {
            Ok(()) => Ok(report),
            Err(source) => Err(PassError::Persist {
                notified: report.new_listings.len(),
                source,
            }),
        }
    }

    /// Repeat passes until `shutdown` is cancelled.
    ///
    /// Cancellation is honoured between passes only. A pass that fails or
    /// panics is followed by the recovery interval instead of the normal one.
    pub async fn run_continuous(&mut self, shutdown: CancellationToken) {
        info!(
            interval_secs = self.settings.interval.as_secs(),
            "Starting continuous scraping"
        );

        loop {
            if shutdown.is_cancelled() {
                break;
            }

            let outcome = AssertUnwindSafe(self.run_once()).catch_unwind().await;
            let wait = match outcome {
                Ok(Ok(_)) => self.settings.interval,
                Ok(Err(e)) => {
                    error!(kind = e.kind(), error = %e, "Pass failed");
                    self.settings.recovery_interval
                }
                Err(panic) => {
                    error!(kind = "panic", error = %panic_message(&panic), "Pass aborted");
                    self.settings.recovery_interval
                }
            };

            info!(wait_secs = wait.as_secs(), "Waiting for next pass");
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(wait) => {}
            }
        }

        warn!("Scraping stopped");
    }
}

fn panic_message(panic: &Box<dyn Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
