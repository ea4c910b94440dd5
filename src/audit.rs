use crate::models::Listing;
use anyhow::{Context, Result};
use chrono::Local;
use std::path::PathBuf;

/// Writes one `new_apartments_YYYYMMDD_HHMMSS.json` per pass that found something
pub struct AuditLog {
    dir: PathBuf,
}

impl AuditLog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub async fn record(&self, listings: &[Listing]) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("Failed to create {}", self.dir.display()))?;

        let path = self.dir.join(format!(
            "new_apartments_{}.json",
            Local::now().format("%Y%m%d_%H%M%S")
        ));
        let json = serde_json::to_string_pretty(listings)?;
        tokio::fs::write(&path, json)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }
}
