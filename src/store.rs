//! Seen-set persistence.
//!
//! Fingerprints of every listing that has already been notified, stored as
//! a JSON array of strings in insertion order:
//!
//! ```text
//! ["e2fc714c4727ee9395f324cd2e7f331f", "0cc175b9c0f1b6a831c399e269772661", ...]
//! ```
//!
//! Loading is forgiving (a broken file is moved aside and the set starts
//! empty). Persisting is not: a lost seen-set means duplicate notifications.

use crate::config::backup_file;
use crate::error::StoreError;
use crate::models::Listing;
use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info, warn};

const PERSIST_ATTEMPTS: u32 = 3;
const PERSIST_BACKOFF: Duration = Duration::from_millis(200);

pub struct SeenStore {
    path: PathBuf,
    seen: HashSet<String>,
    order: VecDeque<String>,
    capacity: Option<usize>,
    /// A broken file is still in place and must be moved aside before the
    /// first persist overwrites it
    unbacked: bool,
}

impl SeenStore {
    /// Empty store that will persist to `path`. A capacity of zero means unbounded.
    pub fn new(path: impl Into<PathBuf>, capacity: Option<usize>) -> Self {
        let capacity = match capacity {
            Some(0) => {
                warn!("max_seen_entries is 0, keeping every fingerprint");
                None
            }
            other => other,
        };
        Self {
            path: path.into(),
            seen: HashSet::new(),
            order: VecDeque::new(),
            capacity,
            unbacked: false,
        }
    }

    /// Load the seen-set from disk.
    ///
    /// Missing file gives an empty set. An unreadable or malformed file is
    /// renamed to `<file>.backup_YYYYMMDD_HHMMSS` and the set starts empty.
    pub async fn load(path: impl Into<PathBuf>, capacity: Option<usize>) -> Self {
        let mut store = Self::new(path, capacity);

        let raw = match tokio::fs::read(&store.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %store.path.display(), "No seen-set found, starting empty");
                return store;
            }
            Err(e) => {
                error!(path = %store.path.display(), error = %e, "Could not read seen-set");
                store.recover().await;
                return store;
            }
        };

        match serde_json::from_slice::<Vec<String>>(&raw) {
            Ok(fingerprints) => {
                for fp in fingerprints {
                    store.insert(fp);
                }
                info!(path = %store.path.display(), count = store.len(), "Loaded seen-set");
            }
            Err(e) => {
                error!(path = %store.path.display(), error = %e, "Malformed seen-set");
                store.recover().await;
            }
        }

        store
    }

    async fn recover(&mut self) {
        match backup_file(&self.path).await {
            Ok(backup) => info!(
                backup = %backup.display(),
                "Backed up broken seen-set, starting with an empty set"
            ),
            Err(e) => {
                warn!(
                    error = %e,
                    "Could not back up broken seen-set, starting with an empty set"
                );
                self.unbacked = true;
            }
        }
    }

    /// Check-and-mark: true the first time a listing's fingerprint is seen.
    pub fn is_new(&mut self, listing: &Listing) -> bool {
        self.insert(listing.fingerprint())
    }

    #[cfg(test)]
    pub fn contains(&self, fingerprint: &str) -> bool {
        self.seen.contains(fingerprint)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    #[cfg(test)]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn insert(&mut self, fingerprint: String) -> bool {
        if !self.seen.insert(fingerprint.clone()) {
            return false;
        }
        self.order.push_back(fingerprint);

        if let Some(capacity) = self.capacity {
            while self.order.len() > capacity {
                if let Some(oldest) = self.order.pop_front() {
                    self.seen.remove(&oldest);
                    debug!(fingerprint = %oldest, "Evicted oldest fingerprint");
                }
            }
        }
        true
    }

    /// Overwrite the file with the full current set (temp file + rename).
    ///
    /// A broken file that could not be moved aside at load time is backed up
    /// first; while that keeps failing, nothing is written.
    pub async fn persist(&mut self) -> Result<(), StoreError> {
        if self.unbacked {
            match backup_file(&self.path).await {
                Ok(backup) => info!(backup = %backup.display(), "Backed up broken seen-set"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(source) => {
                    return Err(StoreError::Io {
                        path: self.path.clone(),
                        source,
                    })
                }
            }
            self.unbacked = false;
        }

        let io_err = |source: std::io::Error| StoreError::Io {
            path: self.path.clone(),
            source,
        };

        let fingerprints: Vec<&String> = self.order.iter().collect();
        let bytes = serde_json::to_vec_pretty(&fingerprints)?;

        let mut tmp = self.path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        let written = match write_file(&tmp, &bytes).await {
            Ok(()) => tokio::fs::rename(&tmp, &self.path).await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(io_err(e));
        }
        debug!(path = %self.path.display(), count = self.len(), "Persisted seen-set");
        Ok(())
    }

    /// `persist` with a few retries before giving up
    pub async fn persist_with_retry(&mut self) -> Result<(), StoreError> {
        let mut attempt = 1;
        loop {
            match self.persist().await {
                Ok(()) => return Ok(()),
                Err(e) if attempt < PERSIST_ATTEMPTS => {
                    warn!(attempt, error = %e, "Persisting seen-set failed, retrying");
                    tokio::time::sleep(PERSIST_BACKOFF * attempt).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

async fn write_file(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = tokio::fs::File::create(path).await?;
    file.write_all(bytes).await?;
    file.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::sample_listing;
    use tempfile::TempDir;

    #[tokio::test]
    async fn is_new_marks_listing_as_seen() {
        let tmp = TempDir::new().unwrap();
        let mut store = SeenStore::load(tmp.path().join("seen.json"), None).await;
        let listing = sample_listing("Gartenwohnung", "900");

        assert!(store.is_new(&listing));
        assert!(!store.is_new(&listing));
        assert!(store.contains(&listing.fingerprint()));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn missing_file_loads_empty() {
        let tmp = TempDir::new().unwrap();
        let store = SeenStore::load(tmp.path().join("seen.json"), None).await;
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn persisted_set_survives_reload() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("seen.json");
        let a = sample_listing("Gartenwohnung", "900");
        let b = sample_listing("Altbau mit Garten", "1.100 €");

        let mut store = SeenStore::load(&path, None).await;
        store.is_new(&a);
        store.is_new(&b);
        store.persist().await.unwrap();

        let raw: Vec<String> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw, vec![a.fingerprint(), b.fingerprint()]);

        let mut reloaded = SeenStore::load(&path, None).await;
        assert_eq!(reloaded.len(), 2);
        assert!(!reloaded.is_new(&a));
        assert!(!reloaded.is_new(&b));
    }

    #[tokio::test]
    async fn corrupt_file_is_backed_up_and_set_starts_empty() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("seen_apartments.json");
        std::fs::write(&path, "[\"abc\", ").unwrap();

        let store = SeenStore::load(&path, None).await;
        assert!(store.is_empty());
        assert!(!path.exists());

        let backups: Vec<_> = std::fs::read_dir(tmp.path())
            .unwrap()
            .map(|e| e.unwrap().path())
            .filter(|p| {
                p.file_name()
                    .unwrap()
                    .to_string_lossy()
                    .starts_with("seen_apartments.json.backup_")
            })
            .collect();
        assert_eq!(backups.len(), 1);
        assert_eq!(std::fs::read_to_string(&backups[0]).unwrap(), "[\"abc\", ");
    }

    #[tokio::test]
    async fn wrong_shape_counts_as_corrupt() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("seen.json");
        std::fs::write(&path, r#"{"fingerprints": []}"#).unwrap();

        let store = SeenStore::load(&path, None).await;
        assert!(store.is_empty());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn capacity_evicts_oldest() {
        let tmp = TempDir::new().unwrap();
        let mut store = SeenStore::new(tmp.path().join("seen.json"), Some(2));
        let a = sample_listing("A", "1");
        let b = sample_listing("B", "2");
        let c = sample_listing("C", "3");

        assert!(store.is_new(&a));
        assert!(store.is_new(&b));
        assert!(store.is_new(&c));
        assert_eq!(store.len(), 2);
        assert!(!store.contains(&a.fingerprint()));
        assert!(store.contains(&c.fingerprint()));

        store.persist().await.unwrap();
        let reloaded = SeenStore::load(store.path(), Some(2)).await;
        assert_eq!(reloaded.len(), 2);
        assert!(reloaded.contains(&b.fingerprint()));
    }

    #[tokio::test]
    async fn persist_error_is_reported() {
        let tmp = TempDir::new().unwrap();
        let blocker = tmp.path().join("not-a-dir");
        std::fs::write(&blocker, "").unwrap();

        let mut store = SeenStore::new(blocker.join("seen.json"), None);
        store.is_new(&sample_listing("A", "1"));

        assert!(matches!(store.persist().await, Err(StoreError::Io { .. })));
        assert!(store.persist_with_retry().await.is_err());
    }

    #[tokio::test]
    async fn zero_capacity_means_unbounded() {
        let tmp = TempDir::new().unwrap();
        let mut store = SeenStore::new(tmp.path().join("seen.json"), Some(0));
        let a = sample_listing("A", "1");

        assert!(store.is_new(&a));
        assert!(!store.is_new(&a));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn broken_file_left_in_place_is_backed_up_before_overwrite() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("seen_apartments.json");
        std::fs::write(&path, "not json").unwrap();

        let mut store = SeenStore::new(&path, None);
        store.unbacked = true;
        store.is_new(&sample_listing("A", "1"));
        store.persist().await.unwrap();

        let names: Vec<String> = std::fs::read_dir(tmp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        let backup = names
            .iter()
            .find(|n| n.starts_with("seen_apartments.json.backup_"))
            .expect("backup written");
        assert_eq!(
            std::fs::read_to_string(tmp.path().join(backup)).unwrap(),
            "not json"
        );
        let persisted: Vec<String> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(persisted.len(), 1);
        assert!(!store.unbacked);
    }

    #[tokio::test]
    async fn failed_persist_leaves_no_temp_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("seen.json");
        // A non-empty directory at the target makes the rename fail
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("inner"), "").unwrap();

        let mut store = SeenStore::new(&path, None);
        store.is_new(&sample_listing("A", "1"));
        assert!(store.persist().await.is_err());
        assert!(!tmp.path().join("seen.json.tmp").exists());
    }
}
