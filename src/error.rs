use std::path::PathBuf;
use thiserror::Error;

/// Failure reading or writing the seen-set file
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A pass that did not complete its bookkeeping
#[derive(Error, Debug)]
pub enum PassError {
    /// Notifications went out but the seen-set could not be saved, so the
    /// same listings will be reported again on the next run.
    #[error("seen-set not persisted after notifying {notified} listings: {source}")]
    Persist {
        notified: usize,
        #[source]
        source: StoreError,
    },
}

impl PassError {
    pub fn kind(&self) -> &'static str {
        match self {
            PassError::Persist { .. } => "persist",
        }
    }
}
