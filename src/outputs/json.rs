//! JSON file store.
//!
//! Writes each fund as a pretty-printed document into a single directory:
//! ```text
//! json_output_dir/
//! ├── 12345.json
//! ├── 12346.json
//! └── 12347.json
//! ```
//!
//! Destroying the store removes the directory; creating it makes sure the
//! directory exists and is writable.

use crate::errors::StoreError;
use crate::models::Fund;
use crate::outputs::{DocumentStore, InsertReceipt};
use crate::utils::{ensure_writable_dir, slugify_id};
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::fs;
use tracing::{error, info, instrument};

#[derive(Debug, Clone)]
pub struct JsonDirStore {
    dir: PathBuf,
}

impl JsonDirStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the document for one fund id.
    pub fn document_path(&self, fund_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", slugify_id(fund_id)))
    }
}

impl DocumentStore for JsonDirStore {
    #[instrument(level = "info", skip_all, fields(dir = %self.dir.display()))]
    async fn destroy(&self) -> Result<(), StoreError> {
        match fs::remove_dir_all(&self.dir).await {
            Ok(()) => {
                info!("Removed JSON output directory");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => {
                error!(error = %e, "Failed to remove JSON output directory");
                Err(e.into())
            }
        }
    }

    #[instrument(level = "info", skip_all, fields(dir = %self.dir.display()))]
    async fn create(&self) -> Result<(), StoreError> {
        ensure_writable_dir(&self.dir).await?;
        Ok(())
    }

    #[instrument(level = "debug", skip_all, fields(fund_id = %fund.id))]
    async fn insert(&self, fund: &Fund) -> Result<InsertReceipt, StoreError> {
        let json = serde_json::to_string_pretty(fund)?;
        let path = self.document_path(fund.id.as_str());
        fs::write(&path, json).await?;
        info!(path = %path.display(), "Wrote fund document");
        Ok(InsertReceipt {
            id: fund.id.to_string(),
            rev: None,
        })
    }
}
