//! Document stores that receive the assembled fund records.
//!
//! # Submodules
//!
//! - [`couch`]: CouchDB / Cloudant database over its HTTP API
//! - [`json`]: One JSON file per fund in a local directory
//! - [`retry`]: Backoff wrapper around any store
//!
//! Every store is keyed by fund id and supports the same lifecycle: destroy
//! the database, create it, then insert documents one at a time. Inserts of
//! different funds are independent and may run concurrently.

use crate::errors::StoreError;
use crate::models::Fund;
use serde::Deserialize;

pub mod couch;
pub mod json;
pub mod retry;

/// What a store reports back after accepting a document.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InsertReceipt {
    /// The stored document's key.
    pub id: String,
    /// The revision assigned by the store, when it tracks revisions.
    pub rev: Option<String>,
}

/// A destination for fund documents.
pub trait DocumentStore {
    /// Remove the database and everything in it. Missing databases are fine.
    async fn destroy(&self) -> Result<(), StoreError>;

    /// Create the database. An existing database is left as it is.
    async fn create(&self) -> Result<(), StoreError>;

    /// Insert one fund, replacing any earlier document with the same id.
    async fn insert(&self, fund: &Fund) -> Result<InsertReceipt, StoreError>;
}
