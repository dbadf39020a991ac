//! Data models for scraped fund reports.
//!
//! This module defines the core data structures used throughout the application:
//! - [`FundId`]: The identifier used both in the report URL and as the document key
//! - [`RawPage`]: A fetched report page, discarded once parsed
//! - [`Cell`]: A normalized scalar taken from one table cell
//! - [`RowRecord`] / [`TableRecord`]: Flattened key/value pairs of one row or table
//! - [`Fund`]: The assembled document persisted once per successful scrape
//!
//! The serialized field names (`_id`, `URL`, `Name`) match the document shape
//! the fund database has always used, hence the serde renames.

use crate::errors::ScrapeError;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use tracing::warn;

/// Keys owned by the [`Fund`] identity fields. Table keys never overwrite them.
pub const RESERVED_KEYS: [&str; 3] = ["_id", "URL", "Name"];

/// Largest integer an `f64` holds exactly (2^53).
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Identifier of a fund, used as the request path segment and storage key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct FundId(String);

impl FundId {
    /// Build an identifier, rejecting blank input.
    pub fn new(raw: impl Into<String>) -> Result<Self, ScrapeError> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ScrapeError::MissingFundId);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<u64> for FundId {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for FundId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The fetched markup of one fund's report page.
#[derive(Debug)]
pub struct RawPage {
    /// The URL the page was requested from.
    pub url: String,
    /// The raw HTML body.
    pub html: String,
}

/// A scalar produced by normalizing the text of one table cell.
///
/// `Absent` stands for the `--` placeholder the report uses for missing data
/// and serializes as `null`.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Number(f64),
    Text(String),
    Absent,
}

impl Cell {
    pub fn is_absent(&self) -> bool {
        matches!(self, Cell::Absent)
    }

    /// Render the cell the way it appears when used as part of a key.
    pub fn to_key(&self) -> Option<String> {
        match self {
            Cell::Absent => None,
            other => Some(other.to_string()),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // f64's Display already drops a zero fraction ("2019", not "2019.0")
            Cell::Number(n) => write!(f, "{n}"),
            Cell::Text(s) => f.write_str(s),
            Cell::Absent => f.write_str("null"),
        }
    }
}

impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Cell::Number(n) if n.fract() == 0.0 && n.abs() <= MAX_EXACT_INTEGER => {
                serializer.serialize_i64(*n as i64)
            }
            Cell::Number(n) => serializer.serialize_f64(*n),
            Cell::Text(s) => serializer.serialize_str(s),
            Cell::Absent => serializer.serialize_none(),
        }
    }
}

/// Key/value pairs produced from one reconstructed table row, in column order.
pub type RowRecord = Vec<(String, Cell)>;

/// All key/value pairs of one table after post-processing.
pub type TableRecord = BTreeMap<String, Cell>;

/// One fund's assembled report.
///
/// Constructed once per successful scrape and never mutated after it is
/// handed to a store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fund {
    /// The fund identifier, also the document key.
    #[serde(rename = "_id")]
    pub id: FundId,
    /// The report page the record was scraped from.
    #[serde(rename = "URL")]
    pub url: String,
    /// The fund's display name.
    #[serde(rename = "Name")]
    pub name: String,
    /// Every table key/value pair, merged into one flat mapping.
    #[serde(flatten)]
    pub fields: BTreeMap<String, Cell>,
}

impl Fund {
    pub fn new(id: FundId, url: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id,
            url: url.into(),
            name: name.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Merge a table's pairs into the top level of the record.
    ///
    /// Later tables overwrite earlier ones on a shared key. Keys that would
    /// shadow the identity fields are dropped.
    pub fn merge(&mut self, table: TableRecord) {
        for (key, value) in table {
            if RESERVED_KEYS.contains(&key.as_str()) {
                warn!(fund_id = %self.id, %key, "Dropping table key that collides with an identity field");
                continue;
            }
            self.fields.insert(key, value);
        }
    }
}
