//! Error types for the scrape pipeline and the document stores.

use crate::models::FundId;
use thiserror::Error;

/// Failure of one fund's pipeline, or of the range input before any work starts.
#[derive(Error, Debug)]
pub enum ScrapeError {
    #[error("no fund id supplied")]
    MissingFundId,

    #[error("missing first and/or last parameters")]
    MissingRange,

    #[error("invalid range: last ({last}) is before first ({first})")]
    InvalidRange { first: u64, last: u64 },

    #[error("request for fund {fund_id} failed: {source}")]
    Transport {
        fund_id: FundId,
        #[source]
        source: reqwest::Error,
    },

    #[error("fund {fund_id}: statusCode: {status}")]
    Status {
        fund_id: FundId,
        status: reqwest::StatusCode,
    },

    #[error("Non-existent fund: {0}")]
    NotFound(FundId),

    #[error("malformed {table:?} table: {reason}")]
    Parse { table: String, reason: String },

    #[error("[insert:{fund_id}] {source}")]
    Persistence {
        fund_id: FundId,
        #[source]
        source: StoreError,
    },
}

/// Failure talking to the document store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("store returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid store url: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl StoreError {
    /// Whether repeating the same request could succeed.
    pub fn should_retry(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::Status { status, .. } => {
                *status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
            }
            Self::Io(_) | Self::Json(_) | Self::InvalidUrl(_) => false,
        }
    }
}
