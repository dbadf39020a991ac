//! Fund report page fetcher.
//!
//! One GET per fund against `{base_url}/{fund_id}`. Anything but a `200`
//! is a failure; retrying is left to whoever drives the fetcher.

use crate::errors::ScrapeError;
use crate::models::{FundId, RawPage};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{info, instrument};
use url::Url;

/// Print view of the fund report, one page per fund id.
pub const DEFAULT_BASE_URL: &str = "http://www.morningstar.com.au/Fund/FundReportPrint";

const USER_AGENT: &str = concat!("fund_report_scrape/", env!("CARGO_PKG_VERSION"));

/// Build the HTTP client shared by the fetcher and the CouchDB store.
pub fn build_http_client() -> reqwest::Result<Client> {
    Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .timeout(Duration::from_secs(30))
        .user_agent(USER_AGENT)
        .build()
}

/// Fetches report pages relative to a fixed base path.
#[derive(Debug, Clone)]
pub struct ReportClient {
    http: Client,
    base_url: Url,
}

impl ReportClient {
    pub fn new(http: Client, base_url: &str) -> Result<Self, url::ParseError> {
        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(url::ParseError::RelativeUrlWithCannotBeABaseBase);
        }
        Ok(Self { http, base_url })
    }

    /// The report URL for one fund: the base path with the id appended.
    pub fn report_url(&self, fund_id: &FundId) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(fund_id.as_str());
        }
        url
    }

    /// Fetch the raw report markup for one fund.
    #[instrument(level = "info", skip_all, fields(fund_id = %fund_id))]
    pub async fn fetch(&self, fund_id: &FundId) -> Result<RawPage, ScrapeError> {
        let url = self.report_url(fund_id);
        let transport = |source: reqwest::Error| ScrapeError::Transport {
            fund_id: fund_id.clone(),
            source,
        };

        let response = self.http.get(url.clone()).send().await.map_err(transport)?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(ScrapeError::Status {
                fund_id: fund_id.clone(),
                status,
            });
        }

        let html = response.text().await.map_err(transport)?;
        info!(bytes = html.len(), %url, "Fetched fund report");
        Ok(RawPage {
            url: url.to_string(),
            html,
        })
    }
}
