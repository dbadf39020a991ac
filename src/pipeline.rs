//! Per-fund fetch → parse → store pipeline and the range orchestrator.
//!
//! Every fund runs through its own pipeline with no state shared between
//! funds apart from the HTTP client and the store. A failure is logged and
//! counted; it never stops the other funds.

use crate::errors::ScrapeError;
use crate::models::{Fund, FundId};
use crate::outputs::DocumentStore;
use crate::scrapers::fetch::ReportClient;
use crate::scrapers::fund_report::parse_report;
use futures::stream::{self, StreamExt};
use std::future;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// Outcome of a run over a range of fund ids.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Funds scraped and stored.
    pub inserted: Vec<FundId>,
    /// Funds whose pipeline failed at any step.
    pub failed: Vec<FundId>,
    /// Funds never started because the run was cancelled.
    pub skipped: usize,
}

/// Fetch and parse one fund.
#[instrument(level = "info", skip_all, fields(fund_id = %fund_id))]
pub async fn scrape_fund(client: &ReportClient, fund_id: &FundId) -> Result<Fund, ScrapeError> {
    let page = client.fetch(fund_id).await?;
    let fund = parse_report(fund_id, &page)?;
    if tracing::enabled!(tracing::Level::DEBUG) {
        match serde_json::to_string_pretty(&fund) {
            Ok(json) => debug!(fund = %json, "Assembled fund"),
            Err(e) => debug!(error = %e, "Fund record not printable"),
        }
    }
    Ok(fund)
}

/// Scrape one fund and hand it to the store.
pub async fn process_fund<S: DocumentStore>(
    client: &ReportClient,
    store: &S,
    fund_id: &FundId,
) -> Result<(), ScrapeError> {
    let fund = scrape_fund(client, fund_id).await?;
    let receipt = store
        .insert(&fund)
        .await
        .map_err(|source| ScrapeError::Persistence {
            fund_id: fund_id.clone(),
            source,
        })?;
    info!(fund_id = %fund_id, "Inserted the fund");
    debug!(?receipt, "Store receipt");
    Ok(())
}

/// Run every fund id through its pipeline, at most `concurrency` at a time.
///
/// Once `cancel` fires no new fund is started; funds already in flight
/// finish normally. Completion order is not the id order.
#[instrument(level = "info", skip_all, fields(total = fund_ids.len(), concurrency = concurrency))]
pub async fn run<S: DocumentStore>(
    client: &ReportClient,
    store: &S,
    fund_ids: Vec<FundId>,
    concurrency: usize,
    cancel: &CancellationToken,
) -> RunSummary {
    let total = fund_ids.len();
    let outcomes: Vec<(FundId, Result<(), ScrapeError>)> = stream::iter(fund_ids)
        .take_while(|_| future::ready(!cancel.is_cancelled()))
        .map(|fund_id| async move {
            let result = process_fund(client, store, &fund_id).await;
            if let Err(e) = &result {
                error!(fund_id = %fund_id, error = %e, "Fund failed");
            }
            (fund_id, result)
        })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    let mut summary = RunSummary {
        skipped: total - outcomes.len(),
        ..RunSummary::default()
    };
    for (fund_id, result) in outcomes {
        match result {
            Ok(()) => summary.inserted.push(fund_id),
            Err(_) => summary.failed.push(fund_id),
        }
    }
    summary.inserted.sort();
    summary.failed.sort();

    if summary.skipped > 0 {
        warn!(skipped = summary.skipped, "Run cancelled before every fund was started");
    }
    summary
}
