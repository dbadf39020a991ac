//! Fund report page parsing and record assembly.
//!
//! Turns one fetched [`RawPage`] into a [`Fund`]: repair the markup, parse
//! it, bail out on the "fund not found" marker, then merge every small
//! table into the record.

use crate::errors::ScrapeError;
use crate::models::{Fund, FundId, RawPage};
use crate::scrapers::repair::repair_markup;
use crate::scrapers::tables::extract_table;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use tracing::{debug, instrument};

/// Present only on the page served for an unknown fund id.
static NOT_FOUND: Lazy<Selector> = Lazy::new(|| Selector::parse(".red").unwrap());
static FUND_NAME: Lazy<Selector> = Lazy::new(|| Selector::parse(".YMWCoyFull").unwrap());
static SMALL_TABLE: Lazy<Selector> = Lazy::new(|| Selector::parse(".YMWTableSmall").unwrap());

/// Fail with [`ScrapeError::NotFound`] when the page marks the fund as unknown.
pub fn ensure_fund_exists(document: &Html, fund_id: &FundId) -> Result<(), ScrapeError> {
    if document.select(&NOT_FOUND).next().is_some() {
        return Err(ScrapeError::NotFound(fund_id.clone()));
    }
    Ok(())
}

/// The fund's display name, or an empty string when the page has none.
pub fn fund_name(document: &Html) -> String {
    document
        .select(&FUND_NAME)
        .flat_map(|el| el.text())
        .collect::<String>()
        .trim()
        .to_string()
}

/// Build the fund record from a fetched page.
#[instrument(level = "info", skip_all, fields(fund_id = %fund_id))]
pub fn parse_report(fund_id: &FundId, page: &RawPage) -> Result<Fund, ScrapeError> {
    let repaired = repair_markup(&page.html);
    let document = Html::parse_document(&repaired);
    ensure_fund_exists(&document, fund_id)?;

    let mut fund = Fund::new(fund_id.clone(), page.url.as_str(), fund_name(&document));
    for table in document.select(&SMALL_TABLE) {
        if let Some(extracted) = extract_table(table)? {
            debug!(table = %extracted.name, keys = extracted.record.len(), "Merging table");
            fund.merge(extracted.record);
        }
    }

    debug!(fields = fund.fields.len(), name = %fund.name, "Assembled fund record");
    Ok(fund)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Cell;
    use crate::scrapers::repair::DEFECT_MARKER;

    fn page(html: &str) -> RawPage {
        RawPage {
            url: "http://www.morningstar.com.au/Fund/FundReportPrint/12345".to_string(),
            html: html.to_string(),
        }
    }

    fn text(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    const QUICK_STATS_PAGE: &str = r#"<html><body>
        <div class="YMWCoyFull">Example Growth Fund</div>
        <table class="YMWTableSmall">
          <tr><td>Quick Stats</td></tr>
          <tr><td>as of 2021-06-30</td></tr>
          <tr><td>NAV   123.45</td></tr>
        </table>
        </body></html>"#;

    #[test]
    fn test_quick_stats_end_to_end() {
        let id = FundId::from(12345);
        let fund = parse_report(&id, &page(QUICK_STATS_PAGE)).unwrap();

        let value = serde_json::to_value(&fund).unwrap();
        assert_eq!(value["_id"], "12345");
        assert_eq!(value["URL"], "http://www.morningstar.com.au/Fund/FundReportPrint/12345");
        assert_eq!(value["Name"], "Example Growth Fund");
        assert_eq!(value["As at"], "2021-06-30");
        assert_eq!(value["NAV"], "123.45");
        assert_eq!(value.as_object().unwrap().len(), 5);
    }

    #[test]
    fn test_extraction_is_repeatable() {
        let id = FundId::from(12345);
        let first = serde_json::to_string(&parse_report(&id, &page(QUICK_STATS_PAGE)).unwrap()).unwrap();
        let second = serde_json::to_string(&parse_report(&id, &page(QUICK_STATS_PAGE)).unwrap()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_not_found_marker() {
        let html = r#"<html><body><span class="red">Fund not found</span>
            <table class="YMWTableSmall"><tr><td>Fees</td></tr></table></body></html>"#;
        let err = parse_report(&FundId::from(999), &page(html)).unwrap_err();
        match err {
            ScrapeError::NotFound(id) => assert_eq!(id.as_str(), "999"),
            other => panic!("Expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_performance_table_never_merged() {
        let html = r#"<html><body>
            <table class="YMWTableSmall">
              <tr><td>Performance</td></tr>
              <tr><td>Total Return</td><td>9.9</td></tr>
            </table>
            <table class="YMWTableSmall">
              <tr><td>Fees</td></tr>
              <tr><td>Management Fee (p.a.)</td><td>1.20%</td></tr>
            </table>
            </body></html>"#;
        let fund = parse_report(&FundId::from(1), &page(html)).unwrap();
        assert!(!fund.fields.contains_key("Total Return"));
        assert!(!fund.fields.contains_key("Performance"));
        assert_eq!(fund.fields["Management Fee"], Cell::Number(1.2));
    }

    #[test]
    fn test_star_rating_and_headings() {
        let html = r#"<html><body>
            <table class="YMWTableSmall">
              <tr><td>Risk Analysis</td></tr>
              <tr><td></td><td>3 Yr</td><td>5 Yr</td></tr>
              <tr><td>Star Rating</td><td><img src="/Content/images/4starscropped.gif" alt="4" /></td><td>--</td></tr>
              <tr><td>Std Dev</td><td>10.5</td><td>11.25</td></tr>
            </table>
            </body></html>"#;
        let fund = parse_report(&FundId::from(2), &page(html)).unwrap();
        assert_eq!(fund.fields["Star Rating 3 Yr"], Cell::Number(4.0));
        assert!(!fund.fields.contains_key("Star Rating 5 Yr"));
        assert_eq!(fund.fields["Std Dev 3 Yr"], Cell::Number(10.5));
        assert_eq!(fund.fields["Std Dev 5 Yr"], Cell::Number(11.25));
    }

    #[test]
    fn test_current_investment_style_page() {
        let html = "<html><body>\
            <table class=\"YMWTableSmall\">\
              <tr><td>Current Investment Style</td></tr>\
              <tr><td>as at 31/05/2021</td></tr>\
              <tr><td>style box</td></tr>\
              <tr><td>Size - Large&nbsp;&nbsp;Style - Value</td></tr>\
            </table>\
            </body></html>";
        let fund = parse_report(&FundId::from(3), &page(html)).unwrap();
        assert_eq!(fund.fields["As at"], text("31/05/2021"));
        assert_eq!(fund.fields["Market Cap"], text("Large"));
        assert_eq!(fund.fields["Investment Style"], text("Value"));
        assert_eq!(fund.fields.len(), 3);
    }

    #[test]
    fn test_current_investment_style_with_style_box_image() {
        // row 1 holds the style box image; later rows are footnotes
        let html = "<html><body>\
            <table class=\"YMWTableSmall\">\
              <tr><td>Current Investment Style</td></tr>\
              <tr><td>as at 31/05/2021</td></tr>\
              <tr><td><img src=\"/Content/images/stylebox.gif\" /></td></tr>\
              <tr><td>Size - Large&nbsp;&nbsp;Style - Growth</td></tr>\
              <tr><td>Style box is based on holdings</td></tr>\
            </table>\
            </body></html>";
        let fund = parse_report(&FundId::from(5), &page(html)).unwrap();
        assert_eq!(fund.fields.get("Market Cap"), Some(&text("Large")));
        assert_eq!(fund.fields.get("Investment Style"), Some(&text("Growth")));
        assert_eq!(fund.fields.len(), 3);
    }

    #[test]
    fn test_asset_allocation_with_row_defect() {
        // the splice drops the 75 bytes ahead of "<tr> ", stray </tr> included
        let filler = "x".repeat(58);
        let html = format!(
            "<html><body><table class=\"YMWTableSmall\">\
             <tr><td>Asset Allocation</td></tr>\
             <tr><td>as at 30/04/2021</td></tr>\
             <tr><td class=\"borderbottom YMWpadleft\">Domestic Equity</td><td>45.5</td>\
             <!--{filler}--></tr></tr><tr> {DEFECT_MARKER}<td>20</td></tr>\
             </table></body></html>"
        );
        let fund = parse_report(&FundId::from(4), &page(&html)).unwrap();
        assert_eq!(fund.fields["As at"], text("30/04/2021"));
        assert_eq!(fund.fields["Domestic Equity"], Cell::Number(45.5));
        assert_eq!(fund.fields["International Equity"], Cell::Number(20.0));
    }
}
