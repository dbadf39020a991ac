//! Per-table corrections applied after rows are flattened.
//!
//! A few tables pack their data into the row label instead of separate
//! cells. [`TableKind`] maps a table name to the correction it needs; every
//! other table passes through untouched.

use crate::errors::ScrapeError;
use crate::models::{Cell, RowRecord};
use once_cell::sync::Lazy;
use regex::Regex;

/// Length of the "as at" prefix in front of a table's date.
const AS_AT_PREFIX_LEN: usize = 5;
/// Length of the "Size - " / "Style -" label in front of each style field.
const STYLE_LABEL_LEN: usize = 7;
/// Separator between the market cap and investment style fields.
const STYLE_SEPARATOR: &str = "  ";

/// Gap between a Quick Stats label and its value inside one cell.
static QUICK_STATS_GAP: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*\n\s*|\s{3,}").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    CurrentInvestmentStyle,
    QuickStats,
    AssetAllocation,
    Plain,
}

impl TableKind {
    pub fn from_name(name: &str) -> Self {
        match name {
            "Current Investment Style" => Self::CurrentInvestmentStyle,
            "Quick Stats" => Self::QuickStats,
            "Asset Allocation" => Self::AssetAllocation,
            _ => Self::Plain,
        }
    }

    pub fn apply(self, table: &str, rows: Vec<RowRecord>) -> Result<Vec<RowRecord>, ScrapeError> {
        match self {
            Self::CurrentInvestmentStyle => current_investment_style(table, rows),
            Self::QuickStats => quick_stats(table, rows),
            Self::AssetAllocation => asset_allocation(table, rows),
            Self::Plain => Ok(rows),
        }
    }
}

fn first_key<'a>(table: &str, row: &'a RowRecord) -> Result<&'a str, ScrapeError> {
    row.first()
        .map(|(key, _)| key.as_str())
        .ok_or_else(|| parse_error(table, "row has no cells"))
}

fn parse_error(table: &str, reason: impl Into<String>) -> ScrapeError {
    ScrapeError::Parse {
        table: table.to_string(),
        reason: reason.into(),
    }
}

/// Drop the first `n` characters and surrounding whitespace.
fn strip_prefix_chars(s: &str, n: usize) -> String {
    s.chars().skip(n).collect::<String>().trim().to_string()
}

/// `"as at 30/06/2021"` becomes `As at → "30/06/2021"`.
fn as_at(table: &str, row: &RowRecord) -> Result<RowRecord, ScrapeError> {
    let key = first_key(table, row)?.trim();
    Ok(vec![(
        "As at".to_string(),
        Cell::Text(strip_prefix_chars(key, AS_AT_PREFIX_LEN)),
    )])
}

fn current_investment_style(table: &str, rows: Vec<RowRecord>) -> Result<Vec<RowRecord>, ScrapeError> {
    let mut fixed = Vec::new();
    for (index, row) in rows.iter().enumerate() {
        match index {
            0 => fixed.push(as_at(table, row)?),
            2 => {
                let key = first_key(table, row)?.replace('\u{a0}', " ");
                let mut fields = key.split(STYLE_SEPARATOR);
                let (Some(size), Some(style)) = (fields.next(), fields.next()) else {
                    return Err(parse_error(table, format!("no style separator in {key:?}")));
                };
                fixed.push(vec![(
                    "Market Cap".to_string(),
                    Cell::Text(strip_prefix_chars(size, STYLE_LABEL_LEN)),
                )]);
                fixed.push(vec![(
                    "Investment Style".to_string(),
                    Cell::Text(strip_prefix_chars(style, STYLE_LABEL_LEN)),
                )]);
            }
            // row 1 is the style box, later rows are footnotes
            _ => {}
        }
    }
    Ok(fixed)
}

fn quick_stats(table: &str, rows: Vec<RowRecord>) -> Result<Vec<RowRecord>, ScrapeError> {
    let mut fixed = Vec::with_capacity(rows.len());
    for (index, row) in rows.into_iter().enumerate() {
        if index == 0 {
            fixed.push(as_at(table, &row)?);
            continue;
        }
        if row.is_empty() {
            fixed.push(row);
            continue;
        }
        let split = {
            let mut parts = QUICK_STATS_GAP.splitn(first_key(table, &row)?, 2);
            match (parts.next(), parts.next()) {
                (Some(label), Some(value)) => Some((label.trim().to_string(), value.trim().to_string())),
                _ => None,
            }
        };
        match split {
            Some((label, value)) => fixed.push(vec![(label, Cell::Text(value))]),
            // label and value already sit in separate cells
            None => fixed.push(row),
        }
    }
    Ok(fixed)
}

fn asset_allocation(table: &str, rows: Vec<RowRecord>) -> Result<Vec<RowRecord>, ScrapeError> {
    let mut rows = rows.into_iter();
    let mut fixed = Vec::new();
    if let Some(first) = rows.next() {
        fixed.push(as_at(table, &first)?);
    }
    fixed.extend(rows);
    Ok(fixed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label_row(key: &str) -> RowRecord {
        vec![(key.to_string(), Cell::Absent)]
    }

    fn keys(rows: &[RowRecord]) -> Vec<&str> {
        rows.iter()
            .flat_map(|row| row.iter().map(|(key, _)| key.as_str()))
            .collect()
    }

    fn text(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    #[test]
    fn test_dispatch_by_name() {
        assert_eq!(TableKind::from_name("Quick Stats"), TableKind::QuickStats);
        assert_eq!(
            TableKind::from_name("Current Investment Style"),
            TableKind::CurrentInvestmentStyle
        );
        assert_eq!(TableKind::from_name("Asset Allocation"), TableKind::AssetAllocation);
        assert_eq!(TableKind::from_name("Fees"), TableKind::Plain);
    }

    #[test]
    fn test_plain_passes_through() {
        let rows = vec![vec![("Entry Fee".to_string(), Cell::Number(0.0))]];
        assert_eq!(TableKind::Plain.apply("Fees", rows.clone()).unwrap(), rows);
    }

    #[test]
    fn test_current_investment_style_values() {
        let rows = vec![
            label_row("as at 31/05/2021"),
            label_row("ignored"),
            label_row("Size - Large\u{a0}\u{a0}Style - Growth"),
            label_row("footnote"),
        ];
        let fixed = TableKind::CurrentInvestmentStyle
            .apply("Current Investment Style", rows)
            .unwrap();
        assert_eq!(fixed.len(), 3);
        assert_eq!(fixed[0][0], ("As at".to_string(), text("31/05/2021")));
        assert_eq!(fixed[1][0], ("Market Cap".to_string(), text("Large")));
        assert_eq!(fixed[2][0], ("Investment Style".to_string(), text("Growth")));
    }

    #[test]
    fn test_current_investment_style_without_separator_is_parse_error() {
        let rows = vec![label_row("as at x"), label_row("y"), label_row("Large Growth")];
        let err = TableKind::CurrentInvestmentStyle
            .apply("Current Investment Style", rows)
            .unwrap_err();
        assert!(matches!(err, ScrapeError::Parse { .. }));
    }

    #[test]
    fn test_quick_stats_splits_label_and_value() {
        let rows = vec![
            label_row("as at 2021-06-30"),
            label_row("NAV   123.45"),
            label_row("Fund Size\n                        1500"),
            vec![("Category".to_string(), text("Growth"))],
        ];
        let fixed = TableKind::QuickStats.apply("Quick Stats", rows).unwrap();
        assert_eq!(fixed[0][0], ("As at".to_string(), text("2021-06-30")));
        assert_eq!(fixed[1][0], ("NAV".to_string(), text("123.45")));
        assert_eq!(fixed[2][0], ("Fund Size".to_string(), text("1500")));
        assert_eq!(fixed[3][0], ("Category".to_string(), text("Growth")));
    }

    #[test]
    fn test_quick_stats_keeps_unlabeled_rows() {
        let rows = vec![label_row("as at 2021-06-30"), vec![], label_row("NAV   1.5")];
        let fixed = TableKind::QuickStats.apply("Quick Stats", rows).unwrap();
        assert_eq!(fixed.len(), 3);
        assert!(fixed[1].is_empty());
        assert_eq!(fixed[2][0], ("NAV".to_string(), text("1.5")));
    }

    #[test]
    fn test_asset_allocation_keeps_rows() {
        let rows = vec![
            label_row("as at 30/04/2021"),
            vec![("Domestic Equity".to_string(), Cell::Number(45.0))],
            vec![("Cash".to_string(), Cell::Number(0.0))],
        ];
        let fixed = TableKind::AssetAllocation.apply("Asset Allocation", rows).unwrap();
        assert_eq!(keys(&fixed), vec!["As at", "Domestic Equity", "Cash"]);
        assert_eq!(fixed[2][0].1, Cell::Number(0.0));
    }

    #[test]
    fn test_empty_tables_stay_empty() {
        assert!(TableKind::QuickStats.apply("Quick Stats", vec![]).unwrap().is_empty());
        assert!(TableKind::AssetAllocation.apply("Asset Allocation", vec![]).unwrap().is_empty());
    }
}
