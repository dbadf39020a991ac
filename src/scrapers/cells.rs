//! Conversion of free-text cell content into [`Cell`] scalars.
//!
//! Report cells carry footnotes in parentheses, percent signs, thousands
//! separators and a `--` placeholder for missing data. [`normalize`] strips
//! all of that and coerces numeric-looking text to a number.

use crate::models::Cell;
use once_cell::sync::Lazy;
use regex::Regex;

/// One parenthesized group plus any spaces in front of it.
static PARENTHETICAL: Lazy<Regex> = Lazy::new(|| Regex::new(r" *\([^)]*\)").unwrap());

const ABSENT_PLACEHOLDER: &str = "--";

/// Normalize raw cell text.
///
/// Empty text is treated like the placeholder and yields [`Cell::Absent`];
/// an explicit `0` stays a number.
pub fn normalize(raw: &str) -> Cell {
    let stripped = PARENTHETICAL.replace_all(raw.trim(), "");
    let cleaned: String = stripped.chars().filter(|c| *c != '%' && *c != ',').collect();
    let cleaned = cleaned.trim();

    if cleaned.is_empty() || cleaned == ABSENT_PLACEHOLDER {
        return Cell::Absent;
    }
    match parse_number(cleaned) {
        Some(n) => Cell::Number(n),
        None => Cell::Text(cleaned.to_string()),
    }
}

/// Parse plain decimal notation. `f64::from_str` also takes `inf` and `NaN`,
/// which are words here, not numbers.
fn parse_number(s: &str) -> Option<f64> {
    if !s.bytes().any(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse::<f64>().ok().filter(|n| n.is_finite())
}
