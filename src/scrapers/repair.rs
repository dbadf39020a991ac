//! Text-level fixes applied to a report page before it is parsed.
//!
//! The "Asset Allocation" table carries a stray `</tr>` just ahead of its
//! International Equity row, which throws the rest of the table out of shape
//! once the page is parsed. The repair happens on the raw markup, so it is a
//! plain `&str -> String` function.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

/// Cell that immediately follows the defective row.
pub const DEFECT_MARKER: &str = r#"<td class="borderbottom YMWpadleft">International Equity</td>"#;

/// Offset (before the marker) where the row is closed.
const CLOSE_OFFSET: usize = 80;
/// Offset (before the marker) where the row is re-opened.
const REOPEN_OFFSET: usize = 5;

static STAR_RATING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<img src="/Content/images/([1-5])starscropped\.gif" alt="[1-5]" />"#).unwrap()
});

static LINE_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<br\s*/?>").unwrap());

/// Apply every markup fix: row splice, star ratings, line breaks.
pub fn repair_markup(html: &str) -> String {
    let spliced = splice_extra_row_close(html);
    let rated = STAR_RATING.replace_all(&spliced, "$1");
    LINE_BREAK.replace_all(&rated, " ").into_owned()
}

/// Close the row 80 bytes before the marker and re-open one 5 bytes before it.
///
/// Pages without the marker come back unchanged.
pub fn splice_extra_row_close(html: &str) -> String {
    let Some(pos) = html.find(DEFECT_MARKER) else {
        return html.to_string();
    };

    if pos < CLOSE_OFFSET {
        warn!(marker_at = pos, "Defect marker too close to the start; leaving markup as is");
        return html.to_string();
    }

    match (html.get(..pos - CLOSE_OFFSET), html.get(pos - REOPEN_OFFSET..)) {
        (Some(left), Some(right)) => {
            debug!(marker_at = pos, "Splicing extra </tr> out of Asset Allocation");
            let mut out = String::with_capacity(html.len() + 12);
            out.push_str(left);
            out.push_str("</tr>\n");
            out.push_str("<tr>\n");
            out.push_str(right);
            out
        }
        _ => {
            warn!(marker_at = pos, "Splice offsets fall inside a character; leaving markup as is");
            html.to_string()
        }
    }
}
