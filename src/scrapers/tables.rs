//! Extraction of the report's small tables into flat key/value records.
//!
//! # Table Layout
//!
//! Every `.YMWTableSmall` table follows the same loose pattern:
//!
//! | Row | Content |
//! |-----|---------|
//! | 0 | Table name in the first cell |
//! | 1 | Column headings (only for [`HEADED_TABLES`]) |
//! | 2.. | Data rows: a label followed by values |
//!
//! The markup is hand-authored, so data rows do not always line up with
//! the headings. Rows are rebuilt into a dense slot array: each non-empty
//! cell takes the next free slot, and cells spanning several rows keep
//! their slot occupied in the rows below.

use crate::errors::ScrapeError;
use crate::models::{Cell, RowRecord, TableRecord};
use crate::scrapers::cells::normalize;
use crate::scrapers::fixups::TableKind;
use scraper::ElementRef;
use std::collections::BTreeMap;
use tracing::{debug, instrument, warn};

/// Tables whose second row holds column headings.
pub const HEADED_TABLES: [&str; 3] = [
    "Financial Year Returns",
    "Trailing Year Returns",
    "Risk Analysis",
];

/// Tables left out of the fund record entirely.
pub const SKIPPED_TABLE: &str = "Performance";

/// A table that survived extraction.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedTable {
    pub name: String,
    pub record: TableRecord,
}

/// Rows that belong to `table` itself, ignoring rows of nested tables.
pub fn table_rows<'a>(table: ElementRef<'a>) -> Vec<ElementRef<'a>> {
    let mut rows = Vec::new();
    for child in table.children().filter_map(ElementRef::wrap) {
        match child.value().name() {
            "tr" => rows.push(child),
            "thead" | "tbody" | "tfoot" => rows.extend(
                child
                    .children()
                    .filter_map(ElementRef::wrap)
                    .filter(|el| el.value().name() == "tr"),
            ),
            _ => {}
        }
    }
    rows
}

fn row_cells<'a>(row: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|el| matches!(el.value().name(), "td" | "th"))
}

fn cell_text(cell: ElementRef<'_>) -> String {
    cell.text().collect()
}

/// A cell with no text and no child elements. A cell holding only an image
/// is not empty.
fn is_empty_cell(text: &str, cell: ElementRef<'_>) -> bool {
    text.trim().is_empty() && cell.children().all(|child| !child.value().is_element())
}

fn row_span(cell: ElementRef<'_>) -> usize {
    cell.value()
        .attr("rowspan")
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(1)
        .max(1)
}

/// The table's name: the first cell of its first row, normalized.
pub fn table_name(rows: &[ElementRef<'_>]) -> Option<String> {
    let first_cell = rows.first().and_then(|row| row_cells(*row).next())?;
    normalize(&cell_text(first_cell)).to_key()
}

/// Column headings from the second row, skipping the corner cell.
///
/// Blank and `--` headings are left out, so they never end up in a key.
pub fn column_headings(rows: &[ElementRef<'_>]) -> Vec<Cell> {
    rows.get(1)
        .map(|row| {
            row_cells(*row)
                .skip(1)
                .map(|c| normalize(&cell_text(c)))
                .filter(|heading| !heading.is_absent())
                .collect()
        })
        .unwrap_or_default()
}

/// A value that keeps its slot occupied in the rows below it.
struct Carry {
    cell: Cell,
    rows_left: usize,
}

/// A data cell as read from the markup.
struct RawCell {
    text: String,
    span: usize,
    empty: bool,
}

/// Rebuild data rows into dense rows of cells.
///
/// Rows whose cells are all empty are dropped, but row spans reaching
/// into them still count them. Empty cells inside a row take no slot.
/// `--` cells and cells holding only markup (an image) take a slot as
/// [`Cell::Absent`].
pub fn reconstruct_grid(rows: &[ElementRef<'_>]) -> Vec<Vec<Cell>> {
    let mut carried: BTreeMap<usize, Carry> = BTreeMap::new();
    let mut grid = Vec::new();

    for row in rows {
        let cells: Vec<RawCell> = row_cells(*row)
            .map(|cell| {
                let text = cell_text(cell);
                RawCell {
                    empty: is_empty_cell(&text, cell),
                    span: row_span(cell),
                    text,
                }
            })
            .collect();

        let mut slots: Vec<Option<Cell>> = Vec::new();
        for (col, carry) in carried.iter_mut() {
            occupy(&mut slots, *col, carry.cell.clone());
            carry.rows_left -= 1;
        }
        carried.retain(|_, carry| carry.rows_left > 0);

        if cells.iter().all(|cell| cell.empty) {
            continue;
        }

        let mut col = 0;
        for RawCell { text, span, empty } in cells {
            if empty {
                continue;
            }
            while slots.get(col).is_some_and(Option::is_some) {
                col += 1;
            }
            let cell = normalize(&text);
            if span > 1 {
                carried.insert(
                    col,
                    Carry {
                        cell: cell.clone(),
                        rows_left: span - 1,
                    },
                );
            }
            occupy(&mut slots, col, cell);
            col += 1;
        }

        grid.push(
            slots
                .into_iter()
                .map(|slot| slot.unwrap_or(Cell::Absent))
                .collect(),
        );
    }
    grid
}

fn occupy(slots: &mut Vec<Option<Cell>>, col: usize, cell: Cell) {
    if slots.len() <= col {
        slots.resize(col + 1, None);
    }
    slots[col] = Some(cell);
}

/// Turn one dense row into key/value pairs.
///
/// Without headings the row label maps to the second cell. With headings,
/// each present value after the label is paired with the next heading in
/// order; pairing stops when either side runs out. Rows without a label
/// produce nothing.
pub fn flatten_row(row: &[Cell], headings: Option<&[Cell]>) -> Option<RowRecord> {
    let label = row.first()?.to_key()?;

    let Some(headings) = headings else {
        let value = row.get(1).cloned().unwrap_or(Cell::Absent);
        return Some(vec![(label, value)]);
    };

    let present: Vec<&Cell> = row[1..].iter().filter(|c| !c.is_absent()).collect();
    if present.len() != headings.len() {
        debug!(
            %label,
            values = present.len(),
            headings = headings.len(),
            "Heading count differs from value count; pairing positionally"
        );
    }
    Some(
        present
            .into_iter()
            .zip(headings)
            .map(|(value, heading)| (format!("{label} {heading}"), value.clone()))
            .collect(),
    )
}

/// Extract one small table.
///
/// Returns `Ok(None)` for tables that carry no name and for the skipped
/// `Performance` table.
#[instrument(level = "debug", skip_all)]
pub fn extract_table(table: ElementRef<'_>) -> Result<Option<ExtractedTable>, ScrapeError> {
    let rows = table_rows(table);
    let Some(name) = table_name(&rows) else {
        warn!(rows = rows.len(), "Small table has no name; ignoring it");
        return Ok(None);
    };
    if name == SKIPPED_TABLE {
        debug!(%name, "Skipping table");
        return Ok(None);
    }

    let headings = HEADED_TABLES
        .contains(&name.as_str())
        .then(|| column_headings(&rows));
    let first_data_row = if headings.is_some() { 2 } else { 1 };
    let data_rows = rows.get(first_data_row..).unwrap_or_default();

    // unlabeled rows stay as empty records so fixups can address rows by index
    let records: Vec<RowRecord> = reconstruct_grid(data_rows)
        .iter()
        .map(|row| flatten_row(row, headings.as_deref()).unwrap_or_default())
        .collect();
    let records = TableKind::from_name(&name).apply(&name, records)?;

    let record: TableRecord = records.into_iter().flatten().collect();
    debug!(%name, keys = record.len(), "Extracted table");
    Ok(Some(ExtractedTable { name, record }))
}
