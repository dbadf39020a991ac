//! Fund report scraping, from HTTP fetch to assembled record.
//!
//! Each fund goes through the same stages:
//!
//! 1. **Fetching** ([`fetch`]): GET the print view of the fund's report
//! 2. **Repair** ([`repair`]): fix known markup defects on the raw text
//! 3. **Parsing** ([`fund_report`]): parse the page, check the fund exists,
//!    read its name and extract each small table
//!
//! Table extraction is split between [`tables`] (row reconstruction and
//! flattening), [`cells`] (text to scalar) and [`fixups`] (per-table
//! corrections).
//!
//! # Tables
//!
//! | Table | Headings | Correction |
//! |-------|----------|------------|
//! | Financial Year Returns | yes | none |
//! | Trailing Year Returns | yes | none |
//! | Risk Analysis | yes | none |
//! | Current Investment Style | no | as-at date, market cap, style |
//! | Quick Stats | no | as-at date, label/value split |
//! | Asset Allocation | no | as-at date |
//! | Performance | - | skipped |

pub mod cells;
pub mod fetch;
pub mod fixups;
pub mod fund_report;
pub mod repair;
pub mod tables;
