//! Step definitions for lifecycle scenarios.

pub mod discount;
pub mod rollover;
pub mod status;

use chrono::NaiveDate;

/// Parse a `YYYY-MM-DD` step argument.
pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").expect("step dates are YYYY-MM-DD")
}
