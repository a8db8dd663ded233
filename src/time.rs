use crate::data_utils::column_as_text;
use crate::error::Result;
use crate::schema::{retention_floor, ORDER_PLACED_DATE};
use chrono::{NaiveDate, NaiveDateTime};
use polars::prelude::*;
use tracing::{debug, warn};

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d"];
const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%d/%m/%Y %H:%M"];

/// Parse an order timestamp or date string down to its calendar date.
pub fn parse_order_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, fmt) {
            return Some(date);
        }
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Some(ts.date());
        }
    }

    None
}

/// Keep rows placed on or after the retention floor.
///
/// Rows whose date is missing or unreadable are dropped, since they cannot be shown to fall
/// inside the retention window.
pub fn apply_retention_floor(df: DataFrame) -> Result<DataFrame> {
    let floor = retention_floor();
    let dates = column_as_text(&df, ORDER_PLACED_DATE)?;

    let mut unreadable = 0usize;
    let keep: Vec<bool> = dates
        .str()?
        .into_iter()
        .map(|raw| match raw.and_then(parse_order_date) {
            Some(date) => date >= floor,
            None => {
                unreadable += 1;
                false
            }
        })
        .collect();

    if unreadable > 0 {
        warn!(rows = unreadable, "dropping order rows with unreadable {}", ORDER_PLACED_DATE);
    }

    let mask = BooleanChunked::from_slice("retained", &keep);
    let before = df.height();
    let filtered = df.filter(&mask)?;
    debug!(
        before,
        after = filtered.height(),
        floor = %floor,
        "applied retention floor"
    );

    Ok(filtered)
}
