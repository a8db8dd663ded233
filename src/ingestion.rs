//! Input loading for the order and item tables.
//!
//! Every column is read as text. Numeric coercion is owned by the join stage so that
//! malformed cells become nulls there rather than failing the CSV parse here.

use crate::data_utils::require_columns;
use crate::error::{ReconError, Result};
use crate::schema::{ITEM_COLUMNS, ORDER_COLUMNS};
use polars::prelude::*;
use std::path::Path;
use tracing::info;

pub fn load_table(path: &Path) -> Result<DataFrame> {
    if !path.exists() {
        return Err(ReconError::Config(format!(
            "Input file not found: {}",
            path.display()
        )));
    }

    let df = LazyCsvReader::new(path)
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .finish()
        .map_err(|e| ReconError::Polars(format!("Failed to scan {}: {}", path.display(), e)))?
        .collect()
        .map_err(|e| ReconError::Polars(format!("Failed to collect {}: {}", path.display(), e)))?;

    info!(path = %path.display(), rows = df.height(), columns = df.width(), "loaded table");
    Ok(df)
}

pub fn load_orders(path: &Path) -> Result<DataFrame> {
    let df = load_table(path)?;
    require_columns(&df, "order", &ORDER_COLUMNS)?;
    Ok(df)
}

pub fn load_items(path: &Path) -> Result<DataFrame> {
    let df = load_table(path)?;
    require_columns(&df, "item", &ITEM_COLUMNS)?;
    Ok(df)
}
