use crate::error::{ReconError, Result};
use polars::prelude::*;

/// Lenient numeric cast: values that do not parse become null instead of failing the run.
pub fn coerce_numeric(name: &str) -> Expr {
    col(name).cast(DataType::Float64).alias(name)
}

/// Replace null and NaN with 0.0 so no null-like value survives to later stages.
pub fn zero_fill(name: &str) -> Expr {
    col(name)
        .fill_nan(lit(0.0))
        .fill_null(lit(0.0))
        .alias(name)
}

/// Round to `precision` decimal places, ties to even (matches numpy/pandas `round`).
pub fn round_to(value: f64, precision: u32) -> f64 {
    let factor = 10_f64.powi(precision as i32);
    (value * factor).round_ties_even() / factor
}

/// Fail with `MissingColumn` naming every absent column at once.
pub fn require_columns(df: &DataFrame, table: &str, required: &[&str]) -> Result<()> {
    let present: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();

    let missing: Vec<&str> = required
        .iter()
        .copied()
        .filter(|name| !present.iter().any(|p| p == name))
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ReconError::MissingColumn(format!(
            "{} table is missing {}",
            table,
            missing.join(", ")
        )))
    }
}

/// Text view of a column, whatever its stored dtype.
pub fn column_as_text(df: &DataFrame, name: &str) -> Result<Series> {
    let series = df
        .column(name)
        .map_err(|_| ReconError::MissingColumn(name.to_string()))?;
    Ok(series.cast(&DataType::String)?)
}
