//! Precondition checks on the indexed line-item table.
//!
//! Grouping by run and reading one gross value per order both assume the input is well formed.
//! These checks turn those assumptions into explicit data-quality errors.

use crate::data_utils::column_as_text;
use crate::error::{ReconError, Result};
use crate::schema::{GROSS_AOV, PRIMARY_KEY_ALT};
use polars::prelude::*;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, PartialEq)]
pub enum Violation {
    NullOrderKey { row: usize },
    SplitOrder { key: String, row: usize },
    MissingGrossValue { key: String },
    InconsistentGrossValue { key: String, first: f64, other: f64 },
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Violation::NullOrderKey { row } => write!(f, "row {} has no {}", row, PRIMARY_KEY_ALT),
            Violation::SplitOrder { key, row } => {
                write!(f, "order {} reappears at row {} after another order", key, row)
            }
            Violation::MissingGrossValue { key } => {
                write!(f, "order {} has no readable {}", key, GROSS_AOV)
            }
            Violation::InconsistentGrossValue { key, first, other } => write!(
                f,
                "order {} has conflicting {} values {} and {}",
                key, GROSS_AOV, first, other
            ),
        }
    }
}

/// Every order key must form exactly one contiguous run, and no key may be null.
pub fn check_contiguous_runs(df: &DataFrame) -> Result<Vec<Violation>> {
    let keys = column_as_text(df, PRIMARY_KEY_ALT)?;
    let mut closed: HashSet<&str> = HashSet::new();
    let mut current: Option<&str> = None;
    let mut violations = Vec::new();

    for (row, key) in keys.str()?.into_iter().enumerate() {
        let Some(key) = key else {
            violations.push(Violation::NullOrderKey { row });
            continue;
        };

        if current == Some(key) {
            continue;
        }
        if let Some(previous) = current {
            closed.insert(previous);
        }
        if closed.contains(key) {
            violations.push(Violation::SplitOrder {
                key: key.to_string(),
                row,
            });
        }
        current = Some(key);
    }

    Ok(violations)
}

/// Each order must carry one readable `GrossAOV` value, repeated identically on all its rows.
pub fn check_gross_value(df: &DataFrame) -> Result<Vec<Violation>> {
    let keys = column_as_text(df, PRIMARY_KEY_ALT)?;
    let gross = df.column(GROSS_AOV)?.cast(&DataType::Float64)?;

    let mut seen: HashMap<&str, Option<f64>> = HashMap::new();
    let mut order: Vec<&str> = Vec::new();
    let mut violations = Vec::new();

    for (key, value) in keys.str()?.into_iter().zip(gross.f64()?.into_iter()) {
        let Some(key) = key else { continue };
        let value = value.filter(|v| !v.is_nan());

        match seen.get(key) {
            None => {
                seen.insert(key, value);
                order.push(key);
            }
            Some(first) => {
                if let (Some(first), Some(other)) = (*first, value) {
                    if first != other {
                        violations.push(Violation::InconsistentGrossValue {
                            key: key.to_string(),
                            first,
                            other,
                        });
                    }
                }
            }
        }
    }

    for key in order {
        if let Some(None) = seen.get(key) {
            violations.push(Violation::MissingGrossValue {
                key: key.to_string(),
            });
        }
    }

    Ok(violations)
}

/// Run every check, failing with the full list of violations.
pub fn validate(df: &DataFrame) -> Result<()> {
    let mut violations = check_contiguous_runs(df)?;
    violations.extend(check_gross_value(df)?);

    if violations.is_empty() {
        return Ok(());
    }

    let details: Vec<String> = violations.iter().map(|v| v.to_string()).collect();
    Err(ReconError::DataQuality(details.join("; ")))
}
