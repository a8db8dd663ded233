//! Discrepancy Reconciler
//!
//! Compares each order's summed item cost with its reported gross value and appends one
//! balancing line item per disagreeing order, so that after insertion the item costs of every
//! order add up to its gross value.

use crate::data_utils::round_to;
use crate::error::{ReconError, Result};
use crate::schema::*;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// One order whose item costs do not add up to its gross value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Discrepancy {
    pub order_key: String,
    pub summed_cost: f64,
    pub gross_aov: f64,
    /// `gross_aov - summed_cost`. Negative when the items cost more than the order total.
    pub price_difference: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiscrepancyReport {
    pub orders_checked: usize,
    /// Orders skipped because no readable gross value was reported.
    pub orders_without_gross: Vec<String>,
    pub discrepancies: Vec<Discrepancy>,
}

impl DiscrepancyReport {
    pub fn net_adjustment(&self) -> f64 {
        round_to(
            self.discrepancies.iter().map(|d| d.price_difference).sum(),
            MONEY_PRECISION,
        )
    }
}

/// Sum item costs per order (first-appearance order) and flag orders whose rounded sum
/// differs from their rounded first-seen gross value.
pub fn detect_discrepancies(indexed: &DataFrame) -> Result<DiscrepancyReport> {
    let totals = indexed
        .clone()
        .lazy()
        .group_by_stable([col(PRIMARY_KEY_ALT)])
        .agg([
            col(TOTAL_ITEM_COST).sum().alias(SUMMED_COST),
            col(GROSS_AOV).first().alias(GROSS_AOV),
        ])
        .collect()?;

    let keys = totals.column(PRIMARY_KEY_ALT)?.cast(&DataType::String)?;
    let summed = totals.column(SUMMED_COST)?.cast(&DataType::Float64)?;
    let gross = totals.column(GROSS_AOV)?.cast(&DataType::Float64)?;

    let mut report = DiscrepancyReport {
        orders_checked: totals.height(),
        ..Default::default()
    };

    let rows = keys
        .str()?
        .into_iter()
        .zip(summed.f64()?.into_iter())
        .zip(gross.f64()?.into_iter());

    for ((key, summed), gross) in rows {
        let Some(key) = key else { continue };

        let gross = match gross.filter(|g| !g.is_nan()) {
            Some(g) => round_to(g, MONEY_PRECISION),
            None => {
                report.orders_without_gross.push(key.to_string());
                continue;
            }
        };
        let summed = round_to(summed.unwrap_or(0.0), MONEY_PRECISION);

        if gross != summed {
            report.discrepancies.push(Discrepancy {
                order_key: key.to_string(),
                summed_cost: summed,
                gross_aov: gross,
                price_difference: round_to(gross - summed, MONEY_PRECISION),
            });
        }
    }

    if !report.orders_without_gross.is_empty() {
        warn!(
            orders = report.orders_without_gross.len(),
            "orders without a readable {} were not reconciled", GROSS_AOV
        );
    }
    info!(
        orders = report.orders_checked,
        discrepancies = report.discrepancies.len(),
        net_adjustment = report.net_adjustment(),
        "checked order totals"
    );

    Ok(report)
}

/// Build one balancing row per discrepancy, templated on the order's first line item.
pub fn balancing_rows(indexed: &DataFrame, report: &DiscrepancyReport) -> Result<DataFrame> {
    let keys: Vec<&str> = report
        .discrepancies
        .iter()
        .map(|d| d.order_key.as_str())
        .collect();
    let differences: Vec<f64> = report
        .discrepancies
        .iter()
        .map(|d| d.price_difference)
        .collect();

    let adjustments = DataFrame::new(vec![
        Series::new(PRIMARY_KEY_ALT, keys),
        Series::new(PRICE_DIFFERENCE, differences),
    ])?;

    // Keep the table's column layout and dtypes so the rows can be appended as-is.
    let layout: Vec<Expr> = indexed
        .get_columns()
        .iter()
        .map(|series| col(series.name()).cast(series.dtype().clone()))
        .collect();

    let rows = indexed
        .clone()
        .lazy()
        .filter(col(ITEM_INDEX).eq(lit(1u32)))
        .unique_stable(
            Some(vec![PRIMARY_KEY_ALT.to_string()]),
            UniqueKeepStrategy::First,
        )
        .join(
            adjustments.lazy(),
            [col(PRIMARY_KEY_ALT)],
            [col(PRIMARY_KEY_ALT)],
            JoinArgs::new(JoinType::Inner),
        )
        .with_columns([
            lit(BALANCING_PLU).alias(PRODUCT_PLU),
            lit(BALANCING_NAME).alias(PRODUCT_NAME),
            col(PRICE_DIFFERENCE).alias(ITEM_PRICE),
            lit(1.0).alias(QUANTITY),
            lit(1.0).alias(ITEM_QUANTITY),
            col(PRICE_DIFFERENCE).alias(TOTAL_ITEM_COST),
            lit(BALANCING_ITEM_INDEX)
                .cast(DataType::UInt32)
                .alias(ITEM_INDEX),
        ])
        .select(layout)
        .collect()?;

    if rows.height() != report.discrepancies.len() {
        return Err(ReconError::DataQuality(format!(
            "expected {} balancing rows, built {}",
            report.discrepancies.len(),
            rows.height()
        )));
    }

    debug!(rows = rows.height(), "built balancing rows");
    Ok(rows)
}

pub struct Reconciliation {
    pub table: DataFrame,
    pub report: DiscrepancyReport,
}

pub struct DiscrepancyReconciler;

impl DiscrepancyReconciler {
    /// Append balancing rows and re-sort by `(PrimaryKeyIndex, ItemIndex)`.
    pub fn run(&self, indexed: DataFrame) -> Result<Reconciliation> {
        let report = detect_discrepancies(&indexed)?;

        if report.discrepancies.is_empty() {
            return Ok(Reconciliation {
                table: indexed,
                report,
            });
        }

        let balancing = balancing_rows(&indexed, &report)?;
        let table = concat([indexed.lazy(), balancing.lazy()], UnionArgs::default())?
            .sort_by_exprs(
                [col(PRIMARY_KEY_INDEX), col(ITEM_INDEX)],
                SortMultipleOptions {
                    maintain_order: true,
                    ..Default::default()
                },
            )
            .collect()?;

        Ok(Reconciliation { table, report })
    }
}
