//! Join & Derive stage
//!
//! Combines order rows with their item price/quantity rows and derives per-line monetary totals.
//! The output keeps the order table's physical row order, which the group indexer relies on.

use crate::data_utils::{coerce_numeric, require_columns, zero_fill};
use crate::error::Result;
use crate::schema::*;
use crate::time::apply_retention_floor;
use polars::prelude::*;
use tracing::{debug, info};

const ROW_ORDER: &str = "__row_order";

pub struct JoinDeriveStage;

impl JoinDeriveStage {
    /// Produce the combined line-item table from the order and item tables.
    ///
    /// - Orders placed before the retention floor are dropped.
    /// - Order rows with no matching item keep null item fields, which end up as zero.
    /// - `TotalItemCost = ItemPrice * Quantity`, null when either side is unreadable.
    /// - `ItemPrice`, `ItemQuantity` and `TotalItemCost` are zero-filled before returning.
    pub fn run(&self, orders: DataFrame, items: DataFrame) -> Result<DataFrame> {
        require_columns(&orders, "order", &ORDER_COLUMNS)?;
        require_columns(&items, "item", &ITEM_COLUMNS)?;

        let order_rows = orders.height();
        let retained = apply_retention_floor(orders)?;
        info!(
            retained = retained.height(),
            dropped = order_rows - retained.height(),
            "order rows after retention floor"
        );

        let item_lazy = items.lazy().select([
            col(PRIMARY_KEY_ITEM).cast(DataType::String),
            col(ITEM_PRICE),
            col(ITEM_QUANTITY),
        ]);

        let combined = retained
            .lazy()
            .with_row_index(ROW_ORDER, None)
            .with_columns([
                col(PRIMARY_KEY_ALT).cast(DataType::String),
                col(PRIMARY_KEY_ITEM).cast(DataType::String),
            ])
            .join(
                item_lazy,
                [col(PRIMARY_KEY_ITEM)],
                [col(PRIMARY_KEY_ITEM)],
                JoinArgs::new(JoinType::Left),
            )
            .sort_by_exprs(
                [col(ROW_ORDER)],
                SortMultipleOptions {
                    maintain_order: true,
                    ..Default::default()
                },
            )
            .drop([ROW_ORDER])
            .with_columns([
                coerce_numeric(QUANTITY),
                coerce_numeric(ITEM_PRICE),
                coerce_numeric(ITEM_QUANTITY),
                coerce_numeric(GROSS_AOV),
                coerce_numeric(PROMOTIONS_ON_ITEMS),
                coerce_numeric(DRIVER_TIP),
            ])
            .with_columns([(col(ITEM_PRICE) * col(QUANTITY)).alias(TOTAL_ITEM_COST)])
            .with_columns([
                zero_fill(ITEM_PRICE),
                zero_fill(ITEM_QUANTITY),
                zero_fill(TOTAL_ITEM_COST),
            ])
            .collect()?;

        debug!(rows = combined.height(), "joined order and item tables");
        Ok(combined)
    }
}
