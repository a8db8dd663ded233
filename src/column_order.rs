use crate::error::Result;
use crate::schema::*;
use polars::prelude::*;

/// Export layout. Columns not listed here follow in their existing order.
pub const CANONICAL_COLUMNS: [&str; 14] = [
    PRIMARY_KEY_ALT,
    PRIMARY_KEY_ITEM,
    PRIMARY_KEY_INDEX,
    ITEM_INDEX,
    ORDER_PLACED_DATE,
    PRODUCT_PLU,
    PRODUCT_NAME,
    QUANTITY,
    ITEM_QUANTITY,
    ITEM_PRICE,
    TOTAL_ITEM_COST,
    GROSS_AOV,
    PROMOTIONS_ON_ITEMS,
    DRIVER_TIP,
];

pub fn canonical_order(columns: &[&str]) -> Vec<String> {
    let mut ordered: Vec<String> = CANONICAL_COLUMNS
        .iter()
        .filter(|name| columns.contains(*name))
        .map(|name| name.to_string())
        .collect();

    ordered.extend(
        columns
            .iter()
            .filter(|name| !CANONICAL_COLUMNS.contains(*name))
            .map(|name| name.to_string()),
    );
    ordered
}

/// Reorder columns into the export layout. Rows are untouched.
pub fn order_columns(df: DataFrame) -> Result<DataFrame> {
    let exprs: Vec<Expr> = canonical_order(&df.get_column_names())
        .iter()
        .map(|name| col(name))
        .collect();
    Ok(df.lazy().select(exprs).collect()?)
}
