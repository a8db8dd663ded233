use crate::data_utils::column_as_text;
use crate::error::Result;
use crate::schema::{ITEM_INDEX, PRIMARY_KEY_ALT, PRIMARY_KEY_INDEX};
use itertools::Itertools;
use polars::prelude::*;
use tracing::debug;

/// Assigns order and item sequence numbers from contiguous runs of `PrimaryKeyAlt`.
///
/// Works purely on physical row order. Input is expected to be grouped already; a key that
/// shows up in two separate runs receives two order indices (see `validation`).
pub struct GroupIndexer;

impl GroupIndexer {
    pub fn run(&self, df: DataFrame) -> Result<DataFrame> {
        let keys = column_as_text(&df, PRIMARY_KEY_ALT)?;
        let (order_index, item_index) = run_indices(keys.str()?.into_iter());

        let orders = order_index.last().map(|last| last + 1).unwrap_or(0);
        debug!(rows = df.height(), orders, "assigned group indices");

        let mut df = df;
        df.with_column(Series::new(PRIMARY_KEY_INDEX, order_index))?;
        df.with_column(Series::new(ITEM_INDEX, item_index))?;
        Ok(df)
    }
}

/// Zero-based run counter and one-based position within the run, per row.
pub fn run_indices<'a, I>(keys: I) -> (Vec<u32>, Vec<u32>)
where
    I: Iterator<Item = Option<&'a str>>,
{
    let mut order_index = Vec::new();
    let mut item_index = Vec::new();

    for (run, (len, _key)) in keys.dedup_with_count().enumerate() {
        for position in 1..=len {
            order_index.push(run as u32);
            item_index.push(position as u32);
        }
    }

    (order_index, item_index)
}
