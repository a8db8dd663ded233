//! End-to-end reconciliation run.
//!
//! Join & Derive, then group indexing, then the discrepancy reconciler, strictly in that order.
//! Each stage takes its predecessor's table by value and returns a new one.

use crate::column_order::order_columns;
use crate::config::ReconConfig;
use crate::error::Result;
use crate::export::write_table;
use crate::indexer::GroupIndexer;
use crate::join_derive::JoinDeriveStage;
use crate::reconciler::{DiscrepancyReconciler, DiscrepancyReport};
use crate::{ingestion, validation};
use polars::prelude::*;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, info_span, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct PipelineSummary {
    pub run_id: Uuid,
    pub order_rows: usize,
    pub line_items: usize,
    pub balancing_items: usize,
    pub output_rows: usize,
    pub report: DiscrepancyReport,
    pub item_detail_path: Option<PathBuf>,
    pub balanced_detail_path: Option<PathBuf>,
}

/// Tables produced by one run, kept in memory for callers that want them.
#[derive(Debug)]
pub struct PipelineOutput {
    pub line_items: DataFrame,
    pub balanced: DataFrame,
    pub summary: PipelineSummary,
}

pub struct ReconciliationPipeline {
    config: ReconConfig,
}

impl ReconciliationPipeline {
    pub fn new(config: ReconConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ReconConfig {
        &self.config
    }

    /// Load both inputs from the configured paths and run with exports.
    pub fn run_from_files(&self) -> Result<PipelineOutput> {
        let orders = ingestion::load_orders(&self.config.orders_path)?;
        let items = ingestion::load_items(&self.config.items_path)?;
        self.run(orders, items)
    }

    /// Run every stage and write both artifacts.
    pub fn run(&self, orders: DataFrame, items: DataFrame) -> Result<PipelineOutput> {
        self.execute(orders, items, true)
    }

    /// Run every stage without writing anything.
    pub fn dry_run(&self, orders: DataFrame, items: DataFrame) -> Result<PipelineOutput> {
        self.execute(orders, items, false)
    }

    fn execute(&self, orders: DataFrame, items: DataFrame, export: bool) -> Result<PipelineOutput> {
        let run_id = Uuid::new_v4();
        let span = info_span!("reconciliation", %run_id);
        let _guard = span.enter();

        let order_rows = orders.height();
        let combined = JoinDeriveStage.run(orders, items)?;
        let mut line_items = GroupIndexer.run(combined)?;
        self.check_preconditions(&line_items)?;

        let item_detail_path = if export {
            let path = self.config.item_detail_path();
            write_table(&mut line_items, &path, self.config.export_format)?;
            Some(path)
        } else {
            None
        };

        let reconciliation = DiscrepancyReconciler.run(line_items.clone())?;
        let mut balanced = order_columns(reconciliation.table)?;

        let balanced_detail_path = if export {
            let path = self.config.balanced_detail_path();
            write_table(&mut balanced, &path, self.config.export_format)?;
            Some(path)
        } else {
            None
        };

        let summary = PipelineSummary {
            run_id,
            order_rows,
            line_items: line_items.height(),
            balancing_items: reconciliation.report.discrepancies.len(),
            output_rows: balanced.height(),
            report: reconciliation.report,
            item_detail_path,
            balanced_detail_path,
        };

        info!(
            line_items = summary.line_items,
            balancing_items = summary.balancing_items,
            output_rows = summary.output_rows,
            "reconciliation complete"
        );

        Ok(PipelineOutput {
            line_items,
            balanced,
            summary,
        })
    }

    fn check_preconditions(&self, indexed: &DataFrame) -> Result<()> {
        if self.config.validate_preconditions {
            return validation::validate(indexed);
        }

        let mut violations = validation::check_contiguous_runs(indexed)?;
        violations.extend(validation::check_gross_value(indexed)?);
        for violation in &violations {
            warn!("{}", violation);
        }
        Ok(())
    }
}
