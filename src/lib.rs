pub mod column_order;
pub mod config;
pub mod data_utils;
pub mod error;
pub mod export;
pub mod indexer;
pub mod ingestion;
pub mod join_derive;
pub mod pipeline;
pub mod reconciler;
pub mod schema;
pub mod time;
pub mod validation;

pub use config::ReconConfig;
pub use error::{ReconError, Result};
pub use pipeline::{PipelineOutput, PipelineSummary, ReconciliationPipeline};
