use crate::error::{ReconError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Csv,
    Parquet,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Parquet => "parquet",
        }
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = ReconError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "parquet" => Ok(ExportFormat::Parquet),
            other => Err(ReconError::Config(format!("Unknown export format: {}", other))),
        }
    }
}

/// Write a table to `path`, creating the parent directory if needed.
pub fn write_table(df: &mut DataFrame, path: &Path, format: ExportFormat) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut file = File::create(path)?;
    match format {
        ExportFormat::Csv => {
            CsvWriter::new(&mut file)
                .include_header(true)
                .finish(df)
                .map_err(|e| ReconError::Export(format!("{}: {}", path.display(), e)))?;
        }
        ExportFormat::Parquet => {
            ParquetWriter::new(&mut file)
                .finish(df)
                .map_err(|e| ReconError::Export(format!("{}: {}", path.display(), e)))?;
        }
    }

    info!(path = %path.display(), rows = df.height(), "wrote table");
    Ok(())
}
