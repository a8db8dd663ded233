//! Run configuration.
//!
//! Values are layered: built-in defaults, then an optional JSON file, then `RECON_*`
//! environment variables. The binary applies command-line flags on top.

use crate::error::{ReconError, Result};
use crate::export::ExportFormat;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_ITEM_DETAIL_FILE: &str = "Final Item Detail Master.csv";
pub const DEFAULT_BALANCED_DETAIL_FILE: &str = "Processed Item Detail Data With Balancing Items.csv";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconConfig {
    pub orders_path: PathBuf,
    pub items_path: PathBuf,
    pub output_dir: PathBuf,
    pub item_detail_file: String,
    pub balanced_detail_file: String,
    pub export_format: ExportFormat,
    /// Fail on split orders or conflicting gross values instead of logging them.
    pub validate_preconditions: bool,
}

impl Default for ReconConfig {
    fn default() -> Self {
        Self {
            orders_path: PathBuf::from("data/orders.csv"),
            items_path: PathBuf::from("data/items.csv"),
            output_dir: PathBuf::from("output"),
            item_detail_file: DEFAULT_ITEM_DETAIL_FILE.to_string(),
            balanced_detail_file: DEFAULT_BALANCED_DETAIL_FILE.to_string(),
            export_format: ExportFormat::Csv,
            validate_preconditions: true,
        }
    }
}

impl ReconConfig {
    /// Load from a JSON file. Missing fields take their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            ReconError::Config(format!("Failed to read config {}: {}", path.display(), e))
        })?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Apply `RECON_*` overrides from the process environment.
    pub fn with_env(self) -> Result<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("RECON_ORDERS_PATH") {
            self.orders_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("RECON_ITEMS_PATH") {
            self.items_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("RECON_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("RECON_EXPORT_FORMAT") {
            self.export_format = v.parse()?;
        }
        if let Some(v) = lookup("RECON_VALIDATE") {
            self.validate_preconditions = parse_flag(&v)?;
        }
        Ok(self)
    }

    pub fn item_detail_path(&self) -> PathBuf {
        self.output_path(&self.item_detail_file)
    }

    pub fn balanced_detail_path(&self) -> PathBuf {
        self.output_path(&self.balanced_detail_file)
    }

    /// Swap a known `.csv`/`.parquet` suffix for the configured format; any other name keeps
    /// its dots and gets the format suffix appended.
    fn output_path(&self, file: &str) -> PathBuf {
        let lower = file.to_lowercase();
        let stem = [".csv", ".parquet"]
            .iter()
            .find(|suffix| lower.ends_with(*suffix))
            .map(|suffix| &file[..file.len() - suffix.len()])
            .unwrap_or(file);
        self.output_dir
            .join(format!("{}.{}", stem, self.export_format.extension()))
    }
}

fn parse_flag(raw: &str) -> Result<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ReconError::Config(format!("Invalid boolean value: {}", other))),
    }
}
