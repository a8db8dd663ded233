use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReconError {
    #[error("Missing column: {0}")]
    MissingColumn(String),

    #[error("Data quality error: {0}")]
    DataQuality(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Export error: {0}")]
    Export(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Polars error: {0}")]
    Polars(String),
}

impl From<polars::error::PolarsError> for ReconError {
    fn from(err: polars::error::PolarsError) -> Self {
        ReconError::Polars(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ReconError>;
