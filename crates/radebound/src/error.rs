use std::{io, path::PathBuf};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RadeBoundError>;

#[derive(Debug, Error)]
pub enum RadeBoundError {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("Failed to open dataset {path}")]
    OpenDataset {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to read dataset {path}")]
    ReadDataset {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Dataset contains no transactions")]
    EmptyDataset,

    #[error("Item ids span {min}..={max}, wider than the supported {limit} slots")]
    ItemRangeTooWide { min: i64, max: i64, limit: usize },

    #[error("Invalid confidence parameter: {0} (must lie strictly between 0 and 1)")]
    InvalidDelta(f64),

    #[error("Invalid item-length threshold: {0} (must be at least 1)")]
    InvalidThreshold(usize),

    #[error("Invalid replication factor: {0} (must be at least 1)")]
    InvalidReplicationFactor(u32),

    #[error("Invalid threshold range: {min}..={max}")]
    EmptyThresholdRange { min: usize, max: usize },

    #[error("Optimization failed! return code: {code}")]
    OptimizationFailed { code: i32, reason: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Unknown report format: {0}")]
    UnknownReportFormat(String),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl RadeBoundError {
    /// The OS error code of the underlying I/O failure, if any.
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            RadeBoundError::Io(e)
            | RadeBoundError::OpenDataset { source: e, .. }
            | RadeBoundError::ReadDataset { source: e, .. } => e.raw_os_error(),
            _ => None,
        }
    }

    /// Process exit status for this error: the OS code for I/O failures, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        self.raw_os_error().filter(|&code| code != 0).unwrap_or(1)
    }
}
