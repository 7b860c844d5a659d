use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures raised while reading, reshaping, or writing a batch of mutation records.
#[derive(Debug, Error)]
pub enum CleanupError {
    #[error("input '{}' could not be read: {reason}", .path.display())]
    InputNotFound { path: PathBuf, reason: String },
    #[error("malformed '{column}' annotation: tag '{tag}' position {position}: {details}")]
    MalformedAnnotation {
        column: String,
        tag: String,
        position: usize,
        details: String,
    },
    #[error("unrecognized tag '{tag}' in column '{column}'")]
    UnknownTag { column: String, tag: String },
    #[error("batch '{0}' contains no records")]
    EmptyBatch(String),
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("delimited table error: {0}")]
    Csv(#[from] csv::Error),
    #[error("config file could not be parsed: {0}")]
    Toml(#[from] toml::de::Error),
}

impl CleanupError {
    /// True for conditions that halt a batch. `InputNotFound` and `EmptyBatch`
    /// only exclude or annotate it.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, CleanupError::InputNotFound { .. } | CleanupError::EmptyBatch(_))
    }
}

pub type Result<T> = std::result::Result<T, CleanupError>;
