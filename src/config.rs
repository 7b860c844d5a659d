//! Run configuration.
//!
//! Values come from built-in defaults, then an optional TOML file, then the
//! command line. Nothing is read from ambient process state after that.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{CleanupError, Result};
use crate::reshape::UnknownTagPolicy;
use crate::schema::Schema;

/// Everything one cleaning run needs.
#[derive(Clone, Debug)]
pub struct RunConfig {
    /// Files or folders to clean; folders are searched recursively.
    pub inputs: Vec<PathBuf>,
    pub output_dir: PathBuf,
    pub schema: Schema,
    /// Reader threads.
    pub workers: usize,
    pub delimiter: u8,
    pub unknown_tags: UnknownTagPolicy,
    /// Optional single table holding every cleaned batch.
    pub combined: Option<PathBuf>,
}

impl RunConfig {
    pub fn new(inputs: Vec<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            inputs,
            output_dir: output_dir.into(),
            schema: Schema::default(),
            workers: default_workers(),
            delimiter: b'\t',
            unknown_tags: UnknownTagPolicy::default(),
            combined: None,
        }
    }

    pub fn apply_file(&mut self, file: FileConfig) -> Result<()> {
        if let Some(workers) = file.workers {
            self.workers = workers;
        }
        if let Some(delimiter) = file.delimiter {
            self.delimiter = parse_delimiter(&delimiter)?;
        }
        if let Some(policy) = file.unknown_tags {
            self.unknown_tags = policy;
        }
        if let Some(schema) = file.schema {
            self.schema = schema;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.inputs.is_empty() {
            return Err(CleanupError::Configuration("no inputs given".to_string()));
        }
        if self.workers == 0 {
            return Err(CleanupError::Configuration(
                "worker count must be at least 1".to_string(),
            ));
        }
        self.schema.validate()
    }
}

/// On-disk form of the configuration. Every key is optional.
///
/// ```toml
/// workers = 4
/// delimiter = "\t"
/// unknown_tags = "fail"
///
/// [schema]
/// version = 2
///
/// [[schema.sources]]
/// column = "Annotation"
///
/// [[schema.sources.tags]]
/// tag = "OncoKB"
/// fields = [
///     { name = "OncoKB" },
///     { name = "OncoKB_level", strip = { prefix = "level" } },
/// ]
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub workers: Option<usize>,
    pub delimiter: Option<String>,
    pub unknown_tags: Option<UnknownTagPolicy>,
    pub schema: Option<Schema>,
}

impl FileConfig {
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }
}

/// Accepts a single ASCII character, or the escapes `\t` and `tab`.
pub fn parse_delimiter(raw: &str) -> Result<u8> {
    match raw {
        "\\t" | "tab" | "\t" => Ok(b'\t'),
        _ => {
            let bytes = raw.as_bytes();
            if bytes.len() == 1 && bytes[0].is_ascii() {
                Ok(bytes[0])
            } else {
                Err(CleanupError::Configuration(format!(
                    "delimiter must be a single ASCII character, got '{}'",
                    raw
                )))
            }
        }
    }
}

pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}
