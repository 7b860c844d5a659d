//! Delimited table input and output.

use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, WriterBuilder};
use flate2::read::MultiGzDecoder;
use tracing::debug;

use crate::error::{CleanupError, Result};

/// One input row keyed by column name. Absent columns read as empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRecord {
    fields: HashMap<String, String>,
}

impl RawRecord {
    pub fn new(fields: HashMap<String, String>) -> Self {
        Self { fields }
    }

    pub fn get(&self, column: &str) -> &str {
        self.fields.get(column).map(String::as_str).unwrap_or("")
    }

    pub fn contains(&self, column: &str) -> bool {
        self.fields.contains_key(column)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RawRecord {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            fields: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// A batch of raw records sharing one header.
#[derive(Debug, Clone, Default)]
pub struct Table {
    pub source: String,
    pub columns: Vec<String>,
    pub records: Vec<RawRecord>,
}

impl Table {
    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Fixed-schema output of one reshaping pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedTable {
    pub source: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// Records carrying each tag, keyed by tag name.
    pub tag_presence: BTreeMap<String, usize>,
    /// Occurrences of tags outside the vocabulary.
    pub unknown_tags: BTreeMap<String, usize>,
}

impl NormalizedTable {
    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    /// Value at `row` for `column`, if both exist.
    pub fn value(&self, row: usize, column: &str) -> Option<&str> {
        let idx = self.column_index(column)?;
        self.rows.get(row)?.get(idx).map(String::as_str)
    }
}

fn open_input(path: &Path) -> Result<Box<dyn Read>> {
    let file = File::open(path).map_err(|e| CleanupError::InputNotFound {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let is_gz = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("gz"))
        .unwrap_or(false);
    let reader: Box<dyn Read> = if is_gz {
        Box::new(MultiGzDecoder::new(file))
    } else {
        Box::new(file)
    };
    Ok(reader)
}

pub fn read_table(path: &Path, delimiter: u8) -> Result<Table> {
    let reader = open_input(path)?;
    let mut rdr = ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(reader);

    let columns: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
    let mut records = Vec::new();
    for result in rdr.records() {
        let row = result?;
        let record: RawRecord = columns
            .iter()
            .zip(row.iter())
            .map(|(column, value)| (column.as_str(), value))
            .collect();
        records.push(record);
    }
    debug!(path = %path.display(), rows = records.len(), "read table");

    Ok(Table {
        source: path.display().to_string(),
        columns,
        records,
    })
}

pub fn write_table(path: &Path, table: &NormalizedTable, delimiter: u8) -> Result<()> {
    let mut wtr = WriterBuilder::new().delimiter(delimiter).from_path(path)?;
    wtr.write_record(&table.columns)?;
    for row in &table.rows {
        wtr.write_record(row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// `genes/TP53.tsv.gz` becomes `TP53_cleaned.tsv`.
pub fn cleaned_file_name(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = name.strip_suffix(".gz").unwrap_or(&name);
    let stem = match name.rfind('.') {
        Some(idx) if idx > 0 => &name[..idx],
        _ => name,
    };
    format!("{}_cleaned.tsv", stem)
}

/// Output location for an input found at `relative` under its root; the
/// folder structure is mirrored beneath `output_dir`.
pub fn cleaned_output_path(output_dir: &Path, relative: &Path) -> PathBuf {
    let dir = match relative.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => output_dir.join(parent),
        _ => output_dir.to_path_buf(),
    };
    dir.join(cleaned_file_name(relative))
}
