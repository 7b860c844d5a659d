//! Drives one cleaning run: discover, read, reshape, write.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::config::RunConfig;
use crate::error::{CleanupError, Result};
use crate::pool::{discover_inputs, read_tables};
use crate::reshape::Reshaper;
use crate::summary::TagSummary;
use crate::table::{cleaned_output_path, write_table, NormalizedTable};

/// Key column prepended to the combined table.
pub const SOURCE_COLUMN: &str = "source_file";

#[derive(Debug, Default)]
pub struct RunReport {
    pub written: Vec<PathBuf>,
    pub failures: Vec<(PathBuf, CleanupError)>,
    pub warnings: Vec<CleanupError>,
    pub summary: TagSummary,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

pub fn run(config: &RunConfig) -> Result<RunReport> {
    config.validate()?;
    let reshaper = Reshaper::new(config.schema.clone(), config.unknown_tags)?;
    let inputs = discover_inputs(&config.inputs)?;
    info!(
        "Found {} tables, reading with {} workers",
        inputs.len(),
        config.workers
    );
    std::fs::create_dir_all(&config.output_dir)?;

    let relative: BTreeMap<PathBuf, PathBuf> = inputs
        .iter()
        .map(|input| (input.path.clone(), input.relative.clone()))
        .collect();
    let paths: Vec<PathBuf> = inputs.into_iter().map(|input| input.path).collect();

    let tables = read_tables(&paths, config.workers, config.delimiter)?;
    let total = tables.len();
    let mut report = RunReport::default();
    let mut cleaned: Vec<(PathBuf, NormalizedTable)> = Vec::new();
    let mut claimed: HashMap<PathBuf, PathBuf> = HashMap::new();

    for (idx, (path, table)) in tables.into_iter().enumerate() {
        let table = match table {
            Ok(t) => t,
            Err(e) => {
                report.failures.push((path, e));
                continue;
            }
        };
        info!("[{}/{}] Cleaning {}", idx + 1, total, path.display());

        let normalized = match reshaper.reshape(&table) {
            Ok(n) => n,
            Err(e) => {
                report.failures.push((path, e));
                continue;
            }
        };

        let location = relative.get(&path).map(PathBuf::as_path).unwrap_or(&path);
        let out = cleaned_output_path(&config.output_dir, location);
        if let Some(first) = claimed.get(&out) {
            let e = CleanupError::Configuration(format!(
                "{} would overwrite the output of {}",
                out.display(),
                first.display()
            ));
            report.failures.push((path, e));
            continue;
        }
        if let Err(e) = write_output(&out, &normalized, config.delimiter) {
            report.failures.push((path, e));
            continue;
        }
        claimed.insert(out.clone(), path.clone());
        if normalized.rows.is_empty() {
            report
                .warnings
                .push(CleanupError::EmptyBatch(path.display().to_string()));
        }
        report.summary.add(&normalized);
        report.written.push(out);
        cleaned.push((path, normalized));
    }

    if let Some(combined) = &config.combined {
        if cleaned.is_empty() {
            warn!("nothing cleaned; skipping combined output");
        } else {
            match merge_tables(&cleaned)
                .and_then(|merged| write_output(combined, &merged, config.delimiter).map(|_| merged))
            {
                Ok(merged) => {
                    info!(
                        "Wrote {} rows from {} tables to {}",
                        merged.rows.len(),
                        cleaned.len(),
                        combined.display()
                    );
                    report.written.push(combined.clone());
                }
                Err(e) => report.failures.push((combined.clone(), e)),
            }
        }
    }

    Ok(report)
}

fn write_output(path: &Path, table: &NormalizedTable, delimiter: u8) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    write_table(path, table, delimiter)
}

/// Concatenates cleaned batches under the union of their columns.
///
/// Rows are keyed by their source path and keep input order within a source;
/// columns follow first-seen order and missing cells are left empty. A batch
/// that already has a `source_file` column cannot be keyed and is rejected.
pub fn merge_tables(tables: &[(PathBuf, NormalizedTable)]) -> Result<NormalizedTable> {
    let mut ordered: Vec<&(PathBuf, NormalizedTable)> = tables.iter().collect();
    ordered.sort_by(|a, b| a.0.cmp(&b.0));

    let mut columns: Vec<String> = vec![SOURCE_COLUMN.to_string()];
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut positions: Vec<Vec<usize>> = Vec::with_capacity(ordered.len());
    for (path, table) in &ordered {
        let mut table_positions = Vec::with_capacity(table.columns.len());
        for column in &table.columns {
            if column == SOURCE_COLUMN {
                return Err(CleanupError::Configuration(format!(
                    "{} already has a '{}' column; cannot combine",
                    path.display(),
                    SOURCE_COLUMN
                )));
            }
            let pos = *index.entry(column.clone()).or_insert_with(|| {
                columns.push(column.clone());
                columns.len() - 1
            });
            table_positions.push(pos);
        }
        positions.push(table_positions);
    }

    let mut merged = NormalizedTable {
        source: SOURCE_COLUMN.to_string(),
        columns,
        ..Default::default()
    };

    for ((path, table), table_positions) in ordered.iter().zip(&positions) {
        for row in &table.rows {
            let mut out = vec![String::new(); merged.columns.len()];
            out[0] = path.display().to_string();
            for (value, &pos) in row.iter().zip(table_positions) {
                out[pos] = value.clone();
            }
            merged.rows.push(out);
        }
        for (tag, count) in &table.tag_presence {
            *merged.tag_presence.entry(tag.clone()).or_insert(0) += count;
        }
        for (tag, count) in &table.unknown_tags {
            *merged.unknown_tags.entry(tag.clone()).or_insert(0) += count;
        }
    }
    Ok(merged)
}
