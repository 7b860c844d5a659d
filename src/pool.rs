//! Input discovery and the bounded reader pool.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{CleanupError, Result};
use crate::table::{read_table, Table};

fn is_table_file(path: &Path) -> bool {
    let name = match path.file_name() {
        Some(n) => n.to_string_lossy().to_ascii_lowercase(),
        None => return false,
    };
    let name = name.strip_suffix(".gz").unwrap_or(&name);
    name.ends_with(".tsv") && !name.ends_with("_cleaned.tsv")
}

/// One discovered table and its location relative to the folder it was found
/// under. Outputs mirror `relative` so same-named tables in different
/// folders stay apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputTable {
    pub path: PathBuf,
    pub relative: PathBuf,
}

/// Expands folders into the `*.tsv` / `*.tsv.gz` files beneath them. Plain
/// file arguments are kept even when missing so the read reports them.
pub fn discover_inputs(paths: &[PathBuf]) -> Result<Vec<InputTable>> {
    let mut found = Vec::new();
    for path in paths {
        if path.is_dir() {
            for entry in WalkDir::new(path).follow_links(false) {
                match entry {
                    Ok(entry) => {
                        if entry.file_type().is_file() && is_table_file(entry.path()) {
                            let relative = entry
                                .path()
                                .strip_prefix(path)
                                .map(Path::to_path_buf)
                                .unwrap_or_else(|_| entry.path().to_path_buf());
                            found.push(InputTable {
                                path: entry.path().to_path_buf(),
                                relative,
                            });
                        }
                    }
                    Err(e) => warn!(root = %path.display(), "skipping unreadable entry: {}", e),
                }
            }
        } else {
            let relative = path
                .file_name()
                .map(PathBuf::from)
                .unwrap_or_else(|| path.clone());
            found.push(InputTable {
                path: path.clone(),
                relative,
            });
        }
    }
    found.sort_by(|a, b| a.path.cmp(&b.path));
    found.dedup_by(|a, b| a.path == b.path);
    if found.is_empty() {
        return Err(CleanupError::Configuration(format!(
            "no tables found under {}",
            paths
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        )));
    }
    debug!(count = found.len(), "discovered input tables");
    Ok(found)
}

/// Reads every input on a pool of `workers` threads.
///
/// Results are keyed by path, so the order is independent of completion
/// order. A failed read stays in its own entry and never stops its siblings;
/// the caller reports it.
pub fn read_tables(
    paths: &[PathBuf],
    workers: usize,
    delimiter: u8,
) -> Result<BTreeMap<PathBuf, Result<Table>>> {
    let pool = ThreadPoolBuilder::new()
        .num_threads(workers.max(1))
        .thread_name(|i| format!("reader-{}", i))
        .build()
        .map_err(|e| CleanupError::Configuration(format!("could not start reader pool: {}", e)))?;

    let results: Vec<(PathBuf, Result<Table>)> = pool.install(|| {
        paths
            .par_iter()
            .map(|path| (path.clone(), read_table(path, delimiter)))
            .collect()
    });

    Ok(results.into_iter().collect())
}
