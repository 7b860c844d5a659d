//! Maps positional sub-fields onto their final column names and trims values.

use crate::schema::TagSpec;
use crate::split::SubValue;

/// Positional identifier used in diagnostics, e.g. `CIViC_2`.
pub fn positional_name(tag: &str, position: usize) -> String {
    format!("{}_{}", tag, position)
}

pub fn normalize(value: &str) -> String {
    value.trim().to_string()
}

pub fn normalize_row(row: &mut [String]) {
    for value in row.iter_mut() {
        let trimmed = value.trim();
        if trimmed.len() != value.len() {
            *value = trimmed.to_string();
        }
    }
}

/// Pairs each sub-value with its destination column. Positions past the
/// schema's declared fields are returned under their positional name so the
/// caller can reject them.
pub fn rename_subvalues(spec: &TagSpec, subvalues: &[SubValue<'_>]) -> Vec<(String, String)> {
    subvalues
        .iter()
        .enumerate()
        .map(|(position, sub)| {
            let column = spec
                .column_name(position)
                .map(str::to_string)
                .unwrap_or_else(|| positional_name(&spec.tag, position));
            (column, normalize(sub.value))
        })
        .collect()
}
