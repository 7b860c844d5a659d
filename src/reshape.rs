//! Expands the composite annotation columns of a batch into fixed columns.
//!
//! Reshaping runs in two passes. The first decomposes every record and collects
//! the labels observed at each tag position; an inconsistent label halts the
//! batch before any row is built. The second lays out the batch schema (every
//! declared field of every tag seen) and backfills records missing a tag.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{CleanupError, Result};
use crate::extract::FieldExtractor;
use crate::rename::{normalize_row, positional_name, rename_subvalues};
use crate::schema::{LabelRule, Schema, SourceColumn, SubField, TagSpec};
use crate::split::{split_subfields, strip_label, SubValue};
use crate::table::{NormalizedTable, RawRecord, Table};

/// What to do with a tag outside a column's vocabulary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownTagPolicy {
    Ignore,
    #[default]
    Warn,
    Fail,
}

impl FromStr for UnknownTagPolicy {
    type Err = CleanupError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "ignore" => Ok(Self::Ignore),
            "warn" => Ok(Self::Warn),
            "fail" => Ok(Self::Fail),
            other => Err(CleanupError::Configuration(format!(
                "unknown tag policy '{}' (expected ignore, warn or fail)",
                other
            ))),
        }
    }
}

impl fmt::Display for UnknownTagPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Ignore => "ignore",
            Self::Warn => "warn",
            Self::Fail => "fail",
        };
        f.write_str(name)
    }
}

/// Labels seen at one (column, tag, position).
type LabelKey = (usize, String, usize);

pub struct Reshaper {
    schema: Schema,
    extractors: Vec<FieldExtractor>,
    unknown_tags: UnknownTagPolicy,
}

impl Reshaper {
    pub fn new(schema: Schema, unknown_tags: UnknownTagPolicy) -> Result<Self> {
        schema.validate()?;
        let extractors = schema
            .sources
            .iter()
            .map(|source| FieldExtractor::new(source.tag_names()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            schema,
            extractors,
            unknown_tags,
        })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn extractor(&self, column: &str) -> Option<&FieldExtractor> {
        let idx = self.schema.sources.iter().position(|s| s.column == column)?;
        self.extractors.get(idx)
    }

    pub fn reshape(&self, batch: &Table) -> Result<NormalizedTable> {
        let passthrough: Vec<&String> = batch
            .columns
            .iter()
            .filter(|c| !self.schema.is_source_column(c))
            .collect();

        if batch.is_empty() {
            warn!("{}", CleanupError::EmptyBatch(batch.source.clone()));
            return Ok(NormalizedTable {
                source: batch.source.clone(),
                columns: passthrough.into_iter().cloned().collect(),
                ..Default::default()
            });
        }

        let active: Vec<usize> = self
            .schema
            .sources
            .iter()
            .enumerate()
            .filter_map(|(idx, source)| {
                if batch.has_column(&source.column) {
                    Some(idx)
                } else {
                    debug!(
                        batch = %batch.source,
                        column = %source.column,
                        "source column absent; skipping"
                    );
                    None
                }
            })
            .collect();

        // Pass 1: decompose every record and collect observed labels.
        let mut labels: BTreeMap<LabelKey, BTreeSet<String>> = BTreeMap::new();
        let mut seen: HashSet<(usize, String)> = HashSet::new();
        let mut tag_presence: BTreeMap<String, usize> = BTreeMap::new();
        let mut unknown_tags: BTreeMap<String, usize> = BTreeMap::new();
        let mut derived: Vec<HashMap<String, String>> = Vec::with_capacity(batch.len());

        for (row, record) in batch.records.iter().enumerate() {
            let mut values = HashMap::new();
            for &src in &active {
                let source = &self.schema.sources[src];
                self.decompose_column(
                    src,
                    source,
                    record,
                    row,
                    &mut labels,
                    &mut values,
                    &mut unknown_tags,
                    &mut |tag: &str| {
                        seen.insert((src, tag.to_string()));
                        *tag_presence.entry(tag.to_string()).or_insert(0) += 1;
                    },
                )?;
            }
            derived.push(values);
        }

        for ((src, tag, position), observed) in &labels {
            if observed.len() > 1 {
                return Err(CleanupError::MalformedAnnotation {
                    column: self.schema.sources[*src].column.clone(),
                    tag: tag.clone(),
                    position: *position,
                    details: format!(
                        "{} decomposes to more than one label: {}",
                        positional_name(tag, *position),
                        observed.iter().cloned().collect::<Vec<_>>().join(", ")
                    ),
                });
            }
        }

        // Pass 2: fix the batch schema and backfill.
        let seen = &seen;
        let derived_columns: Vec<&str> = self
            .schema
            .sources
            .iter()
            .enumerate()
            .flat_map(|(src, source)| {
                source
                    .tags
                    .iter()
                    .filter(move |t| seen.contains(&(src, t.tag.clone())))
                    .flat_map(|t| t.fields.iter().map(|f| f.name.as_str()))
            })
            .collect();

        if let Some(clash) = derived_columns
            .iter()
            .find(|name| passthrough.iter().any(|c| c.as_str() == **name))
        {
            return Err(CleanupError::Configuration(format!(
                "derived column '{}' collides with an input column in '{}'",
                clash, batch.source
            )));
        }

        let mut columns: Vec<String> = passthrough.iter().map(|c| c.to_string()).collect();
        columns.extend(derived_columns.iter().map(|c| c.to_string()));

        let rows = batch
            .records
            .iter()
            .zip(derived.iter())
            .map(|(record, values)| {
                let mut row: Vec<String> = passthrough
                    .iter()
                    .map(|c| record.get(c).to_string())
                    .collect();
                row.extend(
                    derived_columns
                        .iter()
                        .map(|c| values.get(*c).cloned().unwrap_or_default()),
                );
                normalize_row(&mut row);
                row
            })
            .collect();

        Ok(NormalizedTable {
            source: batch.source.clone(),
            columns,
            rows,
            tag_presence,
            unknown_tags,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn decompose_column(
        &self,
        src: usize,
        source: &SourceColumn,
        record: &RawRecord,
        row: usize,
        labels: &mut BTreeMap<LabelKey, BTreeSet<String>>,
        values: &mut HashMap<String, String>,
        unknown_tags: &mut BTreeMap<String, usize>,
        on_tag: &mut dyn FnMut(&str),
    ) -> Result<()> {
        let extraction = self.extractors[src].extract(record.get(&source.column));

        for tag in &extraction.unknown {
            match self.unknown_tags {
                UnknownTagPolicy::Fail => {
                    return Err(CleanupError::UnknownTag {
                        column: source.column.clone(),
                        tag: tag.clone(),
                    })
                }
                UnknownTagPolicy::Warn => {
                    warn!(column = %source.column, row, tag = %tag, "dropping unrecognized tag")
                }
                UnknownTagPolicy::Ignore => {}
            }
            *unknown_tags.entry(tag.clone()).or_insert(0) += 1;
        }
        for tag in &extraction.duplicates {
            warn!(column = %source.column, row, tag = %tag, "tag repeated; keeping first value");
        }

        for spec in &source.tags {
            let Some(raw) = extraction.get(&spec.tag) else {
                continue;
            };
            on_tag(&spec.tag);
            let subvalues = decompose_value(spec, raw);
            if subvalues.len() > spec.fields.len() {
                return Err(CleanupError::MalformedAnnotation {
                    column: source.column.clone(),
                    tag: spec.tag.clone(),
                    position: spec.fields.len(),
                    details: format!(
                        "row {} has {} sub-fields, schema declares {}",
                        row + 1,
                        subvalues.len(),
                        spec.fields.len()
                    ),
                });
            }
            for (position, (sub, field)) in subvalues.iter().zip(&spec.fields).enumerate() {
                let Some(label) = sub.label.or_else(|| sibling_prefix(spec, position, sub.value))
                else {
                    continue;
                };
                if let Some(expected) = expected_label(field) {
                    if expected != label {
                        return Err(CleanupError::MalformedAnnotation {
                            column: source.column.clone(),
                            tag: spec.tag.clone(),
                            position,
                            details: format!(
                                "row {} labelled '{}', schema expects '{}'",
                                row + 1,
                                label,
                                expected
                            ),
                        });
                    }
                }
                labels
                    .entry((src, spec.tag.clone(), position))
                    .or_default()
                    .insert(label.to_string());
            }
            values.extend(rename_subvalues(spec, &subvalues));
        }
        Ok(())
    }
}

/// A prefixed sub-value carrying the prefix word of another field of the same
/// tag, e.g. `resistance R1` sitting where `level` belongs.
fn sibling_prefix<'s>(spec: &'s TagSpec, position: usize, raw: &str) -> Option<&'s str> {
    if !matches!(spec.fields.get(position)?.strip, LabelRule::Prefix(_)) {
        return None;
    }
    spec.fields
        .iter()
        .enumerate()
        .filter(|(idx, _)| *idx != position)
        .find_map(|(_, other)| match &other.strip {
            LabelRule::Prefix(word) if strip_label(raw, &other.strip).label.is_some() => {
                Some(word.as_str())
            }
            _ => None,
        })
}

/// Declared label, or the prefix word for prefix-stripped fields.
fn expected_label(field: &SubField) -> Option<&str> {
    match (&field.label, &field.strip) {
        (Some(label), _) => Some(label.as_str()),
        (None, LabelRule::Prefix(word)) => Some(word.as_str()),
        _ => None,
    }
}

fn decompose_value<'a>(spec: &TagSpec, raw: &'a str) -> Vec<SubValue<'a>> {
    let parts = if spec.is_scalar() {
        vec![raw]
    } else {
        split_subfields(raw)
    };
    parts
        .into_iter()
        .enumerate()
        .map(|(position, part)| match spec.fields.get(position) {
            Some(field) => strip_label(part, &field.strip),
            None => SubValue {
                label: None,
                value: part,
            },
        })
        .collect()
}
