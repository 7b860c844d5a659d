//! Tag schema for composite annotation columns.
//!
//! Each source column carries a closed vocabulary of tags. Every tag value is
//! split on commas and each position maps to one final column name. The table
//! is explicit and versioned so that observed data can be checked against it
//! before any output is written.

use std::collections::HashSet;

use serde::Deserialize;

use crate::error::{CleanupError, Result};

/// How a redundant label is removed from a sub-value.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LabelRule {
    /// Keep the sub-value as is.
    #[default]
    Keep,
    /// Strip `label:` when the sub-value contains a colon.
    Colon,
    /// Strip a leading word followed by a space or colon, e.g. `level 3`.
    Prefix(String),
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct SubField {
    /// Final output column name.
    pub name: String,
    #[serde(default)]
    pub strip: LabelRule,
    /// Expected field-name label; observed labels must match when set.
    #[serde(default)]
    pub label: Option<String>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct TagSpec {
    pub tag: String,
    pub fields: Vec<SubField>,
}

impl TagSpec {
    /// Final column name for sub-field `position`, if the schema declares one.
    pub fn column_name(&self, position: usize) -> Option<&str> {
        self.fields.get(position).map(|f| f.name.as_str())
    }

    /// Single-field tags keep their whole value; commas are not split.
    pub fn is_scalar(&self) -> bool {
        self.fields.len() == 1
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct SourceColumn {
    pub column: String,
    pub tags: Vec<TagSpec>,
}

impl SourceColumn {
    pub fn tag(&self, tag: &str) -> Option<&TagSpec> {
        self.tags.iter().find(|t| t.tag == tag)
    }

    pub fn tag_names(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(|t| t.tag.as_str())
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct Schema {
    pub version: u32,
    pub sources: Vec<SourceColumn>,
}

impl Default for Schema {
    fn default() -> Self {
        Self::cbioportal()
    }
}

fn keep(name: &str) -> SubField {
    SubField {
        name: name.to_string(),
        strip: LabelRule::Keep,
        label: None,
    }
}

fn colon(name: &str) -> SubField {
    SubField {
        name: name.to_string(),
        strip: LabelRule::Colon,
        label: None,
    }
}

fn prefixed(name: &str, word: &str) -> SubField {
    SubField {
        name: name.to_string(),
        strip: LabelRule::Prefix(word.to_string()),
        label: None,
    }
}

fn tag(tag: &str, fields: Vec<SubField>) -> TagSpec {
    TagSpec {
        tag: tag.to_string(),
        fields,
    }
}

impl Schema {
    /// Layout of the mutation tables exported from the cBioPortal gene pages.
    pub fn cbioportal() -> Self {
        let annotation = SourceColumn {
            column: "Annotation".to_string(),
            tags: vec![
                tag(
                    "OncoKB",
                    vec![
                        keep("OncoKB"),
                        prefixed("OncoKB_level", "level"),
                        prefixed("OncoKB_resistance", "resistance"),
                    ],
                ),
                tag(
                    "CIViC",
                    vec![
                        colon("CIViC_diagnosticCount"),
                        colon("CIViC_predictiveCount"),
                        colon("CIViC_prognosticCount"),
                        colon("CIViC_predisposingCount"),
                        colon("CIViC_oncogenicCount"),
                        colon("CIViC_functionalCount"),
                    ],
                ),
                tag("CancerHotspot", vec![keep("CancerHotspot")]),
                tag("3DHotspot", vec![keep("3DHotspot")]),
                tag("reVUE", vec![keep("reVUE")]),
            ],
        };
        let impact = SourceColumn {
            column: "Functional Impact".to_string(),
            tags: vec![
                tag(
                    "MutationAssessor",
                    vec![colon("MutationAssessor_impact"), colon("MutationAssessor_score")],
                ),
                tag("SIFT", vec![colon("SIFT_impact"), colon("SIFT_score")]),
                tag(
                    "Polyphen-2",
                    vec![colon("Polyphen-2_impact"), colon("Polyphen-2_score")],
                ),
                tag(
                    "AlphaMissense",
                    vec![
                        colon("AlphaMissense_pathogenicity"),
                        colon("AlphaMissense_score"),
                    ],
                ),
            ],
        };
        Schema {
            version: 1,
            sources: vec![annotation, impact],
        }
    }

    pub fn source(&self, column: &str) -> Option<&SourceColumn> {
        self.sources.iter().find(|s| s.column == column)
    }

    pub fn is_source_column(&self, column: &str) -> bool {
        self.source(column).is_some()
    }

    /// Every final column name, in output order.
    pub fn derived_columns(&self) -> impl Iterator<Item = &str> {
        self.sources
            .iter()
            .flat_map(|s| s.tags.iter())
            .flat_map(|t| t.fields.iter())
            .map(|f| f.name.as_str())
    }

    pub fn validate(&self) -> Result<()> {
        if self.sources.is_empty() {
            return Err(CleanupError::Configuration(
                "schema declares no source columns".to_string(),
            ));
        }
        let mut columns = HashSet::new();
        for source in &self.sources {
            if !columns.insert(source.column.as_str()) {
                return Err(CleanupError::Configuration(format!(
                    "source column '{}' is declared twice",
                    source.column
                )));
            }
            let mut tags = HashSet::new();
            for spec in &source.tags {
                if spec.tag.trim().is_empty() {
                    return Err(CleanupError::Configuration(format!(
                        "column '{}' declares an empty tag",
                        source.column
                    )));
                }
                if !tags.insert(spec.tag.as_str()) {
                    return Err(CleanupError::Configuration(format!(
                        "tag '{}' is declared twice in column '{}'",
                        spec.tag, source.column
                    )));
                }
                if spec.fields.is_empty() {
                    return Err(CleanupError::Configuration(format!(
                        "tag '{}' declares no fields",
                        spec.tag
                    )));
                }
            }
        }
        let mut names = HashSet::new();
        for name in self.derived_columns() {
            if !names.insert(name) {
                return Err(CleanupError::Configuration(format!(
                    "derived column '{}' is declared twice",
                    name
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_schema_is_valid() {
        let schema = Schema::cbioportal();
        schema.validate().unwrap();
        assert_eq!(schema.derived_columns().count(), 3 + 6 + 3 + 8);
    }

    #[test]
    fn builtin_rename_table() {
        let schema = Schema::cbioportal();
        let annotation = schema.source("Annotation").unwrap();
        let oncokb = annotation.tag("OncoKB").unwrap();
        assert_eq!(oncokb.column_name(0), Some("OncoKB"));
        assert_eq!(oncokb.column_name(1), Some("OncoKB_level"));
        assert_eq!(oncokb.column_name(2), Some("OncoKB_resistance"));
        assert_eq!(oncokb.column_name(3), None);

        let civic = annotation.tag("CIViC").unwrap();
        assert_eq!(civic.column_name(0), Some("CIViC_diagnosticCount"));
        assert_eq!(civic.column_name(5), Some("CIViC_functionalCount"));

        let impact = schema.source("Functional Impact").unwrap();
        let am = impact.tag("AlphaMissense").unwrap();
        assert_eq!(am.column_name(0), Some("AlphaMissense_pathogenicity"));
        assert_eq!(am.column_name(1), Some("AlphaMissense_score"));
        assert!(annotation.tag("reVUE").unwrap().is_scalar());
    }

    #[test]
    fn duplicate_derived_name_is_rejected() {
        let mut schema = Schema::cbioportal();
        schema.sources[1].tags[0].fields[0].name = "OncoKB".to_string();
        assert!(matches!(
            schema.validate(),
            Err(CleanupError::Configuration(_))
        ));
    }

    #[test]
    fn duplicate_tag_is_rejected() {
        let mut schema = Schema::cbioportal();
        let again = schema.sources[0].tags[0].clone();
        schema.sources[0].tags.push(again);
        assert!(schema.validate().is_err());
    }
}
