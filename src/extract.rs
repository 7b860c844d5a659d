//! Splits a composite annotation string into per-tag values.
//!
//! Segments look like `TAG:value` and are joined with `;`. Values may contain
//! colons and semicolons of their own, so a value only ends where the next
//! recognized tag anchor starts, never at the first delimiter.

use std::collections::HashMap;

use regex::Regex;

use crate::error::{CleanupError, Result};

/// Tag-to-value mapping for one raw annotation string.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub fields: HashMap<String, String>,
    /// Tag-like segments whose name is outside the vocabulary.
    pub unknown: Vec<String>,
    /// Known tags seen more than once; the first value is kept.
    pub duplicates: Vec<String>,
}

impl Extraction {
    pub fn get(&self, tag: &str) -> Option<&str> {
        self.fields.get(tag).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

pub struct FieldExtractor {
    anchor: Regex,
    foreign: Regex,
}

impl FieldExtractor {
    pub fn new<I, S>(tags: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut tags: Vec<String> = tags.into_iter().map(|t| t.as_ref().to_string()).collect();
        if tags.is_empty() {
            return Err(CleanupError::Configuration(
                "field extractor needs at least one tag".to_string(),
            ));
        }
        // Longest first so that a tag never shadows a longer one sharing its prefix.
        tags.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        let alternation = tags
            .iter()
            .map(|t| regex::escape(t))
            .collect::<Vec<_>>()
            .join("|");
        let anchor = Regex::new(&format!(r"(?:^|;)\s*({})\s*:", alternation))
            .map_err(|e| CleanupError::Configuration(format!("invalid tag vocabulary: {}", e)))?;
        let foreign = Regex::new(r"(?:^|;)\s*([^;:,\s]+)\s*:")
            .map_err(|e| CleanupError::Configuration(e.to_string()))?;
        Ok(Self { anchor, foreign })
    }

    pub fn extract(&self, raw: &str) -> Extraction {
        let mut extraction = Extraction::default();
        let anchors: Vec<(usize, usize, &str)> = self
            .anchor
            .captures_iter(raw)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                let tag = caps.get(1)?;
                Some((whole.start(), whole.end(), tag.as_str()))
            })
            .collect();

        // Text ahead of the first known anchor.
        let lead_end = anchors.first().map(|a| a.0).unwrap_or(raw.len());
        for caps in self.foreign.captures_iter(&raw[..lead_end]) {
            if let Some(name) = caps.get(1) {
                extraction.unknown.push(name.as_str().to_string());
            }
        }

        for (i, &(_, value_start, tag)) in anchors.iter().enumerate() {
            let value_end = anchors.get(i + 1).map(|a| a.0).unwrap_or(raw.len());
            let mut slice = &raw[value_start..value_end];

            let mut cut = None;
            for caps in self.foreign.captures_iter(slice) {
                let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                    continue;
                };
                // Only a `;`-led segment can start a new tag inside a value.
                if !whole.as_str().starts_with(';') {
                    continue;
                }
                cut.get_or_insert(whole.start());
                extraction.unknown.push(name.as_str().to_string());
            }
            if let Some(end) = cut {
                slice = &slice[..end];
            }

            let value = slice.trim().trim_end_matches(';').trim_end();
            if extraction.fields.contains_key(tag) {
                extraction.duplicates.push(tag.to_string());
            } else {
                extraction.fields.insert(tag.to_string(), value.to_string());
            }
        }
        extraction
    }
}
