use std::collections::HashMap;
use std::fmt::Write;

use crate::table::NormalizedTable;

/// Tag occurrence counts accumulated over the batches of one run.
#[derive(Debug, Default, Clone)]
pub struct TagSummary {
    pub batches: usize,
    pub records: usize,
    pub tag_counts: HashMap<String, usize>,
    pub unknown_counts: HashMap<String, usize>,
}

impl TagSummary {
    pub fn add(&mut self, table: &NormalizedTable) {
        self.batches += 1;
        self.records += table.rows.len();
        for (tag, count) in &table.tag_presence {
            *self.tag_counts.entry(tag.clone()).or_insert(0) += count;
        }
        for (tag, count) in &table.unknown_tags {
            *self.unknown_counts.entry(tag.clone()).or_insert(0) += count;
        }
    }

    /// Share of records carrying `tag`, in percent.
    pub fn coverage(&self, tag: &str) -> f64 {
        if self.records == 0 {
            return 0.0;
        }
        let count = self.tag_counts.get(tag).copied().unwrap_or(0);
        count as f64 * 100.0 / self.records as f64
    }

    pub fn report(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Batches cleaned: {}", self.batches);
        let _ = writeln!(out, "Total records: {}", self.records);
        let _ = writeln!(out, "Tags (records carrying each tag):");

        let mut tags_sorted: Vec<_> = self.tag_counts.iter().collect();
        tags_sorted.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        for (tag, count) in tags_sorted {
            let _ = writeln!(
                out,
                "  {:<18} {:>8} records, {:>6.2}%",
                tag,
                count,
                self.coverage(tag)
            );
        }

        if !self.unknown_counts.is_empty() {
            let _ = writeln!(out, "Unrecognized tags (dropped):");
            let mut unknown_sorted: Vec<_> = self.unknown_counts.iter().collect();
            unknown_sorted.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
            for (tag, count) in unknown_sorted {
                let _ = writeln!(out, "  {:<18} {:>8} times", tag, count);
            }
        }
        out
    }
}
