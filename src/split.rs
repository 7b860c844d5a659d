//! Positional decomposition of one tag value.

use crate::schema::LabelRule;

/// One positional sub-value with its redundant label removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubValue<'a> {
    pub label: Option<&'a str>,
    pub value: &'a str,
}

/// Splits a tag value on commas. Position carries the meaning; nothing is
/// reordered or validated here.
pub fn split_subfields(value: &str) -> Vec<&str> {
    value.split(',').collect()
}

pub fn strip_label<'a>(raw: &'a str, rule: &LabelRule) -> SubValue<'a> {
    match rule {
        LabelRule::Keep => SubValue {
            label: None,
            value: raw,
        },
        LabelRule::Colon => match raw.split_once(':') {
            Some((label, value)) => SubValue {
                label: Some(label.trim()),
                value,
            },
            None => SubValue {
                label: None,
                value: raw,
            },
        },
        LabelRule::Prefix(word) => {
            let trimmed = raw.trim_start();
            match trimmed.strip_prefix(word.as_str()) {
                Some(rest) if rest.is_empty() || rest.starts_with([' ', ':', '\t']) => SubValue {
                    label: Some(&trimmed[..word.len()]),
                    value: rest.trim_start_matches([' ', ':', '\t']),
                },
                _ => SubValue {
                    label: None,
                    value: raw,
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_positionally() {
        assert_eq!(
            split_subfields("Oncogenic,level 3,resistance None"),
            vec!["Oncogenic", "level 3", "resistance None"]
        );
        assert_eq!(split_subfields(""), vec![""]);
        assert_eq!(split_subfields("a,,b"), vec!["a", "", "b"]);
    }

    #[test]
    fn colon_label_is_conditional() {
        let rule = LabelRule::Colon;
        assert_eq!(
            strip_label("diagnostic:3", &rule),
            SubValue {
                label: Some("diagnostic"),
                value: "3"
            }
        );
        assert_eq!(strip_label("3", &rule).label, None);
        assert_eq!(strip_label("3", &rule).value, "3");
        // Only the first colon separates the label.
        assert_eq!(strip_label("score: 0.5:x", &rule).value, " 0.5:x");
    }

    #[test]
    fn prefix_label() {
        let rule = LabelRule::Prefix("level".to_string());
        assert_eq!(strip_label("level 3", &rule).value, "3");
        assert_eq!(strip_label(" level:3", &rule).value, "3");
        assert_eq!(strip_label("level 3", &rule).label, Some("level"));
        assert_eq!(strip_label("levels", &rule).value, "levels");
        assert_eq!(strip_label("3", &rule).label, None);
    }

    #[test]
    fn keep_is_untouched() {
        assert_eq!(strip_label(" Oncogenic ", &LabelRule::Keep).value, " Oncogenic ");
    }
}
