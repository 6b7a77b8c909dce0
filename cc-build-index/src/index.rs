use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::label::Label;

/// Mapping from include-path string to the one label that resolves it.
pub type UniqueDependencyIndex = BTreeMap<String, Label>;

/// An ordered, duplicate-free sequence of two or more labels flagged as
/// ambiguous for one include path.
pub type AmbiguousTargets = Vec<Label>;

/// Mapping from include-path string to its ambiguous target list.
pub type AmbiguousDependencyIndex = BTreeMap<String, AmbiguousTargets>;

/// The on-disk dependency index: header include path -> one label, or a
/// list of labels flagged as ambiguous within one module or across
/// modules. See the cross-section invariants enforced by [`parse_full`].
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct FullDependencyIndex {
    #[serde(default)]
    pub unique: UniqueDependencyIndex,
    #[serde(default)]
    pub ambiguous_within_module: AmbiguousDependencyIndex,
    #[serde(default)]
    pub ambiguous_across_modules: AmbiguousDependencyIndex,
}

#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("invalid dependency index JSON: {0}")]
    Json(String),
    #[error("{0}")]
    LabelParse(String),
    #[error("ambiguous targets must contain at least 2 elements, got {0}")]
    TooFewTargets(usize),
    #[error("duplicate targets in list {list}: {duplicates}")]
    DuplicateTargets { list: String, duplicates: String },
    #[error("should share same repo in list {0}")]
    WithinModuleRepoMismatch(String),
    #[error("should span multiple repos in list {0}")]
    AcrossModulesRepoSpanTooNarrow(String),
    #[error("header present in multiple sections: {0}")]
    HeaderInMultipleSections(String),
}

fn fmt_label_list(labels: &[Label]) -> String {
    let inner = labels
        .iter()
        .map(|l| l.to_string())
        .collect::<Vec<_>>()
        .join(" ");
    format!("[{inner}]")
}

fn fmt_str_list<S: AsRef<str>>(items: &[S]) -> String {
    let inner = items
        .iter()
        .map(|s| s.as_ref())
        .collect::<Vec<_>>()
        .join(" ");
    format!("[{inner}]")
}

/// Parses the full three-section JSON form, enforcing the §4.C
/// cross-section invariants (first failure wins, in the order listed).
pub fn parse_full(json: &str) -> Result<FullDependencyIndex, IndexError> {
    let value: Value =
        serde_json::from_str(json).map_err(|e| IndexError::Json(e.to_string()))?;
    let obj = value
        .as_object()
        .ok_or_else(|| IndexError::Json("expected a JSON object".to_string()))?;

    let unique = parse_unique_section(obj.get("unique"))?;
    let ambiguous_within_module =
        parse_ambiguous_section(obj.get("ambiguous_within_module"))?;
    let ambiguous_across_modules =
        parse_ambiguous_section(obj.get("ambiguous_across_modules"))?;

    let index = FullDependencyIndex {
        unique,
        ambiguous_within_module,
        ambiguous_across_modules,
    };
    validate(&index)?;
    Ok(index)
}

/// Parses the flat `{header: label}` form, validating only that each label
/// parses (step 1 of §4.C's invariant list does not apply — there is only
/// one section).
pub fn parse_unique(json: &str) -> Result<UniqueDependencyIndex, IndexError> {
    let value: Value =
        serde_json::from_str(json).map_err(|e| IndexError::Json(e.to_string()))?;
    parse_unique_section(Some(&value))
}

fn parse_unique_section(
    value: Option<&Value>,
) -> Result<UniqueDependencyIndex, IndexError> {
    let mut map = BTreeMap::new();
    let Some(value) = value else {
        return Ok(map);
    };
    let obj = value
        .as_object()
        .ok_or_else(|| IndexError::Json("expected a JSON object".to_string()))?;
    for (header, label_value) in obj {
        let text = label_value.as_str().ok_or_else(|| {
            IndexError::Json(format!("value for '{header}' must be a string"))
        })?;
        let label = Label::parse(text).map_err(IndexError::LabelParse)?;
        map.insert(header.clone(), label);
    }
    Ok(map)
}

fn parse_ambiguous_section(
    value: Option<&Value>,
) -> Result<AmbiguousDependencyIndex, IndexError> {
    let mut map = BTreeMap::new();
    let Some(value) = value else {
        return Ok(map);
    };
    let obj = value
        .as_object()
        .ok_or_else(|| IndexError::Json("expected a JSON object".to_string()))?;
    for (header, list_value) in obj {
        let items = list_value.as_array().ok_or_else(|| {
            IndexError::Json(format!("value for '{header}' must be an array"))
        })?;
        let mut labels = Vec::with_capacity(items.len());
        for item in items {
            let text = item.as_str().ok_or_else(|| {
                IndexError::Json(format!(
                    "entries for '{header}' must be label strings"
                ))
            })?;
            labels.push(Label::parse(text).map_err(IndexError::LabelParse)?);
        }
        map.insert(header.clone(), labels);
    }
    Ok(map)
}

fn validate(index: &FullDependencyIndex) -> Result<(), IndexError> {
    // Step 1: every ambiguous list has at least 2 elements.
    for labels in index
        .ambiguous_within_module
        .values()
        .chain(index.ambiguous_across_modules.values())
    {
        if labels.len() < 2 {
            return Err(IndexError::TooFewTargets(labels.len()));
        }
    }

    // Step 2: no list has duplicate labels.
    for labels in index
        .ambiguous_within_module
        .values()
        .chain(index.ambiguous_across_modules.values())
    {
        let mut seen: Vec<&Label> = Vec::new();
        let mut duplicates: Vec<Label> = Vec::new();
        for label in labels {
            if seen.contains(&label) {
                if !duplicates.contains(label) {
                    duplicates.push(label.clone());
                }
            } else {
                seen.push(label);
            }
        }
        if !duplicates.is_empty() {
            return Err(IndexError::DuplicateTargets {
                list: fmt_label_list(labels),
                duplicates: fmt_label_list(&duplicates),
            });
        }
    }

    // Step 3: ambiguous_within_module lists share one repo.
    for labels in index.ambiguous_within_module.values() {
        let first_repo = &labels[0].repo;
        if labels.iter().any(|l| &l.repo != first_repo) {
            return Err(IndexError::WithinModuleRepoMismatch(fmt_label_list(labels)));
        }
    }

    // Step 4: ambiguous_across_modules lists span at least 2 repos.
    for labels in index.ambiguous_across_modules.values() {
        let first_repo = &labels[0].repo;
        if labels.iter().all(|l| &l.repo == first_repo) {
            return Err(IndexError::AcrossModulesRepoSpanTooNarrow(fmt_label_list(
                labels,
            )));
        }
    }

    // Step 5: the three header sets are pairwise disjoint.
    let mut counts: BTreeMap<&str, u32> = BTreeMap::new();
    for header in index
        .unique
        .keys()
        .chain(index.ambiguous_within_module.keys())
        .chain(index.ambiguous_across_modules.keys())
    {
        *counts.entry(header.as_str()).or_insert(0) += 1;
    }
    let overlapping: Vec<&str> = counts
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|(header, _)| header)
        .collect();
    if !overlapping.is_empty() {
        return Err(IndexError::HeaderInMultipleSections(fmt_str_list(
            &overlapping,
        )));
    }

    Ok(())
}

/// Pretty-prints a [`FullDependencyIndex`] with two-space indentation and
/// the three top-level keys in fixed order. This output is the canonical
/// on-disk form.
pub fn encode(index: &FullDependencyIndex) -> String {
    serde_json::to_string_pretty(index)
        .expect("FullDependencyIndex serialization is infallible")
}

#[cfg(test)]
mod index_tests {
    use super::*;
    use crate::label::Label;
    use rstest::*;

    #[rstest]
    fn parse_unique_round_trips_through_full_index() {
        let json = r#"{"unique":{"h.h":"@r//p:t"}}"#;
        let index = parse_full(json).unwrap();
        assert_eq!(index.unique.get("h.h"), Some(&Label::new("r", "p", "t")));
        let encoded = encode(&index);
        let reparsed = parse_full(&encoded).unwrap();
        assert_eq!(reparsed, index);
    }

    #[rstest]
    fn parse_unique_flat_form() {
        let json = r#"{"h.h":"@r//p:t"}"#;
        let map = parse_unique(json).unwrap();
        assert_eq!(map.get("h.h"), Some(&Label::new("r", "p", "t")));
    }

    #[rstest]
    fn too_few_ambiguous_targets_is_rejected() {
        let json = r#"{"ambiguous_within_module":{"h.h":["@r//p:t"]}}"#;
        let err = parse_full(json).unwrap_err();
        assert_eq!(
            err.to_string(),
            "ambiguous targets must contain at least 2 elements, got 1"
        );
    }

    #[rstest]
    fn header_in_multiple_sections_is_rejected() {
        let json = r#"{
            "unique": {"h.h": "@r//p:t"},
            "ambiguous_within_module": {"h.h": ["@r//p:a", "@r//p:b"]}
        }"#;
        let err = parse_full(json).unwrap_err();
        assert_eq!(err.to_string(), "header present in multiple sections: [h.h]");
    }

    #[rstest]
    fn within_module_list_must_share_repo() {
        let json = r#"{"ambiguous_within_module":{"h.h":["@r1//p:a","@r2//p:b"]}}"#;
        let err = parse_full(json).unwrap_err();
        assert!(err.to_string().starts_with("should share same repo"));
    }

    #[rstest]
    fn across_modules_list_must_span_multiple_repos() {
        let json = r#"{"ambiguous_across_modules":{"h.h":["@r//p:a","@r//p:b"]}}"#;
        let err = parse_full(json).unwrap_err();
        assert!(err.to_string().starts_with("should span multiple repos"));
    }

    #[rstest]
    fn duplicate_targets_are_rejected() {
        let json = r#"{"ambiguous_within_module":{"h.h":["@r//p:a","@r//p:a"]}}"#;
        let err = parse_full(json).unwrap_err();
        assert!(err.to_string().starts_with("duplicate targets in list"));
    }

    #[rstest]
    fn empty_sections_encode_as_empty_objects() {
        let index = FullDependencyIndex::default();
        let encoded = encode(&index);
        assert!(encoded.contains("\"unique\": {}"));
        assert!(encoded.contains("\"ambiguous_within_module\": {}"));
        assert!(encoded.contains("\"ambiguous_across_modules\": {}"));
    }
}
