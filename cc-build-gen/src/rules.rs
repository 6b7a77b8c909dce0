use std::collections::{BTreeMap, BTreeSet};

use cc_build_index::FullDependencyIndex;
use cc_build_lex::{SourceFile, SourceInfo};
use serde::Serialize;

use crate::config::{GroupingConfig, GroupingMode};
use crate::group::build_groups;

const PUBLIC_VISIBILITY: &str = "//visibility:public";

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    Library,
    Binary,
    Test,
}

/// One synthesized build rule, ready for the host framework to emit.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct RuleRecord {
    pub name: String,
    pub kind: RuleKind,
    pub srcs: Vec<String>,
    pub hdrs: Vec<String>,
    pub deps: Vec<String>,
    pub visibility: Option<String>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IncludeKind {
    System,
    Quoted,
}

/// One include observed while building a rule, for the host resolver.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ImportDescriptor {
    pub rule_name: String,
    pub kind: IncludeKind,
    pub normalized_path: String,
}

fn is_test_file(path: &str) -> bool {
    path.contains("_test.")
}

fn package_visibility(package_default_visibility_declared: bool) -> Option<String> {
    if package_default_visibility_declared {
        None
    } else {
        Some(PUBLIC_VISIBILITY.to_string())
    }
}

fn resolve_label(path: &str, index: Option<&FullDependencyIndex>) -> Option<String> {
    index.and_then(|idx| idx.unique.get(path)).map(|label| label.to_string())
}

fn imports_for_file(
    rule_name: &str,
    package_dir: &str,
    info: &SourceInfo,
    out: &mut Vec<ImportDescriptor>,
) {
    for path in &info.includes.double_quote {
        let normalized_path = if package_dir.is_empty() {
            path.clone()
        } else {
            format!("{package_dir}/{path}")
        };
        out.push(ImportDescriptor {
            rule_name: rule_name.to_string(),
            kind: IncludeKind::Quoted,
            normalized_path,
        });
    }
    for path in &info.includes.bracket {
        out.push(ImportDescriptor {
            rule_name: rule_name.to_string(),
            kind: IncludeKind::System,
            normalized_path: path.clone(),
        });
    }
}

fn external_deps(
    info: &SourceInfo,
    local_stems: &BTreeSet<String>,
    index: Option<&FullDependencyIndex>,
) -> BTreeSet<String> {
    let mut deps = BTreeSet::new();
    for path in &info.includes.bracket {
        if let Some(label) = resolve_label(path, index) {
            deps.insert(label);
        }
    }
    for path in &info.includes.double_quote {
        let stem = cc_build_lex::file_stem(path).to_ascii_lowercase();
        if local_stems.contains(&stem) {
            continue;
        }
        if let Some(label) = resolve_label(path, index) {
            deps.insert(label);
        }
    }
    deps
}

/// Emits the binary/test rules common to both grouping modes: one
/// `cc_binary` per `has_main` source, one `cc_test` per `_test.`-named
/// source.
fn synthesize_binaries_and_tests(
    package_dir: &str,
    source_infos: &BTreeMap<SourceFile, SourceInfo>,
    local_stems: &BTreeSet<String>,
    dependency_index: Option<&FullDependencyIndex>,
    visibility: &Option<String>,
    rules: &mut Vec<RuleRecord>,
    imports: &mut Vec<ImportDescriptor>,
) {
    for (file, info) in source_infos {
        if !file.is_source() {
            continue;
        }
        let kind = if info.has_main {
            Some(RuleKind::Binary)
        } else if is_test_file(file.path()) {
            Some(RuleKind::Test)
        } else {
            None
        };
        let Some(kind) = kind else { continue };

        let name = file.stem().to_string();
        imports_for_file(&name, package_dir, info, imports);
        rules.push(RuleRecord {
            name,
            kind,
            srcs: vec![file.path().to_string()],
            hdrs: Vec::new(),
            deps: external_deps(info, local_stems, dependency_index).into_iter().collect(),
            visibility: visibility.clone(),
        });
    }
}

fn local_stems(source_infos: &BTreeMap<SourceFile, SourceInfo>) -> BTreeSet<String> {
    source_infos.keys().map(|f| f.stem().to_ascii_lowercase()).collect()
}

fn directory_mode_library(
    package_name: &str,
    package_dir: &str,
    source_infos: &BTreeMap<SourceFile, SourceInfo>,
    local_stems_set: &BTreeSet<String>,
    dependency_index: Option<&FullDependencyIndex>,
    visibility: &Option<String>,
    imports: &mut Vec<ImportDescriptor>,
) -> RuleRecord {
    let mut srcs = Vec::new();
    let mut hdrs = Vec::new();
    let mut deps: BTreeSet<String> = BTreeSet::new();

    for (file, info) in source_infos {
        if file.is_header() {
            hdrs.push(file.path().to_string());
        } else if file.is_source() && !info.has_main && !is_test_file(file.path()) {
            srcs.push(file.path().to_string());
        } else {
            continue;
        }
        imports_for_file(package_name, package_dir, info, imports);
        deps.extend(external_deps(info, local_stems_set, dependency_index));
    }
    srcs.sort();
    hdrs.sort();

    RuleRecord {
        name: package_name.to_string(),
        kind: RuleKind::Library,
        srcs,
        hdrs,
        deps: deps.into_iter().collect(),
        visibility: visibility.clone(),
    }
}

fn header_mode_libraries(
    package_dir: &str,
    source_infos: &BTreeMap<SourceFile, SourceInfo>,
    local_stems_set: &BTreeSet<String>,
    dependency_index: Option<&FullDependencyIndex>,
    visibility: &Option<String>,
    imports: &mut Vec<ImportDescriptor>,
) -> Result<Vec<RuleRecord>, crate::group::GroupingError> {
    let grouped = build_groups(source_infos)?;
    let mut rules = Vec::new();

    for (group_id, group) in &grouped.groups {
        let mut srcs = Vec::new();
        let mut hdrs = Vec::new();
        let mut deps: BTreeSet<String> = group.depends_on.iter().cloned().collect();

        for file in &group.sources {
            let Some(info) = source_infos.get(file) else { continue };
            if file.is_header() {
                hdrs.push(file.path().to_string());
            } else if file.is_source() && !info.has_main && !is_test_file(file.path()) {
                srcs.push(file.path().to_string());
            } else {
                // A `has_main`/test-named file that the grouping engine
                // merged into this group as an orphan implementation still
                // gets its own cc_binary/cc_test rule below; it must not
                // also be compiled again as part of this library.
                continue;
            }
            imports_for_file(group_id, package_dir, info, imports);
            deps.extend(external_deps(info, local_stems_set, dependency_index));
        }

        rules.push(RuleRecord {
            name: group_id.clone(),
            kind: RuleKind::Library,
            srcs,
            hdrs,
            deps: deps.into_iter().collect(),
            visibility: visibility.clone(),
        });
    }

    Ok(rules)
}

#[derive(Debug, thiserror::Error)]
pub enum SynthesisError {
    #[error(transparent)]
    Grouping(#[from] crate::group::GroupingError),
}

/// Produces the rule set and parallel import descriptors for one package,
/// per the grouping mode carried in `config`.
pub fn synthesize_rules(
    package_name: &str,
    package_dir: &str,
    config: &GroupingConfig,
    source_infos: &BTreeMap<SourceFile, SourceInfo>,
    dependency_index: Option<&FullDependencyIndex>,
    package_default_visibility_declared: bool,
) -> Result<(Vec<RuleRecord>, Vec<ImportDescriptor>), SynthesisError> {
    let visibility = package_visibility(package_default_visibility_declared);
    let local_stems_set = local_stems(source_infos);
    let mut rules = Vec::new();
    let mut imports = Vec::new();

    match config.grouping_mode {
        GroupingMode::Directory => {
            rules.push(directory_mode_library(
                package_name,
                package_dir,
                source_infos,
                &local_stems_set,
                dependency_index,
                &visibility,
                &mut imports,
            ));
        }
        GroupingMode::Header => {
            rules.extend(header_mode_libraries(
                package_dir,
                source_infos,
                &local_stems_set,
                dependency_index,
                &visibility,
                &mut imports,
            )?);
        }
    }

    synthesize_binaries_and_tests(
        package_dir,
        source_infos,
        &local_stems_set,
        dependency_index,
        &visibility,
        &mut rules,
        &mut imports,
    );

    Ok((rules, imports))
}
