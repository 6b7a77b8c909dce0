//! The CLI demo harness for `cc-build-gen`: exercises the lexer, grouping
//! engine and rule synthesizer end to end against one directory on disk,
//! standing in for the host build tool which is out of scope here.

#![forbid(unsafe_code)]

mod args;

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info, warn};
use walkdir::WalkDir;

use args::Args;
use cc_build_gen::{synthesize_rules, GroupingConfig, GroupingMode};
use cc_build_index::FullDependencyIndex;
use cc_build_lex::{is_header, is_source, parse_source_file, SourceFile, SourceInfo};

fn scan_package(package_dir: &Path) -> Result<BTreeMap<SourceFile, SourceInfo>> {
    let mut infos = BTreeMap::new();
    for entry in WalkDir::new(package_dir).min_depth(1).max_depth(1) {
        let entry = entry.context("walking package directory")?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().to_string();
        if !is_header(&name) && !is_source(&name) {
            debug!("skipping unrecognized file {name}");
            continue;
        }
        match parse_source_file(path) {
            Ok(info) => {
                infos.insert(SourceFile::new(name), info);
            }
            Err(err) => info!("skipping unparseable file {name}: {err}"),
        }
    }
    Ok(infos)
}

fn load_dependency_index(path: Option<&Path>) -> Result<Option<FullDependencyIndex>> {
    let Some(path) = path else { return Ok(None) };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading dependency index {}", path.display()))?;
    let index = cc_build_index::parse_full(&text)
        .with_context(|| format!("parsing dependency index {}", path.display()))?;
    Ok(Some(index))
}

fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();
    debug!("args = {args:?}");

    let package_name = args
        .package_name
        .clone()
        .or_else(|| args.package_dir.file_name().map(|n| n.to_string_lossy().to_string()))
        .unwrap_or_else(|| "package".to_string());

    let config = GroupingConfig {
        grouping_mode: args.grouping_mode.map(Into::into).unwrap_or(GroupingMode::Directory),
    };

    let source_infos = scan_package(&args.package_dir)?;
    let dependency_index = load_dependency_index(args.dependency_index.as_deref())?;

    let (rules, imports) = synthesize_rules(
        &package_name,
        &args.package_dir.to_string_lossy(),
        &config,
        &source_infos,
        dependency_index.as_ref(),
        args.visibility_declared,
    )
    .context("synthesizing rules")?;

    if rules.is_empty() {
        warn!("no rules synthesized for {}", args.package_dir.display());
    }

    let output = serde_json::json!({ "rules": rules, "imports": imports });
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}
