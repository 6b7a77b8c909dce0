//! cc-build-gen
//! ============
//!
//! The source-grouping engine and rule synthesizer that sit downstream of
//! `cc-build-lex`'s per-file parse results, plus a small demo binary that
//! exercises the pipeline end to end against a directory on disk.

#![forbid(unsafe_code)]

pub mod config;
pub mod group;
pub mod rules;

pub use config::{GroupingConfig, GroupingMode};
pub use group::{build_groups, GroupId, GroupingError, SourceGroup, SourceGroups};
pub use rules::{
    synthesize_rules, ImportDescriptor, IncludeKind, RuleKind, RuleRecord, SynthesisError,
};
