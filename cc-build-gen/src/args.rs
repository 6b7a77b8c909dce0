use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Demo harness: runs the grouping engine and rule synthesizer against one
/// package directory and prints the resulting rules as JSON.
#[derive(Parser, Debug)]
#[command(name = "cc-build-gen", about, version)]
pub struct Args {
    /// Package directory to scan.
    pub package_dir: PathBuf,

    /// Name to give the package-level library rule in directory mode.
    #[arg(long)]
    pub package_name: Option<String>,

    /// Grouping strategy; overrides the directive-derived default.
    #[arg(long, value_enum)]
    pub grouping_mode: Option<CliGroupingMode>,

    /// Path to a dependency-index JSON file used to resolve non-local
    /// includes.
    #[arg(long)]
    pub dependency_index: Option<PathBuf>,

    /// Treat the package as already declaring a default visibility.
    #[arg(long)]
    pub visibility_declared: bool,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CliGroupingMode {
    Directory,
    Header,
}

impl From<CliGroupingMode> for crate::config::GroupingMode {
    fn from(mode: CliGroupingMode) -> Self {
        match mode {
            CliGroupingMode::Directory => crate::config::GroupingMode::Directory,
            CliGroupingMode::Header => crate::config::GroupingMode::Header,
        }
    }
}
