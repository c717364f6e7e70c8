//! CLI argument parsing for `scap`.
//!
//! The CLI only assembles configuration overrides; every analysis decision
//! lives in the library.
use anyhow::Result;
use clap::{Parser, Subcommand};
use script_capabilities::config::{parse_mapping, ConfigOverrides};
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "scap",
    version,
    about = "Derive resource type capabilities from a script tree",
    after_help = "Examples:\n  scap metadata --root src/main/scripts\n  scap metadata --root jcr_root --content-package --json --out capabilities.json\n  scap config > scap.json",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    Metadata(MetadataArgs),
    Config(ConfigArgs),
}

/// Metadata command inputs.
#[derive(Parser, Debug)]
#[command(about = "Analyse a script tree and print its capability headers")]
pub struct MetadataArgs {
    /// Scripts directory whose sub-paths encode resource types
    #[arg(long, value_name = "DIR")]
    pub root: PathBuf,

    /// JSON config file applied over the defaults
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Search path prefix (repeatable; replaces the configured list)
    #[arg(long = "search-path", value_name = "PATH")]
    pub search_paths: Vec<String>,

    /// Script engine mapping as ext:engine (repeatable or comma separated)
    #[arg(long = "script-engine", value_name = "EXT:ENGINE", value_delimiter = ',')]
    pub script_engines: Vec<String>,

    /// Render unresolved requirements as mandatory
    #[arg(long)]
    pub strict_requirements: bool,

    /// Treat file names as content-package platform names
    #[arg(long)]
    pub content_package: bool,

    /// Glob of files to include (repeatable; replaces the configured list)
    #[arg(long = "include", value_name = "GLOB")]
    pub includes: Vec<String>,

    /// Glob of files and folders to exclude (repeatable; replaces the configured list)
    #[arg(long = "exclude", value_name = "GLOB")]
    pub excludes: Vec<String>,

    /// Emit the JSON report instead of headers
    #[arg(long)]
    pub json: bool,

    /// Write output to a file instead of stdout
    #[arg(long, value_name = "FILE")]
    pub out: Option<PathBuf>,

    /// Log analysis decisions to stderr
    #[arg(long)]
    pub verbose: bool,
}

/// Config command inputs.
#[derive(Parser, Debug)]
#[command(about = "Print the default configuration as JSON")]
pub struct ConfigArgs {}

impl MetadataArgs {
    /// Command line flags as config overrides; unset flags leave the config alone.
    pub fn overrides(&self) -> Result<ConfigOverrides> {
        let mappings = self
            .script_engines
            .iter()
            .map(|entry| parse_mapping(entry))
            .collect::<Result<BTreeMap<_, _>>>()?;
        Ok(ConfigOverrides {
            search_paths: non_empty(&self.search_paths),
            script_engine_mappings: (!mappings.is_empty()).then_some(mappings),
            missing_requirements_optional: self.strict_requirements.then_some(false),
            includes: non_empty(&self.includes),
            excludes: non_empty(&self.excludes),
            content_package: self.content_package.then_some(true),
        })
    }
}

fn non_empty(values: &[String]) -> Option<Vec<String>> {
    (!values.is_empty()).then(|| values.to_vec())
}
