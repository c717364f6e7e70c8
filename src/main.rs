use anyhow::{Context, Result};
use clap::Parser;
use script_capabilities::analyse_tree;
use script_capabilities::config::{config_stub, load_config, AnalysisConfig};
use script_capabilities::render::{
    provide_capability_header, require_capability_header, MetadataReport,
};
use std::path::Path;
use tracing_subscriber::EnvFilter;

mod cli;
use cli::{Command, MetadataArgs, RootArgs};

fn main() -> Result<()> {
    let args = RootArgs::parse();
    match args.command {
        Command::Metadata(args) => cmd_metadata(args),
        Command::Config(_) => cmd_config(),
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn cmd_metadata(args: MetadataArgs) -> Result<()> {
    init_logging(args.verbose);
    let mut config = AnalysisConfig::default();
    if let Some(path) = &args.config {
        config.apply(load_config(path)?);
    }
    config.apply(args.overrides()?);
    config.validate().context("validate configuration")?;
    tracing::debug!(
        root = %args.root.display(),
        search_paths = ?config.search_paths,
        content_package = config.content_package,
        "effective configuration"
    );

    let set = analyse_tree(&args.root, &config)
        .with_context(|| format!("generate capabilities for {}", args.root.display()))?;
    let output = if args.json {
        let report = MetadataReport::new(set, config.missing_requirements_optional);
        let mut text = serde_json::to_string_pretty(&report).context("serialize metadata report")?;
        text.push('\n');
        text
    } else {
        format!(
            "Provide-Capability: {}\nRequire-Capability: {}\n",
            provide_capability_header(&set),
            require_capability_header(&set, config.missing_requirements_optional)
        )
    };
    write_output(args.out.as_deref(), &output)
}

fn cmd_config() -> Result<()> {
    println!("{}", config_stub()?);
    Ok(())
}

fn write_output(out: Option<&Path>, text: &str) -> Result<()> {
    match out {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("create {}", parent.display()))?;
            }
            std::fs::write(path, text).with_context(|| format!("write {}", path.display()))
        }
        None => {
            print!("{text}");
            Ok(())
        }
    }
}
