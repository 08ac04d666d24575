//! Dispatch Inspector Binary
//!
//! Run with: `td-inspect [OPTIONS] <COMMAND>`

use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use typedispatch::DispatchConfig;
use typedispatch_inspect::{Inspector, Manifest, Outcome, Resolution};

#[derive(Parser)]
#[command(name = "td-inspect")]
#[command(about = "Inspect type hierarchies and dispatch tables")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Manifest describing the hierarchy and handlers
    #[arg(short, long, global = true, default_value = "dispatch.toml", env = "TD_MANIFEST")]
    manifest: PathBuf,

    /// Dispatch configuration file (TOML)
    #[arg(short = 'c', long, global = true)]
    config: Option<PathBuf>,

    /// Emit JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the linearization of a type against the bound keys
    Mro {
        /// Type name
        ty: String,
    },

    /// Show which handler each type dispatches to
    Resolve {
        /// Type names (all live types if omitted)
        types: Vec<String>,
    },

    /// List the registered handlers
    Table,

    /// Resolve every type and fail on ambiguity
    Check,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(io::stderr)
        .init();

    let config = load_config(cli.config.as_deref())?;
    let manifest = Manifest::load(&cli.manifest)
        .with_context(|| format!("Failed to load manifest: {}", cli.manifest.display()))?;
    let mut inspector = Inspector::from_manifest(&manifest, &config)
        .with_context(|| format!("Failed to apply manifest: {}", cli.manifest.display()))?;
    debug!(types = inspector.types().len(), "manifest loaded");

    match &cli.command {
        Commands::Mro { ty } => cmd_mro(&inspector, ty, cli.json),
        Commands::Resolve { types } => cmd_resolve(&mut inspector, types, cli.json),
        Commands::Table => cmd_table(&inspector, cli.json),
        Commands::Check => cmd_check(&mut inspector, cli.json),
    }
}

fn load_config(path: Option<&Path>) -> Result<DispatchConfig> {
    match path {
        Some(path) => DispatchConfig::load(path)
            .with_context(|| format!("Failed to load config file: {}", path.display())),
        None => Ok(DispatchConfig::default()),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn cmd_mro(inspector: &Inspector, ty: &str, json: bool) -> Result<()> {
    let order = inspector.mro(ty)?;
    if json {
        return print_json(&order);
    }
    println!("{}", order.join(" -> "));
    Ok(())
}

fn cmd_resolve(inspector: &mut Inspector, types: &[String], json: bool) -> Result<()> {
    let resolutions = if types.is_empty() {
        inspector.resolve_all()
    } else {
        types
            .iter()
            .map(|ty| inspector.resolve(ty))
            .collect::<Result<Vec<_>, _>>()?
    };

    if json {
        return print_json(&resolutions);
    }
    for resolution in &resolutions {
        println!("{}", describe(resolution));
    }
    Ok(())
}

fn cmd_table(inspector: &Inspector, json: bool) -> Result<()> {
    let bindings = inspector.bindings();
    if json {
        return print_json(&bindings);
    }
    for binding in &bindings {
        println!("{} ({}) -> {}", binding.key, binding.kind, binding.label);
    }
    Ok(())
}

fn cmd_check(inspector: &mut Inspector, json: bool) -> Result<()> {
    let report = inspector.check();
    if json {
        print_json(&report)?;
    } else {
        for problem in &report.problems {
            warn!("{}", describe(problem));
        }
        info!(
            "Checked {} types, {} failed to resolve",
            report.checked,
            report.problems.len()
        );
    }

    if !report.is_clean() {
        std::process::exit(1);
    }
    Ok(())
}

fn describe(resolution: &Resolution) -> String {
    match &resolution.outcome {
        Outcome::Resolved { label } => format!("{}: {}", resolution.ty, label),
        Outcome::Ambiguous { first, second } => {
            format!("{}: ambiguous ({} or {})", resolution.ty, first, second)
        }
        Outcome::Failed { message } => format!("{}: error: {}", resolution.ty, message),
    }
}
