//! xads - inspect and validate transaction manager configuration
//!
//! ```text
//! xads resolve --config xads.toml
//! XADS_NODE_IDENTIFIER=tm-east-1 xads check
//! ```

mod logging;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use xads_recovery::{TransactionEnvironment, TransactionProperties};

use crate::logging::LoggingConfig;

#[derive(Debug, Parser)]
#[command(name = "xads", version, about = "Transactional XA data source configuration")]
struct Cli {
    /// Properties file (defaults to <config dir>/xads/xads.toml)
    #[arg(short, long, global = true, env = "XADS_CONFIG")]
    config: Option<PathBuf>,

    /// Override the node identifier from the properties file
    #[arg(long, global = true, env = "XADS_NODE_IDENTIFIER")]
    node_identifier: Option<String>,

    /// Shorten node identifiers longer than 28 bytes
    #[arg(long, global = true)]
    shorten_node_identifier: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Apply the properties and print the resolved environment as JSON
    Resolve,
    /// Validate and apply the properties without printing the environment
    Check,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut logging = if cli.verbose {
        LoggingConfig::verbose()
    } else {
        LoggingConfig::default()
    };
    logging.json = cli.json_logs;
    logging::init(&logging)?;

    let properties = load_properties(&cli, default_config_path)?;
    properties
        .validate()
        .context("transaction properties are invalid")?;
    let environment = TransactionEnvironment::from_properties(&properties)
        .context("failed to apply transaction properties")?;

    match cli.command {
        Command::Resolve => {
            let json = serde_json::to_string_pretty(&environment)?;
            println!("{}", json);
        }
        Command::Check => {
            println!(
                "ok: node identifier {}, {} recovery node(s)",
                environment.core().node_identifier().unwrap_or("<unset>"),
                environment.jta().xa_recovery_nodes().len()
            );
        }
    }

    Ok(())
}

/// Resolve properties from `--config` or the default file, then apply flag overrides
///
/// An explicit `--config` must exist; a missing default file means defaults.
fn load_properties(
    cli: &Cli,
    default_path: impl FnOnce() -> Result<PathBuf>,
) -> Result<TransactionProperties> {
    let mut properties = match &cli.config {
        Some(path) => read_properties(path)?,
        None => {
            let path = default_path()?;
            if path.exists() {
                read_properties(&path)?
            } else {
                tracing::info!(path = %path.display(), "no properties file, using defaults");
                TransactionProperties::default()
            }
        }
    };

    if let Some(node_identifier) = &cli.node_identifier {
        properties.node_identifier = Some(node_identifier.clone());
    }
    if cli.shorten_node_identifier {
        properties.shorten_node_identifier_if_necessary = true;
    }
    Ok(properties)
}

fn read_properties(path: &Path) -> Result<TransactionProperties> {
    TransactionProperties::load(path)
        .with_context(|| format!("failed to load properties from {}", path.display()))
}

fn default_config_path() -> Result<PathBuf> {
    dirs::config_dir()
        .context("Could not determine config directory")
        .map(|p| p.join("xads").join("xads.toml"))
}
