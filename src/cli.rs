//! CLI argument parsing and command dispatch

use std::io::Write;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::LevelFilter;

use crate::commands;
use pip_compile_multi::output::OutputConfig;

/// Compile layered Python requirements files with cross-file deduplication
#[derive(Parser, Debug)]
#[command(name = "pip-compile-multi")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Colorize output (always, never, auto)
    #[arg(
        long,
        global = true,
        value_name = "WHEN",
        default_value = "auto",
        value_parser = ["auto", "always", "never"]
    )]
    color: String,

    /// Set log level (off, error, warn, info, debug, trace)
    #[arg(
        long,
        global = true,
        value_name = "LEVEL",
        default_value = "info",
        value_parser = ["off", "error", "warn", "info", "debug", "trace"]
    )]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Lock every environment without upgrading existing pins
    Lock(commands::lock::LockArgs),

    /// Upgrade all packages, or only the listed ones, and lock
    Upgrade(commands::upgrade::UpgradeArgs),

    /// Check that lockfiles were generated from the current input files
    Verify(commands::verify::VerifyArgs),

    /// Display the reference graph of the input files
    Tree(commands::tree::TreeArgs),

    /// Generate shell completion scripts
    Completions(commands::completions::CompletionsArgs),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        let level = init_logging(&self.log_level)?;
        let output = OutputConfig::from_env_and_flag(&self.color);
        let context = commands::CommandContext {
            output,
            progress: level >= LevelFilter::Info,
        };

        match self.command {
            Commands::Lock(args) => commands::lock::execute(args, &context),
            Commands::Upgrade(args) => commands::upgrade::execute(args, &context),
            Commands::Verify(args) => commands::verify::execute(args, &context),
            Commands::Tree(args) => commands::tree::execute(args),
            Commands::Completions(args) => commands::completions::execute(args),
        }
    }
}

/// Log bare messages to stderr, the way resolver output reads.
fn init_logging(level: &str) -> Result<LevelFilter> {
    let filter: LevelFilter = level
        .parse()
        .map_err(|_| anyhow::anyhow!("Invalid log level: {}", level))?;
    env_logger::Builder::new()
        .filter_level(filter)
        .format(|buf, record| writeln!(buf, "{}", record.args()))
        .try_init()
        .context("Failed to initialize logging")?;
    Ok(filter)
}
