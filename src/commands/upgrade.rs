//! Upgrade command implementation
//!
//! Without package names every pin may move to the newest allowed version.
//! With package names only those packages are upgraded, and environments
//! whose lockfiles pin none of them are left as they are.

use anyhow::Result;
use clap::Args;

use super::args::{run_options, CompileArgs, DiscoveryArgs};
use super::{lock_all, CommandContext};

/// Arguments for the upgrade command
#[derive(Args, Debug)]
pub struct UpgradeArgs {
    /// Only upgrade these packages
    #[arg(value_name = "PACKAGE")]
    pub packages: Vec<String>,

    #[command(flatten)]
    pub discovery: DiscoveryArgs,

    #[command(flatten)]
    pub compile: CompileArgs,
}

/// Execute the upgrade command
pub fn execute(args: UpgradeArgs, context: &CommandContext) -> Result<()> {
    let mut runs = run_options(&args.discovery, Some(&args.compile), true)?;
    for options in &mut runs {
        options.upgrade = true;
        if !args.packages.is_empty() {
            options.upgrade_packages = args.packages.clone();
        }
    }
    lock_all(runs, &args.compile, context)
}
