//! Lock command implementation
//!
//! Compiles every environment while keeping the versions already pinned in
//! existing lockfiles wherever the resolver can.

use anyhow::Result;
use clap::Args;

use super::args::{run_options, CompileArgs, DiscoveryArgs};
use super::{lock_all, CommandContext};

/// Arguments for the lock command
#[derive(Args, Debug)]
pub struct LockArgs {
    #[command(flatten)]
    pub discovery: DiscoveryArgs,

    #[command(flatten)]
    pub compile: CompileArgs,
}

/// Execute the lock command
pub fn execute(args: LockArgs, context: &CommandContext) -> Result<()> {
    let mut runs = run_options(&args.discovery, Some(&args.compile), true)?;
    for options in &mut runs {
        options.upgrade = false;
        options.upgrade_packages.clear();
    }
    lock_all(runs, &args.compile, context)
}
