//! # pip-compile-multi CLI
//!
//! This is the binary entry point for the `pip-compile-multi` command-line
//! tool. It parses arguments with `clap` and hands off to the command
//! implementations in `commands`; all locking logic lives in the library
//! crate.

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli.execute()
}
