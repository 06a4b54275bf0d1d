//! Verify command implementation
//!
//! Checks the `# SHA1:` header of every lockfile against its input file.
//! Every configuration section is checked regardless of its `python` key,
//! and sections sharing the same directory and extensions are checked once.
//! Any mismatch makes the command fail.

use std::collections::BTreeSet;

use anyhow::Result;
use clap::Args;

use super::args::{run_options, DiscoveryArgs};
use super::CommandContext;
use pip_compile_multi::output::status;
use pip_compile_multi::phases::discovery::discover;
use pip_compile_multi::suggestions;
use pip_compile_multi::verify::verify_environments;

/// Arguments for the verify command
#[derive(Args, Debug)]
pub struct VerifyArgs {
    #[command(flatten)]
    pub discovery: DiscoveryArgs,
}

/// Execute the verify command
pub fn execute(args: VerifyArgs, context: &CommandContext) -> Result<()> {
    let mut seen = BTreeSet::new();
    let mut checked = 0;
    let mut stale = Vec::new();

    for options in run_options(&args.discovery, None, false)? {
        if !seen.insert(options.run_key()) {
            continue;
        }
        let graph = discover(&options.input_pattern()).map_err(suggestions::explain)?;
        for result in verify_environments(&graph, &options.out_ext).map_err(suggestions::explain)? {
            println!("{} {}", status(&context.output, result.ok), result.outfile.display());
            checked += 1;
            if !result.ok {
                stale.push(result.outfile);
            }
        }
    }

    if !stale.is_empty() {
        anyhow::bail!(
            "{} of {} lockfile(s) are out of date\n\nhint: Run `pip-compile-multi lock` to regenerate them",
            stale.len(),
            checked
        );
    }
    Ok(())
}
