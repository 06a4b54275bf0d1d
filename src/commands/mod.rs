//! # CLI Command Implementations
//!
//! Each subcommand of `pip-compile-multi` lives in its own file with an
//! `Args` struct derived with `clap` and an `execute` function. Arguments
//! shared by several commands are in [`args`].
//!
//! `lock` and `upgrade` differ only in whether existing pins may move, so
//! both go through [`lock_all`].

pub mod args;
pub mod completions;
pub mod lock;
pub mod tree;
pub mod upgrade;
pub mod verify;

use std::time::Instant;

use anyhow::Result;
use log::info;

use pip_compile_multi::config::Options;
use pip_compile_multi::output::{emoji, OutputConfig};
use pip_compile_multi::phases::orchestrator;
use pip_compile_multi::resolver::PipCompile;
use pip_compile_multi::suggestions;

use args::CompileArgs;

/// Settings of the invocation that every command may need.
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub output: OutputConfig,
    /// Whether a spinner may be drawn while the resolver runs.
    pub progress: bool,
}

/// Lock every configured run in turn. The first failing run stops the rest.
pub fn lock_all(runs: Vec<Options>, compile: &CompileArgs, context: &CommandContext) -> Result<()> {
    let start = Instant::now();
    let mut locked = 0;
    let mut skipped = 0;

    for options in &runs {
        let mut resolver = PipCompile::from_options(options);
        if !context.progress {
            resolver = resolver.with_progress(false);
        }
        if let Some(program) = &compile.resolver {
            resolver = resolver.with_program(program);
        }
        info!("Locking input files in {}", options.directory.display());
        let summary = orchestrator::recompile(options, &resolver).map_err(suggestions::explain)?;
        locked += summary.locked.len();
        skipped += summary.skipped.len();
    }

    if !runs.is_empty() {
        println!(
            "{} Locked {} environment(s) in {:.2}s{}",
            emoji(&context.output, "🔒", "[LOCKED]"),
            locked,
            start.elapsed().as_secs_f64(),
            if skipped > 0 {
                format!(", {} left unchanged", skipped)
            } else {
                String::new()
            }
        );
    }
    Ok(())
}
