//! Arguments shared by several commands, and how they combine with
//! configuration files into the options of each run.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Args;
use log::{debug, info};

use pip_compile_multi::config::{self, Options, Section};
use pip_compile_multi::suggestions;

/// Where input files are found.
#[derive(Args, Debug, Clone, Default)]
pub struct DiscoveryArgs {
    /// Directory holding the input files [default: requirements]
    #[arg(short, long, value_name = "DIR")]
    pub directory: Option<PathBuf>,

    /// Extension of input files [default: in]
    #[arg(short, long, value_name = "EXT")]
    pub in_ext: Option<String>,

    /// Extension of lockfiles [default: txt]
    #[arg(short, long, value_name = "EXT")]
    pub out_ext: Option<String>,

    /// Python version used to select configuration sections
    #[arg(long, value_name = "VERSION", env = "PIP_COMPILE_MULTI_PYTHON")]
    pub python_version: Option<String>,
}

impl DiscoveryArgs {
    fn apply(&self, options: &mut Options) {
        if let Some(directory) = &self.directory {
            options.directory = directory.clone();
        }
        if let Some(in_ext) = &self.in_ext {
            options.in_ext = in_ext.clone();
        }
        if let Some(out_ext) = &self.out_ext {
            options.out_ext = out_ext.clone();
        }
    }
}

/// How lockfiles are compiled and rewritten.
#[derive(Args, Debug, Clone, Default)]
pub struct CompileArgs {
    /// File whose contents replace the default lockfile header
    #[arg(short = 't', long = "header", value_name = "FILE")]
    pub header: Option<PathBuf>,

    /// Pin packages matching this glob with ~= instead of ==
    #[arg(short = 'c', long, value_name = "PATTERN")]
    pub compatible: Vec<String>,

    /// Do not check versions of packages matching this glob for conflicts
    #[arg(long, value_name = "PATTERN")]
    pub unchecked: Vec<String>,

    /// Drop .postN suffixes in the lockfile of this environment
    #[arg(short = 'p', long, value_name = "ENV")]
    pub forbid_post: Vec<String>,

    /// Generate hashes for this environment and every environment connected
    /// to it through references
    #[arg(short = 'g', long, value_name = "ENV")]
    pub generate_hashes: Vec<String>,

    /// Only compile environments with this name, plus their references
    #[arg(short = 'n', long, value_name = "ENV")]
    pub only_name: Vec<String>,

    /// Only compile this input file, plus its references
    #[arg(long, value_name = "PATH")]
    pub only_path: Vec<PathBuf>,

    /// Let the resolver reuse its cache instead of passing --rebuild
    #[arg(long)]
    pub use_cache: bool,

    /// Pin packages considered unsafe in a requirements file
    #[arg(long)]
    pub allow_unsafe: bool,

    /// Leave extras out of pinned requirements
    #[arg(long)]
    pub strip_extras: bool,

    /// Disable isolation when building source distributions
    #[arg(long)]
    pub no_build_isolation: bool,

    /// Use the backtracking resolver of pip-tools
    #[arg(long, conflicts_with = "legacy_resolver")]
    pub backtracking: bool,

    /// Use the legacy resolver of pip-tools
    #[arg(long)]
    pub legacy_resolver: bool,

    /// Write the index URL into lockfiles
    #[arg(long)]
    pub annotate_index: bool,

    /// Do not write trusted hosts into lockfiles
    #[arg(long)]
    pub no_emit_trusted_host: bool,

    /// Additional package index URL
    #[arg(long, value_name = "URL")]
    pub extra_index_url: Vec<String>,

    /// Remove constraint files from "via" comments
    #[arg(long)]
    pub skip_constraints: bool,

    /// Constrain every environment by the one that references all others
    #[arg(long)]
    pub autoresolve: bool,

    /// Show resolver output while it runs
    #[arg(long)]
    pub live: bool,

    /// Compile with `uv pip compile` instead of pip-compile
    #[arg(long)]
    pub uv: bool,

    /// Kill the resolver after this many seconds
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<u64>,

    /// Run this executable in place of pip-compile or uv
    #[arg(long, value_name = "PROGRAM", env = "PIP_COMPILE_MULTI_RESOLVER")]
    pub resolver: Option<PathBuf>,
}

impl CompileArgs {
    /// Layer command-line values over what configuration set.
    fn apply(&self, options: &mut Options) {
        if let Some(header) = &self.header {
            options.header_file = Some(header.clone());
        }
        if !self.compatible.is_empty() {
            options.compatible = self.compatible.clone();
        }
        if !self.unchecked.is_empty() {
            options.unchecked = self.unchecked.clone();
        }
        if !self.forbid_post.is_empty() {
            options.forbid_post = set(&self.forbid_post);
        }
        if !self.generate_hashes.is_empty() {
            options.generate_hashes = set(&self.generate_hashes);
        }
        if !self.only_name.is_empty() {
            options.only_names = set(&self.only_name);
        }
        if !self.only_path.is_empty() {
            options.only_paths = self.only_path.iter().cloned().collect();
        }
        if !self.extra_index_url.is_empty() {
            options.extra_index_urls = self.extra_index_url.clone();
        }
        if self.backtracking {
            options.backtracking = Some(true);
        } else if self.legacy_resolver {
            options.backtracking = Some(false);
        }
        if let Some(seconds) = self.timeout {
            options.timeout = (seconds > 0).then(|| std::time::Duration::from_secs(seconds));
        }

        options.use_cache |= self.use_cache;
        options.allow_unsafe |= self.allow_unsafe;
        options.strip_extras |= self.strip_extras;
        options.build_isolation &= !self.no_build_isolation;
        options.annotate_index |= self.annotate_index;
        options.emit_trusted_host &= !self.no_emit_trusted_host;
        options.skip_constraints |= self.skip_constraints;
        options.autoresolve |= self.autoresolve;
        options.live |= self.live;
        options.uv |= self.uv;
    }
}

fn set(values: &[String]) -> BTreeSet<String> {
    values.iter().cloned().collect()
}

/// Options for every run: one per matching configuration section, or a
/// single run with defaults when there is no configuration.
///
/// With `filter_python` unset all sections are used, whatever their `python`
/// key says.
pub fn run_options(
    discovery: &DiscoveryArgs,
    compile: Option<&CompileArgs>,
    filter_python: bool,
) -> Result<Vec<Options>> {
    let sections = config::read_sections(Path::new(".")).map_err(suggestions::explain)?;
    let sections = if filter_python {
        let version = python_version(discovery, &sections);
        debug!("Selecting configuration sections for Python {:?}", version);
        config::filter_sections(sections, version.as_deref())
    } else {
        (!sections.is_empty()).then_some(sections)
    };

    let sections = match sections {
        None => vec![None],
        Some(sections) if sections.is_empty() => {
            info!("No configuration section matches this Python version. Nothing to do.");
            return Ok(Vec::new());
        }
        Some(sections) => sections.into_iter().map(Some).collect(),
    };

    let mut runs = Vec::with_capacity(sections.len());
    for section in sections {
        let mut options = Options::default();
        if let Some(section) = &section {
            debug!("Using configuration section [{}]", section.name);
            options.apply_section(section).map_err(suggestions::explain)?;
        }
        discovery.apply(&mut options);
        if let Some(compile) = compile {
            compile.apply(&mut options);
        }
        options.validate().map_err(suggestions::explain)?;
        runs.push(options);
    }
    Ok(runs)
}

/// Detecting the interpreter is only worth a subprocess when some section
/// is restricted to a Python version.
fn python_version(discovery: &DiscoveryArgs, sections: &[Section]) -> Option<String> {
    if discovery.python_version.is_some() {
        return discovery.python_version.clone();
    }
    if sections.iter().any(|section| section.python.is_some()) {
        config::detect_python_version()
    } else {
        None
    }
}
