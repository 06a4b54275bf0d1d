//! # Environment Processing
//!
//! An [`Environment`] is one input file seen through the options of the
//! current run. Processing it means:
//!
//! 1. Merging what its references already pinned into an ignore set
//! 2. Running the resolver on the input file
//! 3. Rewriting the raw output: drop inherited packages, apply pin policies,
//!    add the hash header and `-r` lines for the references
//! 4. Registering the packages it pinned so dependents can inherit them
//!
//! In upgrade-selected mode environments whose lockfile pins none of the
//! selected packages are not recompiled. Their existing lockfile is still
//! read so that dependents inherit the right pins.

use std::collections::BTreeSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::config::Options;
use crate::deduplicate::PackageDeduplicator;
use crate::dependency::canonical_name;
use crate::error::Result;
use crate::lockfile::{compose, fix_lockfile, locked_package_names};
use crate::path::{extract_env_name, with_extension};
use crate::phases::EnvConf;
use crate::resolver::{ResolveRequest, Resolver};
use crate::verify::generate_robust_hash_comment;

/// An input file bound to the options of a run.
#[derive(Debug, Clone, Copy)]
pub struct Environment<'a> {
    conf: &'a EnvConf,
    options: &'a Options,
}

impl<'a> Environment<'a> {
    pub fn new(conf: &'a EnvConf, options: &'a Options) -> Self {
        Self { conf, options }
    }

    pub fn name(&self) -> &str {
        &self.conf.name
    }

    pub fn infile(&self) -> &Path {
        &self.conf.in_path
    }

    pub fn outfile(&self) -> PathBuf {
        self.conf.in_path.with_extension(&self.options.out_ext)
    }

    /// `-r` targets written into the lockfile, relative to the lockfile.
    pub fn reference_lines(&self) -> Vec<String> {
        self.conf
            .refs
            .iter()
            .map(|reference| with_extension(&reference.raw, &self.options.out_ext))
            .collect()
    }

    /// Whether the existing lockfile pins any of the packages selected for
    /// upgrade. A missing lockfile always needs compiling.
    pub fn is_affected_by_upgrade(&self) -> Result<bool> {
        let text = match fs::read_to_string(self.outfile()) {
            Ok(text) => text,
            Err(error) if error.kind() == ErrorKind::NotFound => return Ok(true),
            Err(error) => return Err(error.into()),
        };
        let locked = locked_package_names(&text);
        Ok(self
            .options
            .upgrade_packages
            .iter()
            .any(|package| locked.contains(&canonical_name(package))))
    }

    /// Run the resolver into the lockfile path without rewriting its output.
    pub fn compile(&self, resolver: &dyn Resolver, flags: Vec<String>) -> Result<()> {
        let request = ResolveRequest {
            infile: self.conf.in_path.clone(),
            outfile: self.outfile(),
            flags,
        };
        debug!("Resolver flags for {}: {:?}", self.name(), request.flags);
        resolver.resolve(&request)
    }

    /// Compile, rewrite and register this environment.
    ///
    /// Returns `false` when the environment was skipped in upgrade-selected
    /// mode and its lockfile left untouched.
    pub fn process(
        &self,
        resolver: &dyn Resolver,
        dedup: &mut PackageDeduplicator,
        flags: Vec<String>,
    ) -> Result<bool> {
        let ignore = dedup.ignored_packages(self.infile())?;
        let policy = self.options.lock_policy(self.name())?;
        let outfile = self.outfile();

        if self.options.upgrade_selected() && !self.is_affected_by_upgrade()? {
            info!(
                "Skipping {}: it does not pin any of {:?}",
                outfile.display(),
                self.options.upgrade_packages
            );
            let (_, packages) = fix_lockfile(&fs::read_to_string(&outfile)?, &ignore, &policy)?;
            dedup.register_packages_for_env(self.infile(), packages);
            return Ok(false);
        }

        info!(
            "Locking {} to {}. References: {:?}",
            self.infile().display(),
            outfile.display(),
            self.reference_names()
        );
        self.compile(resolver, flags)?;

        let raw = fs::read_to_string(&outfile)?;
        let (body, packages) = fix_lockfile(&raw, &ignore, &policy)?;
        let header = format!(
            "{}{}",
            generate_robust_hash_comment(self.infile())?,
            self.options.header_text()?
        );
        fs::write(&outfile, compose(&header, &self.reference_lines(), &body))?;
        debug!("{} pins {} packages", self.name(), packages.len());
        dedup.register_packages_for_env(self.infile(), packages);
        Ok(true)
    }

    fn reference_names(&self) -> BTreeSet<String> {
        self.conf
            .refs
            .iter()
            .map(|reference| extract_env_name(&reference.path))
            .collect()
    }
}
