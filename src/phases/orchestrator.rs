//! Orchestrator for a complete compilation run
//!
//! This module coordinates discovery, ordering and per-environment
//! processing. It also owns the features that need the whole graph:
//! - hash propagation across reference clusters
//! - limiting a run to selected environments and their references
//! - autoresolve, which pre-compiles the environment that references every
//!   other one and uses its output as a constraint for the rest

use std::collections::BTreeSet;
use std::path::PathBuf;

use log::{debug, info, warn};

use super::{discovery, EnvConf, EnvGraph};
use crate::config::Options;
use crate::deduplicate::PackageDeduplicator;
use crate::environment::Environment;
use crate::error::{Error, Result};
use crate::path::normalize_path;
use crate::resolver::{forwarded_flags, Backend, Resolver};

/// What happened to each environment of a run, in processing order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Lockfiles that were compiled and rewritten.
    pub locked: Vec<PathBuf>,
    /// Lockfiles left untouched by an upgrade of selected packages.
    pub skipped: Vec<PathBuf>,
}

/// Discover the input files selected by `options` and lock all of them.
pub fn recompile(options: &Options, resolver: &dyn Resolver) -> Result<RunSummary> {
    let graph = discovery::discover(&options.input_pattern())?;
    execute(&graph, options, resolver)
}

/// Lock the environments of an already discovered graph.
///
/// Environments are processed in topological order so every environment
/// sees the pins of the environments it references. The first conflict
/// aborts the run.
pub fn execute(graph: &EnvGraph, options: &Options, resolver: &dyn Resolver) -> Result<RunSummary> {
    let hashed = hashed_envs(graph, &options.generate_hashes)?;
    let included = included_envs(graph, options)?;
    let backend = Backend::from_options(options);

    let mut dedup = PackageDeduplicator::new();
    dedup.on_discover(graph);

    let sink = if options.autoresolve {
        autoresolve(graph, options, resolver, backend, &hashed, included.as_ref())?
    } else {
        None
    };

    let mut summary = RunSummary::default();
    for conf in graph.iter() {
        if let Some(included) = &included {
            if !included.contains(&conf.in_path) {
                debug!("Skipping {}: not selected", conf.in_path.display());
                continue;
            }
        }
        let constraint = sink
            .as_ref()
            .filter(|(sink_in, _)| *sink_in != conf.in_path)
            .map(|(_, sink_out)| sink_out.as_path());
        let flags = forwarded_flags(options, backend, hashed.contains(&conf.in_path), constraint);

        let env = Environment::new(conf, options);
        if env.process(resolver, &mut dedup, flags)? {
            summary.locked.push(env.outfile());
        } else {
            summary.skipped.push(env.outfile());
        }
    }
    Ok(summary)
}

/// Environments that get `--generate-hashes`: every environment sharing a
/// reference cluster with one of `names`.
pub fn hashed_envs(graph: &EnvGraph, names: &BTreeSet<String>) -> Result<BTreeSet<PathBuf>> {
    let mut hashed = BTreeSet::new();
    for name in names {
        for conf in named(graph, name)? {
            hashed.extend(graph.reference_cluster(&conf.in_path));
        }
    }
    if !hashed.is_empty() {
        debug!("Generating hashes for {:?}", hashed);
    }
    Ok(hashed)
}

/// Environments a limited run compiles, or `None` when nothing is limited.
///
/// Selected environments pull in everything they reference, so inherited
/// pins are always fresh.
pub fn included_envs(graph: &EnvGraph, options: &Options) -> Result<Option<BTreeSet<PathBuf>>> {
    if options.only_names.is_empty() && options.only_paths.is_empty() {
        return Ok(None);
    }

    let mut selected: Vec<PathBuf> = Vec::new();
    for name in &options.only_names {
        selected.extend(named(graph, name)?.into_iter().map(|conf| conf.in_path.clone()));
    }
    for path in &options.only_paths {
        let path = normalize_path(path);
        match graph.get(&path) {
            Some(conf) => selected.push(conf.in_path.clone()),
            None => return Err(unknown(graph, &path.display().to_string())),
        }
    }

    let mut included = BTreeSet::new();
    for path in selected {
        included.extend(graph.recursive_refs(&path));
        included.insert(path);
    }
    info!(
        "Limiting run to {} of {} environments",
        included.len(),
        graph.len()
    );
    Ok(Some(included))
}

fn named<'a>(graph: &'a EnvGraph, name: &str) -> Result<Vec<&'a EnvConf>> {
    let found: Vec<&EnvConf> = graph.iter().filter(|conf| conf.name == name).collect();
    if found.is_empty() {
        return Err(unknown(graph, name));
    }
    Ok(found)
}

fn unknown(graph: &EnvGraph, name: &str) -> Error {
    Error::UnknownEnvironment {
        name: name.to_string(),
        known: graph.names().into_iter().map(str::to_string).collect(),
    }
}

/// Pre-compile the sink environment and return its input and output paths
/// for use as a constraint.
fn autoresolve(
    graph: &EnvGraph,
    options: &Options,
    resolver: &dyn Resolver,
    backend: Backend,
    hashed: &BTreeSet<PathBuf>,
    included: Option<&BTreeSet<PathBuf>>,
) -> Result<Option<(PathBuf, PathBuf)>> {
    let Some(sink) = graph.find_sink() else {
        warn!("Autoresolve is enabled but no environment references all the others; compiling without it");
        return Ok(None);
    };
    let env = Environment::new(sink, options);
    let outfile = env.outfile();

    let selected = included.is_none_or(|included| included.contains(&sink.in_path));
    let stale = !options.upgrade_selected() || env.is_affected_by_upgrade()?;
    if selected && stale {
        info!(
            "Autoresolve: compiling {} to constrain the other environments",
            sink.in_path.display()
        );
        let flags = forwarded_flags(options, backend, hashed.contains(&sink.in_path), None);
        env.compile(resolver, flags)?;
    } else if !outfile.is_file() {
        warn!(
            "Autoresolve: {} is not compiled; compiling without it",
            outfile.display()
        );
        return Ok(None);
    }
    Ok(Some((sink.in_path.clone(), outfile)))
}
