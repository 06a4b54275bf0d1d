//! Phases of a pip-compile-multi run.
//!
//! ## Overview
//!
//! A run goes through three phases:
//! 1. Discovery - Glob input files and follow their `-r` references
//! 2. Ordering - Sort environments so references come before their dependents
//! 3. Orchestration - Compile each environment, deduplicate and write lockfiles
//!
//! Discovery and ordering produce an [`EnvGraph`], which the orchestrator and
//! the features that need whole-graph knowledge (hash propagation, environment
//! limits, autoresolve) query.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::path::{extract_env_name, fix_reference_path};

pub mod discovery;
pub mod orchestrator;
pub mod ordering;

/// A `-r` reference as written in an input file, with the path it resolves to.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Reference {
    /// Reference text, relative to the referencing file.
    pub raw: String,
    /// Path relative to the working directory.
    pub path: PathBuf,
}

/// One discovered input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvConf {
    pub in_path: PathBuf,
    /// File stem of `in_path`.
    pub name: String,
    /// Direct references, sorted by their raw text.
    pub refs: Vec<Reference>,
}

impl EnvConf {
    /// Build an environment from its input path and the reference strings
    /// found inside it.
    pub fn new<P: Into<PathBuf>, S: AsRef<str>>(in_path: P, raw_refs: &[S]) -> Self {
        let in_path = in_path.into();
        let mut refs: Vec<Reference> = raw_refs
            .iter()
            .map(|raw| Reference {
                raw: raw.as_ref().to_string(),
                path: fix_reference_path(&in_path, raw.as_ref()),
            })
            .collect();
        refs.sort();
        refs.dedup();
        Self {
            name: extract_env_name(&in_path),
            in_path,
            refs,
        }
    }

    /// Resolved paths of the direct references.
    pub fn ref_paths(&self) -> BTreeSet<PathBuf> {
        self.refs.iter().map(|reference| reference.path.clone()).collect()
    }
}

/// All discovered environments in topological order: every environment comes
/// after the environments it references.
#[derive(Debug, Clone, Default)]
pub struct EnvGraph {
    envs: Vec<EnvConf>,
    index: HashMap<PathBuf, usize>,
}

impl EnvGraph {
    /// Order the environments and build the graph. Fails on cycles.
    pub fn new(envs: Vec<EnvConf>) -> Result<Self> {
        let envs = ordering::order_by_refs(envs)?;
        let index = envs
            .iter()
            .enumerate()
            .map(|(position, env)| (env.in_path.clone(), position))
            .collect();
        Ok(Self { envs, index })
    }

    pub fn iter(&self) -> impl Iterator<Item = &EnvConf> {
        self.envs.iter()
    }

    pub fn len(&self) -> usize {
        self.envs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.envs.is_empty()
    }

    pub fn get(&self, in_path: &Path) -> Option<&EnvConf> {
        self.index.get(in_path).map(|&position| &self.envs[position])
    }

    /// Environments with the given name. Names are file stems, so several
    /// directories may contribute an environment with the same name.
    pub fn by_name<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a EnvConf> + 'a {
        self.envs.iter().filter(move |env| env.name == name)
    }

    /// Distinct environment names, sorted.
    pub fn names(&self) -> BTreeSet<&str> {
        self.envs.iter().map(|env| env.name.as_str()).collect()
    }

    /// Transitive references of `in_path`, excluding itself.
    pub fn recursive_refs(&self, in_path: &Path) -> BTreeSet<PathBuf> {
        let mut seen = BTreeSet::new();
        let mut stack: Vec<PathBuf> = self
            .get(in_path)
            .map(|env| env.ref_paths().into_iter().collect())
            .unwrap_or_default();
        while let Some(path) = stack.pop() {
            if !seen.insert(path.clone()) {
                continue;
            }
            if let Some(env) = self.get(&path) {
                stack.extend(env.ref_paths());
            }
        }
        seen
    }

    /// Every environment connected to `in_path` through references in either
    /// direction, including `in_path` itself.
    pub fn reference_cluster(&self, in_path: &Path) -> BTreeSet<PathBuf> {
        let mut cluster = BTreeSet::from([in_path.to_path_buf()]);
        loop {
            let before = cluster.len();
            for env in &self.envs {
                for reference in &env.refs {
                    if cluster.contains(&env.in_path) || cluster.contains(&reference.path) {
                        cluster.insert(env.in_path.clone());
                        cluster.insert(reference.path.clone());
                    }
                }
            }
            if cluster.len() == before {
                return cluster;
            }
        }
    }

    /// The environment that transitively references every other one.
    pub fn find_sink(&self) -> Option<&EnvConf> {
        self.envs.iter().rev().find(|env| {
            let mut covered = self.recursive_refs(&env.in_path);
            covered.insert(env.in_path.clone());
            self.envs.iter().all(|other| covered.contains(&other.in_path))
        })
    }
}
