//! Phase 1: Discovery
//!
//! Finds every input file of a project and the `-r` references between them.
//!
//! ## Process
//!
//! 1.  **Glob**: The pattern (usually `requirements/*.in`) seeds a work queue
//!     with the matched files, in sorted order.
//! 2.  **References**: Each file is scanned for `-r <path>` and
//!     `--requirement <path>` lines. Targets are resolved relative to the
//!     referencing file and normalized, so `sub/../base.in` and `base.in`
//!     name the same environment.
//! 3.  **Follow**: References that the glob did not match (files in sibling
//!     directories, for example) are queued and scanned too.
//! 4.  **Order**: The collected environments are handed to the ordering phase,
//!     which returns them as an [`EnvGraph`].

use std::collections::{BTreeSet, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use log::debug;
use regex::Regex;

use super::{EnvConf, EnvGraph};
use crate::error::{Error, Result};
use crate::path::normalize_path;

static RE_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:-r|--requirement)(?:=|\s*)(?P<path>[^\s=]\S*)")
        .expect("reference pattern is valid")
});

/// Discover environments matching `pattern` and everything they reference.
pub fn discover(pattern: &str) -> Result<EnvGraph> {
    let mut to_visit: VecDeque<PathBuf> = VecDeque::new();
    for entry in glob::glob(pattern)? {
        to_visit.push_back(normalize_path(&entry?));
    }
    if to_visit.is_empty() {
        return Err(Error::NoEnvironments {
            pattern: pattern.to_string(),
        });
    }

    let mut seen: BTreeSet<PathBuf> = to_visit.iter().cloned().collect();
    let mut envs = Vec::new();
    while let Some(in_path) = to_visit.pop_front() {
        let text = fs::read_to_string(&in_path)?;
        let env = EnvConf::new(in_path, &parse_references(&text));
        for reference in &env.refs {
            if seen.insert(reference.path.clone()) {
                if !reference.path.is_file() {
                    return Err(Error::MissingReference {
                        path: reference.path.clone(),
                        referenced_by: env.in_path.clone(),
                    });
                }
                to_visit.push_back(reference.path.clone());
            }
        }
        debug!(
            "Discovered {} with references {:?}",
            env.in_path.display(),
            env.refs.iter().map(|reference| &reference.raw).collect::<Vec<_>>()
        );
        envs.push(env);
    }

    EnvGraph::new(envs)
}

/// Build the discovery glob for a directory and input extension.
pub fn input_pattern(directory: &Path, in_ext: &str) -> String {
    directory
        .join(format!("*.{}", in_ext))
        .to_string_lossy()
        .into_owned()
}

/// Extract the raw `-r` reference targets from an input file's text.
///
/// ```
/// use pip_compile_multi::phases::discovery::parse_references;
///
/// let refs = parse_references("-r base.in\n  --requirement=../up.in  \nsix\n");
/// assert_eq!(refs, vec!["base.in", "../up.in"]);
/// ```
pub fn parse_references(text: &str) -> Vec<String> {
    text.lines()
        .filter_map(|line| RE_REFERENCE.captures(line.trim()))
        .map(|captures| captures["path"].to_string())
        .collect()
}
