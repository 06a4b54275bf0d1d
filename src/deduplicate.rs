//! # Cross-Environment Deduplication
//!
//! A package pinned in `base.txt` must not appear again in `test.txt` when
//! `test.in` references `base.in`; the installer reads both and the pin only
//! has to live in one place. The [`PackageDeduplicator`] remembers what every
//! compiled environment pinned and, for the next environment in topological
//! order, hands out the merged set of packages it inherits from its
//! references. These are the *ignored packages* for that environment.
//!
//! Two environments that share a reference may still have resolved the same
//! package to different versions. Merging them reports a
//! [`VersionConflict`](crate::error::VersionConflict) for each disagreement.
//!
//! A package registered with version `None` (unchecked packages, VCS and URL
//! references) disables the conflict check for that package: once `None` is
//! in the merged map it stays there.
//!
//! Environments that drop `.postN` suffixes write `1.0` where the resolver
//! said `1.0.post2`. Their pins are flagged, and a flagged pin agrees with
//! every post release of the same version, whether the pin was taken from
//! resolver output or read back from an existing lockfile.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use log::{error, warn};

use crate::dependency::canonical_name;
use crate::error::{Error, Result, VersionConflict};
use crate::phases::EnvGraph;
use crate::version::{drop_post, normalize_version, versions_match};

/// A pinned package as seen by the deduplicator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinnedPackage {
    /// Name as first registered.
    pub name: String,
    /// Resolved version, `None` when the version is not checked.
    pub version: Option<String>,
    /// The lockfile renders this package without its `.postN` suffix.
    pub post_dropped: bool,
}

impl PinnedPackage {
    /// Whether `version` agrees with this pin. Post releases are ignored
    /// when either side is rendered without them.
    pub fn matches_version(&self, version: &str, post_dropped: bool) -> bool {
        let Some(pinned) = self.version.as_deref() else {
            return true;
        };
        if self.post_dropped || post_dropped {
            drop_post(&normalize_version(pinned)) == drop_post(&normalize_version(version))
        } else {
            versions_match(pinned, version)
        }
    }
}

/// Packages keyed by canonical name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageMap {
    entries: BTreeMap<String, PinnedPackage>,
}

impl PackageMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a package, keeping the spelling of an existing entry.
    pub fn insert(&mut self, name: &str, version: Option<String>) {
        self.insert_pin(name, version, false);
    }

    /// Insert a package whose lockfile entry may lack its `.postN` suffix.
    pub fn insert_pin(&mut self, name: &str, version: Option<String>, post_dropped: bool) {
        let key = canonical_name(name);
        match self.entries.get_mut(&key) {
            Some(entry) => {
                entry.version = version;
                entry.post_dropped = post_dropped;
            }
            None => {
                self.entries.insert(
                    key,
                    PinnedPackage {
                        name: name.to_string(),
                        version,
                        post_dropped,
                    },
                );
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&PinnedPackage> {
        self.entries.get(&canonical_name(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&canonical_name(name))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate in canonical-name order.
    pub fn iter(&self) -> impl Iterator<Item = &PinnedPackage> {
        self.entries.values()
    }

    /// Canonical names of all entries.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Merge `other` into `self`, collecting version disagreements.
    fn merge_from(&mut self, other: &PackageMap, conflicts: &mut Vec<VersionConflict>) {
        for (key, package) in &other.entries {
            match self.entries.get_mut(key) {
                None => {
                    self.entries.insert(key.clone(), package.clone());
                }
                Some(existing) => match (&existing.version, &package.version) {
                    (Some(left), Some(right)) => {
                        if !existing.matches_version(right, package.post_dropped) {
                            conflicts.push(VersionConflict {
                                package: existing.name.clone(),
                                left: left.clone(),
                                right: right.clone(),
                            });
                        }
                        existing.post_dropped |= package.post_dropped;
                    }
                    (None, _) => {}
                    (Some(_), None) => existing.version = None,
                },
            }
        }
    }
}

impl<S: AsRef<str>> FromIterator<(S, Option<String>)> for PackageMap {
    fn from_iter<I: IntoIterator<Item = (S, Option<String>)>>(iter: I) -> Self {
        let mut map = PackageMap::new();
        for (name, version) in iter {
            map.insert(name.as_ref(), version);
        }
        map
    }
}

/// Merge the package maps of `in_paths`, visiting them in sorted order.
/// Paths that have not been registered yet contribute nothing.
pub fn merged_packages(
    env_packages: &HashMap<PathBuf, PackageMap>,
    in_paths: &BTreeSet<PathBuf>,
) -> Result<PackageMap> {
    let mut result = PackageMap::new();
    let mut conflicts = Vec::new();
    for in_path in in_paths {
        if let Some(packages) = env_packages.get(in_path) {
            result.merge_from(packages, &mut conflicts);
        }
    }
    if conflicts.is_empty() {
        return Ok(result);
    }
    for conflict in &conflicts {
        error!("{}", conflict);
    }
    Err(Error::conflict(conflicts))
}

/// Tracks pinned packages of compiled environments and computes what each
/// environment inherits.
#[derive(Debug, Default)]
pub struct PackageDeduplicator {
    env_packages: HashMap<PathBuf, PackageMap>,
    recursive_refs: BTreeMap<PathBuf, BTreeSet<PathBuf>>,
}

impl PackageDeduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Precompute the transitive reference closure of every environment.
    pub fn on_discover(&mut self, graph: &EnvGraph) {
        self.recursive_refs = graph
            .iter()
            .map(|env| (env.in_path.clone(), graph.recursive_refs(&env.in_path)))
            .collect();
    }

    /// Transitive references of `in_path`, empty when it is unknown.
    pub fn recursive_refs(&self, in_path: &Path) -> BTreeSet<PathBuf> {
        self.recursive_refs.get(in_path).cloned().unwrap_or_default()
    }

    /// Record what an environment pinned.
    pub fn register_packages_for_env(&mut self, in_path: &Path, packages: PackageMap) {
        if self.env_packages.contains_key(in_path) {
            warn!("Packages for {} are registered twice", in_path.display());
        }
        self.env_packages.insert(in_path.to_path_buf(), packages);
    }

    /// Packages inherited by `in_path` through its references.
    pub fn ignored_packages(&self, in_path: &Path) -> Result<PackageMap> {
        merged_packages(&self.env_packages, &self.recursive_refs(in_path))
    }

    /// Packages registered for `in_path`, if it has been compiled.
    pub fn packages_for(&self, in_path: &Path) -> Option<&PackageMap> {
        self.env_packages.get(in_path)
    }
}
