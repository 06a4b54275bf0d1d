//! Phase 2: Ordering environments
//!
//! Environments are compiled so that every referenced file is locked before
//! the files that reference it; deduplication depends on the referenced
//! lockfiles already being registered.
//!
//! ## Process
//!
//! Kahn's algorithm, one level at a time:
//!
//! 1.  Every environment whose references are all placed forms the next level.
//! 2.  Each level is sorted by input path, which makes the order independent
//!     of glob and filesystem iteration order.
//! 3.  If environments remain but none can be placed, the remaining ones
//!     form at least one cycle and ordering fails.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use log::debug;

use super::EnvConf;
use crate::error::{Error, Result};

/// Sort environments so that references precede dependents.
///
/// References to files outside of `envs` are ignored.
pub fn order_by_refs(envs: Vec<EnvConf>) -> Result<Vec<EnvConf>> {
    let mut pending: BTreeMap<PathBuf, EnvConf> = envs
        .into_iter()
        .map(|env| (env.in_path.clone(), env))
        .collect();
    let known: BTreeSet<PathBuf> = pending.keys().cloned().collect();
    let mut placed: BTreeSet<PathBuf> = BTreeSet::new();
    let mut ordered = Vec::with_capacity(pending.len());

    while !pending.is_empty() {
        let level: Vec<PathBuf> = pending
            .values()
            .filter(|env| {
                env.refs
                    .iter()
                    .all(|reference| placed.contains(&reference.path) || !known.contains(&reference.path))
            })
            .map(|env| env.in_path.clone())
            .collect();

        if level.is_empty() {
            let cycle = pending
                .keys()
                .map(|path| path.display().to_string())
                .collect::<Vec<_>>()
                .join(", ");
            return Err(Error::CyclicReference { cycle });
        }

        debug!("Ordering level: {:?}", level);
        for path in level {
            if let Some(env) = pending.remove(&path) {
                placed.insert(path);
                ordered.push(env);
            }
        }
    }

    Ok(ordered)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(envs: &[EnvConf]) -> Vec<&str> {
        envs.iter().map(|env| env.name.as_str()).collect()
    }

    #[test]
    fn test_order_references_first() {
        let envs = vec![
            EnvConf::new("test.in", &["base.in"]),
            EnvConf::new("local.in", &["test.in"]),
            EnvConf::new("base.in", &[] as &[&str]),
        ];
        let ordered = order_by_refs(envs).unwrap();
        assert_eq!(names(&ordered), vec!["base", "test", "local"]);
    }

    #[test]
    fn test_order_is_deterministic_within_level() {
        let forward = vec![
            EnvConf::new("b.in", &[] as &[&str]),
            EnvConf::new("a.in", &[] as &[&str]),
            EnvConf::new("c.in", &["a.in", "b.in"]),
        ];
        let mut backward = forward.clone();
        backward.reverse();
        assert_eq!(names(&order_by_refs(forward).unwrap()), vec!["a", "b", "c"]);
        assert_eq!(names(&order_by_refs(backward).unwrap()), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_order_diamond() {
        let envs = vec![
            EnvConf::new("top.in", &["left.in", "right.in"]),
            EnvConf::new("right.in", &["base.in"]),
            EnvConf::new("left.in", &["base.in"]),
            EnvConf::new("base.in", &[] as &[&str]),
        ];
        let ordered = order_by_refs(envs).unwrap();
        assert_eq!(names(&ordered), vec!["base", "left", "right", "top"]);
    }

    #[test]
    fn test_order_ignores_unknown_references() {
        let envs = vec![EnvConf::new("a.in", &["elsewhere.in"])];
        assert_eq!(names(&order_by_refs(envs).unwrap()), vec!["a"]);
    }

    #[test]
    fn test_cycle_is_rejected() {
        let envs = vec![
            EnvConf::new("a.in", &["b.in"]),
            EnvConf::new("b.in", &["a.in"]),
            EnvConf::new("c.in", &[] as &[&str]),
        ];
        match order_by_refs(envs).unwrap_err() {
            Error::CyclicReference { cycle } => assert_eq!(cycle, "a.in, b.in"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_self_reference_is_a_cycle() {
        let envs = vec![EnvConf::new("a.in", &["a.in"])];
        assert!(matches!(
            order_by_refs(envs),
            Err(Error::CyclicReference { .. })
        ));
    }

    #[test]
    fn test_empty_input() {
        assert!(order_by_refs(Vec::new()).unwrap().is_empty());
    }
}
