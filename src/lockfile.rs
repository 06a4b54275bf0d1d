//! # Lockfile Post-Processing
//!
//! Turns raw resolver output into the canonical lockfile text:
//!
//! 1. The resolver's own header (leading `#` lines) is removed.
//! 2. Backslash continuations are joined and every requirement is grouped
//!    with the indented comment lines that follow it ([`sections`]).
//! 3. Each section is parsed into a [`Dependency`]. Packages inherited from
//!    referenced environments are dropped after their versions are checked
//!    against the inherited ones; the rest are normalized and re-rendered.
//! 4. [`compose`] prepends the hash header and `-r` directives.
//!
//! Everything here works on strings; reading and writing files is the
//! caller's business.

use std::collections::BTreeSet;
use std::path::Path;

use glob::Pattern;
use log::error;

use crate::deduplicate::PackageMap;
use crate::dependency::{Dependency, Operator};
use crate::error::{Error, Result, VersionConflict};
use crate::path::{extract_env_name, matches_any};

/// How the records of one environment are rewritten.
#[derive(Debug, Clone, Default)]
pub struct LockPolicy {
    /// Drop `.postN` from every version.
    pub forbid_post: bool,
    /// Packages written with `~=` instead of `==`.
    pub compatible: Vec<Pattern>,
    /// Packages whose versions are never checked for conflicts.
    pub unchecked: Vec<Pattern>,
    /// Remove `-c <file>` entries from `# via` comments.
    pub skip_constraints: bool,
}

impl LockPolicy {
    fn operator(&self, package: &str) -> Operator {
        if matches_any(&self.compatible, package) {
            Operator::Compatible
        } else {
            Operator::Exact
        }
    }
}

/// Split text into the leading block of `#` lines and the rest.
///
/// ```
/// use pip_compile_multi::lockfile::split_header;
///
/// let (header, body) = split_header("#\n# generated\n#\nsix==1.0\n");
/// assert_eq!(header, "#\n# generated\n#\n");
/// assert_eq!(body, "six==1.0\n");
/// ```
pub fn split_header(text: &str) -> (&str, &str) {
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        if !line.starts_with('#') {
            break;
        }
        offset += line.len();
    }
    text.split_at(offset)
}

/// Group resolver output into sections: one logical requirement line (with
/// backslash continuations joined) followed by its indented comment lines.
/// Standalone comments and blank lines form sections of their own.
pub fn sections(text: &str) -> Vec<String> {
    let mut sections: Vec<String> = Vec::new();
    let mut open: Option<String> = None;
    let mut continued: Vec<&str> = Vec::new();
    let mut continued_indented = false;

    for raw in text.lines() {
        let indented = if continued.is_empty() {
            raw.starts_with([' ', '\t'])
        } else {
            continued_indented
        };
        let line = raw.trim();
        if let Some(part) = line.strip_suffix('\\') {
            if continued.is_empty() {
                continued_indented = indented;
            }
            continued.push(part.trim_end());
            continue;
        }
        let logical = if continued.is_empty() {
            line.to_string()
        } else {
            continued.push(line);
            let joined = continued
                .iter()
                .filter(|part| !part.is_empty())
                .copied()
                .collect::<Vec<_>>()
                .join(" ");
            continued.clear();
            joined
        };

        if indented && logical.starts_with('#') {
            if let Some(section) = open.as_mut() {
                section.push('\n');
                section.push_str(&logical);
                continue;
            }
        }
        if let Some(section) = open.take() {
            sections.push(section);
        }
        if logical.is_empty() || logical.starts_with('#') {
            sections.push(logical);
        } else {
            open = Some(logical);
        }
    }

    if !continued.is_empty() {
        let dangling = continued.join(" ");
        match open.as_mut() {
            Some(section) => {
                sections.push(std::mem::take(section));
                sections.push(dangling);
            }
            None => sections.push(dangling),
        }
        open = None;
    }
    if let Some(section) = open {
        sections.push(section);
    }
    sections
}

/// Rewrite raw resolver output.
///
/// Returns the lockfile body without any header, plus the packages this
/// environment pins (versions recorded before `.postN` truncation, and
/// flagged when the lockfile renders them without it).
/// Fails with [`Error::Conflict`] when a dropped package disagrees with the
/// version pinned by a referenced environment.
pub fn fix_lockfile(text: &str, ignore: &PackageMap, policy: &LockPolicy) -> Result<(String, PackageMap)> {
    let (_, body) = split_header(text);
    let mut lines = Vec::new();
    let mut packages = PackageMap::new();
    let mut conflicts = Vec::new();

    for section in sections(body) {
        let mut dependency = Dependency::parse(&section);
        let Some(package) = dependency.package().map(str::to_string) else {
            lines.push(dependency.serialize(Operator::Exact));
            continue;
        };
        dependency.normalize_version();

        let operator = policy.operator(&package);
        let post_dropped = policy.forbid_post || operator == Operator::Compatible;

        if let Some(inherited) = ignore.get(&package) {
            if let (Some(left), Some(right)) = (inherited.version.as_deref(), dependency.version()) {
                if !inherited.matches_version(right, false) {
                    conflicts.push(VersionConflict {
                        package: inherited.name.clone(),
                        left: left.to_string(),
                        right: right.to_string(),
                    });
                }
            }
            continue;
        }

        let version = match dependency.version() {
            Some(version) if !matches_any(&policy.unchecked, &package) => Some(version.to_string()),
            _ => None,
        };
        packages.insert_pin(&package, version, post_dropped);

        if post_dropped {
            dependency.drop_post();
        }
        if policy.skip_constraints {
            if let Some(comment) = dependency.comment_mut() {
                comment.skip_constraints();
            }
        }
        lines.push(dependency.serialize(operator));
    }

    if !conflicts.is_empty() {
        for conflict in &conflicts {
            error!("{}", conflict);
        }
        return Err(Error::conflict(conflicts));
    }

    let mut body = lines.join("\n");
    let trimmed = body.trim_end_matches('\n').len();
    body.truncate(trimmed);
    if !body.is_empty() {
        body.push('\n');
    }
    Ok((body, packages))
}

/// Canonical names of every package entry in a lockfile.
pub fn locked_package_names(text: &str) -> BTreeSet<String> {
    sections(split_header(text).1)
        .iter()
        .filter_map(|section| Dependency::parse(section).key())
        .collect()
}

/// Assemble the final lockfile: header, `-r` directives sorted by the
/// environment they name, then body.
///
/// ```
/// use pip_compile_multi::lockfile::compose;
///
/// let text = compose("# SHA1:abc\n", &["test.txt".into(), "base.txt".into()], "six==1.0\n");
/// assert_eq!(text, "# SHA1:abc\n-r base.txt\n-r test.txt\nsix==1.0\n");
/// ```
pub fn compose(header: &str, references: &[String], body: &str) -> String {
    let mut references: Vec<&String> = references.iter().collect();
    references.sort_by_cached_key(|reference| {
        (extract_env_name(Path::new(reference.as_str())), reference.to_string())
    });
    references.dedup();

    let mut text = String::with_capacity(header.len() + body.len() + references.len() * 16);
    text.push_str(header);
    if !header.is_empty() && !header.ends_with('\n') {
        text.push('\n');
    }
    for reference in references {
        text.push_str("-r ");
        text.push_str(reference);
        text.push('\n');
    }
    text.push_str(body);
    text
}
