//! Path and pattern utilities shared by discovery and the record serializer

use std::path::{Component, Path, PathBuf};

use glob::{MatchOptions, Pattern};

use crate::error::{Error, Result};

/// Return the environment name for a requirements file path.
///
/// ```
/// use std::path::Path;
/// use pip_compile_multi::path::extract_env_name;
///
/// assert_eq!(extract_env_name(Path::new("base.in")), "base");
/// assert_eq!(extract_env_name(Path::new("sub/req.in")), "req");
/// ```
pub fn extract_env_name(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Lexically normalize a path: drop `.` components and fold `..` into the
/// preceding component when there is one. The filesystem is never consulted,
/// so symlinks are not resolved.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut parts: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match parts.last() {
                Some(Component::Normal(_)) => {
                    parts.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => parts.push(component),
            },
            other => parts.push(other),
        }
    }
    if parts.is_empty() {
        return PathBuf::from(".");
    }
    parts.iter().collect()
}

/// Resolve a reference found inside `orig_path` relative to that file's
/// directory rather than the working directory.
///
/// ```
/// use std::path::{Path, PathBuf};
/// use pip_compile_multi::path::fix_reference_path;
///
/// assert_eq!(fix_reference_path(Path::new("dir/file.in"), "../ref.in"), PathBuf::from("ref.in"));
/// ```
pub fn fix_reference_path(orig_path: &Path, reference: &str) -> PathBuf {
    let base = orig_path.parent().unwrap_or_else(|| Path::new(""));
    normalize_path(&base.join(reference))
}

/// Swap the extension of a reference as written in an input file, keeping its
/// relative form, e.g. `../base.in` becomes `../base.txt`.
pub fn with_extension(reference: &str, extension: &str) -> String {
    Path::new(reference)
        .with_extension(extension)
        .to_string_lossy()
        .replace('\\', "/")
}

/// Compile a list of glob patterns up front so invalid patterns are reported
/// while loading configuration instead of halfway through a run.
pub fn compile_patterns(patterns: &[String]) -> Result<Vec<Pattern>> {
    patterns
        .iter()
        .map(|pattern| Pattern::new(&pattern.to_lowercase()).map_err(Error::Glob))
        .collect()
}

/// Whether `name` matches any of the precompiled patterns.
pub fn matches_any(patterns: &[Pattern], name: &str) -> bool {
    let options = MatchOptions {
        case_sensitive: false,
        require_literal_separator: false,
        require_literal_leading_dot: false,
    };
    let name = name.to_lowercase();
    patterns
        .iter()
        .any(|pattern| pattern.matches_with(&name, options))
}
