//! # Lockfile Verification
//!
//! Every lockfile starts with a `# SHA1:<hex>` line hashing the input file it
//! was generated from. Verification recomputes the hash and compares.
//!
//! Two hash forms are accepted:
//!
//! - **Robust**: comments and surrounding whitespace are stripped from every
//!   line and the lines are sorted before hashing, so reordering requirements
//!   or editing comments does not make a lockfile stale. This is the form
//!   written into new lockfiles.
//! - **Strict**: the SHA1 of the raw file bytes with surrounding whitespace
//!   trimmed. Lockfiles written by older tools carry this form.
//!
//! Mismatches are logged and collected; they never abort verification of the
//! remaining environments.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::{error, info};
use sha1::{Digest, Sha1};

use crate::error::Result;
use crate::phases::EnvGraph;

const HASH_PREFIX: &str = "# SHA1:";

fn hash_comment(bytes: &[u8]) -> String {
    format!("{}{}\n", HASH_PREFIX, hex::encode(Sha1::digest(bytes)))
}

/// Hash line for the raw contents of an input file.
///
/// ```
/// use pip_compile_multi::verify::strict_hash_comment;
///
/// assert_eq!(
///     strict_hash_comment(b""),
///     "# SHA1:da39a3ee5e6b4b0d3255bfef95601890afd80709\n"
/// );
/// ```
pub fn strict_hash_comment(content: &[u8]) -> String {
    hash_comment(content.trim_ascii())
}

/// Hash line that ignores comments, whitespace and line order.
pub fn robust_hash_comment(content: &str) -> String {
    let mut lines: Vec<&str> = content
        .lines()
        .map(|line| line.split('#').next().unwrap_or("").trim())
        .collect();
    lines.sort_unstable();
    hash_comment(lines.concat().as_bytes())
}

/// Strict hash line of the file at `path`.
pub fn generate_hash_comment(path: &Path) -> Result<String> {
    Ok(strict_hash_comment(&fs::read(path)?))
}

/// Robust hash line of the file at `path`.
pub fn generate_robust_hash_comment(path: &Path) -> Result<String> {
    Ok(robust_hash_comment(&fs::read_to_string(path)?))
}

/// First `# SHA1:` line of a lockfile, with its newline. `None` when the
/// lockfile is missing or carries no hash.
pub fn parse_hash_comment(path: &Path) -> Result<Option<String>> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(error) if error.kind() == ErrorKind::NotFound => return Ok(None),
        Err(error) => return Err(error.into()),
    };
    Ok(text
        .lines()
        .find(|line| line.starts_with(HASH_PREFIX))
        .map(|line| format!("{}\n", line)))
}

/// Result of checking one lockfile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    pub infile: PathBuf,
    pub outfile: PathBuf,
    /// Robust hash line of the current input.
    pub expected: String,
    /// Hash line found in the lockfile.
    pub found: Option<String>,
    pub ok: bool,
}

/// Check a single input/lockfile pair and log the outcome.
pub fn verify_pair(infile: &Path, outfile: &Path) -> Result<Verification> {
    let content = fs::read(infile)?;
    let strict = strict_hash_comment(&content);
    let robust = robust_hash_comment(&String::from_utf8_lossy(&content));
    let found = parse_hash_comment(outfile)?;
    let ok = matches!(&found, Some(line) if *line == robust || *line == strict);

    if ok {
        info!(
            "OK - {} was generated from {}.",
            outfile.display(),
            infile.display()
        );
    } else {
        error!(
            "ERROR! {} was not regenerated after changes in {}.",
            outfile.display(),
            infile.display()
        );
        error!("Expecting: {}", robust.trim());
        error!(
            "Found:     {}",
            found.as_deref().map(str::trim).unwrap_or("<no hash line>")
        );
    }

    Ok(Verification {
        infile: infile.to_path_buf(),
        outfile: outfile.to_path_buf(),
        expected: robust,
        found,
        ok,
    })
}

/// Verify every environment of a graph against its lockfile.
pub fn verify_environments(graph: &EnvGraph, out_ext: &str) -> Result<Vec<Verification>> {
    graph
        .iter()
        .map(|env| verify_pair(&env.in_path, &env.in_path.with_extension(out_ext)))
        .collect()
}
