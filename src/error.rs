//! # Error Handling
//!
//! This module defines the centralized error type for the library. It uses
//! `thiserror` to build an `Error` enum covering every failure that can abort
//! a compilation run, with messages written for the person who has to fix the
//! requirements files.
//!
//! ## Key Components
//!
//! - **`Error`**: The main enum. Fatal variants (`Conflict`,
//!   `CyclicReference`, `ResolverInvocation`, `ResolverTimeout`) stop the whole
//!   run; everything else wraps I/O and parsing failures.
//! - **`VersionConflict`**: One package resolved to two different versions.
//! - **`Result<T>`**: A type alias for `std::result::Result<T, Error>`.
//!
//! Verification mismatches are deliberately *not* errors: they are collected
//! by the `verify` module and reported as a summary.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// A single package that resolved to two different versions.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct VersionConflict {
    /// Package name as it was first registered.
    pub package: String,
    /// Version seen first.
    pub left: String,
    /// Version that disagrees with `left`.
    pub right: String,
}

impl fmt::Display for VersionConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Package {} was resolved to different versions in different environments: {} and {}",
            self.package, self.left, self.right
        )
    }
}

fn render_conflicts(conflicts: &[VersionConflict]) -> String {
    conflicts
        .iter()
        .map(|conflict| format!("\n  {}", conflict))
        .collect()
}

/// Main error type for pip-compile-multi operations
#[derive(Error, Debug)]
pub enum Error {
    /// The same package is pinned to different versions across environments
    /// that are merged into one ignore set, or a freshly compiled version
    /// disagrees with an inherited one.
    #[error(
        "Version conflict:{}\n  hint: Please add constraints for the package versions listed above",
        render_conflicts(conflicts)
    )]
    Conflict { conflicts: Vec<VersionConflict> },

    /// The `-r` references between input files do not form a DAG.
    #[error("Cyclic reference between requirements files: {cycle}")]
    CyclicReference { cycle: String },

    /// The resolver could not be started or exited with a non-zero status.
    #[error("Failed to compile {infile}: {command} - {message}")]
    ResolverInvocation {
        infile: PathBuf,
        command: String,
        message: String,
    },

    /// The resolver did not finish within the configured timeout.
    #[error("Resolver timed out after {seconds}s while compiling {infile}")]
    ResolverTimeout { infile: PathBuf, seconds: u64 },

    /// A configuration file or command-line value could not be understood.
    #[error("Configuration parsing error: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    ConfigParse {
        message: String,
        /// Optional hint for how to fix the configuration issue
        hint: Option<String>,
    },

    /// An input file references a file that does not exist.
    #[error("{referenced_by} references {path}, which does not exist")]
    MissingReference {
        path: PathBuf,
        referenced_by: PathBuf,
    },

    /// The discovery glob matched nothing.
    #[error("No input files found matching {pattern}")]
    NoEnvironments { pattern: String },

    /// An environment was named on the command line but never discovered.
    #[error("Unknown environment: {name}")]
    UnknownEnvironment {
        name: String,
        /// Names that were discovered, for suggestions.
        known: Vec<String>,
    },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A glob pattern error, wrapped from `glob::PatternError`.
    #[error("Glob pattern error: {0}")]
    Glob(#[from] glob::PatternError),

    /// A failure while walking glob matches.
    #[error("Glob iteration error: {0}")]
    GlobIteration(#[from] glob::GlobError),

    /// A regular expression error, wrapped from `regex::Error`.
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    /// A `pyproject.toml` parsing error.
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// An INI parsing error from `requirements.ini`, `setup.cfg` or `tox.ini`.
    #[error("INI parsing error: {0}")]
    Ini(#[from] ini::ParseError),

    /// A URL parsing error, wrapped from `url::ParseError`.
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),
}

impl Error {
    /// Build a conflict error from a non-empty list of conflicts.
    pub fn conflict(mut conflicts: Vec<VersionConflict>) -> Self {
        conflicts.sort();
        conflicts.dedup();
        Error::Conflict { conflicts }
    }

    /// Whether this error is one of the reconciliation failures that the
    /// user fixes by editing requirements files.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Conflict { .. })
    }
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
