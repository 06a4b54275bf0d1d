//! # pip-compile-multi
//!
//! Lock a tree of Python requirements files (`*.in`) that reference each
//! other with `-r` lines. Every input file is compiled to a lockfile
//! (`*.txt`) by an external resolver (`pip-compile` or `uv pip compile`), and
//! the lockfiles are post-processed so that a package pinned by a referenced
//! file is not pinned again by the files that reference it.
//!
//! ## Quick Example
//!
//! ```
//! use pip_compile_multi::deduplicate::PackageMap;
//! use pip_compile_multi::lockfile::{fix_lockfile, LockPolicy};
//!
//! // `six` is already pinned by a referenced environment.
//! let inherited: PackageMap = [("six", Some("1.16.0".to_string()))].into_iter().collect();
//! let raw = "pytest==7.4.0\nsix==1.16.0\n";
//!
//! let (body, pinned) = fix_lockfile(raw, &inherited, &LockPolicy::default()).unwrap();
//! assert_eq!(body, "pytest==7.4.0\n");
//! assert!(pinned.contains("pytest"));
//! assert!(!pinned.contains("six"));
//! ```
//!
//! ## Core Concepts
//!
//! - **Discovery and ordering (`phases`)**: Glob input files, follow their
//!   `-r` references and sort them so references come first.
//! - **Deduplication (`deduplicate`)**: Track what each environment pinned
//!   and merge the pins every environment inherits, detecting conflicts.
//! - **Records (`dependency`, `lockfile`)**: Parse resolver output into
//!   dependency records and render them back in canonical form.
//! - **Resolvers (`resolver`)**: Run the external resolver behind a trait.
//! - **Verification (`verify`)**: Check that lockfiles were generated from the
//!   current input files using the `# SHA1:` header.
//! - **Configuration (`config`)**: Options layered from defaults,
//!   `requirements.ini` / `setup.cfg` / `tox.ini` / `pyproject.toml` and the
//!   command line.
//!
//! ## Execution Flow
//!
//! The main entry point is [`phases::orchestrator::recompile`]:
//!
//! 1.  **Discovery**: Find every input file and the files it references.
//! 2.  **Ordering**: Sort environments topologically; cycles are fatal.
//! 3.  **Locking**: For each environment, run the resolver, drop inherited
//!     packages, apply pin policies and write the lockfile with a hash header.

pub mod config;
pub mod dependency;
pub mod deduplicate;
pub mod environment;
pub mod error;
pub mod lockfile;
pub mod output;
pub mod path;
pub mod phases;
pub mod resolver;
pub mod suggestions;
pub mod verify;
pub mod version;

#[cfg(test)]
mod normalize_proptest;
