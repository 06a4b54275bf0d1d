//! Shared test utilities for E2E tests.
//!
//! The fixture is a temporary project with a `requirements/` directory and a
//! fake resolver script standing in for `pip-compile`. The script copies
//! `resolved/<env>.txt` to the requested output file, so each test decides
//! what the "resolver" answers. Every invocation is appended to `calls.log`.
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! let fixture = TestFixture::new()
//!     .with_input("base.in", "six\n")
//!     .with_resolved("base", "six==1.16.0\n");
//! fixture.command().arg("lock").assert().success();
//! ```

use assert_fs::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    pub use assert_cmd::cargo::cargo_bin_cmd;
    pub use assert_fs::prelude::*;
    pub use predicates::prelude::*;

    pub use super::TestFixture;
}

const FAKE_RESOLVER: &str = r#"#!/bin/sh
out=""
prev=""
last=""
for arg in "$@"; do
    if [ "$prev" = "--output-file" ]; then
        out="$arg"
    fi
    prev="$arg"
    last="$arg"
done
echo "$*" >> calls.log
name=$(basename "$last" .in)
if [ ! -f "resolved/$name.txt" ]; then
    echo "Could not find a version that satisfies the requirement for $name" >&2
    exit 1
fi
cp "resolved/$name.txt" "$out"
"#;

/// A temporary project with a fake resolver.
pub struct TestFixture {
    temp_dir: assert_fs::TempDir,
}

impl TestFixture {
    /// Create a fixture with an empty `requirements/` directory.
    pub fn new() -> Self {
        let temp_dir = assert_fs::TempDir::new().expect("Failed to create temp directory");
        temp_dir
            .child("requirements")
            .create_dir_all()
            .expect("Failed to create requirements directory");
        let script = temp_dir.child("fake-pip-compile");
        script
            .write_str(FAKE_RESOLVER)
            .expect("Failed to write fake resolver");
        make_executable(script.path());
        Self { temp_dir }
    }

    /// Add an input file under `requirements/`.
    pub fn with_input(self, name: &str, content: &str) -> Self {
        self.write(&format!("requirements/{name}"), content);
        self
    }

    /// Set what the fake resolver answers for environment `env`.
    pub fn with_resolved(self, env: &str, content: &str) -> Self {
        self.write(&format!("resolved/{env}.txt"), content);
        self
    }

    /// Add any file relative to the project root.
    #[allow(dead_code)]
    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.write(path, content);
        self
    }

    pub fn write(&self, path: &str, content: &str) {
        self.temp_dir
            .child(path)
            .write_str(content)
            .expect("Failed to write file");
    }

    /// Get the path to the temporary directory.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Read a file relative to the project root.
    pub fn read(&self, path: &str) -> String {
        fs::read_to_string(self.path().join(path)).expect("Failed to read file")
    }

    /// Resolver invocations so far, one command line per entry.
    #[allow(dead_code)]
    pub fn calls(&self) -> Vec<String> {
        fs::read_to_string(self.path().join("calls.log"))
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    pub fn resolver_path(&self) -> PathBuf {
        self.path().join("fake-pip-compile")
    }

    /// Create a command running in the project with the fake resolver.
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("pip-compile-multi");
        cmd.current_dir(self.path())
            .env("PIP_COMPILE_MULTI_RESOLVER", self.resolver_path())
            .env_remove("PIP_COMPILE_MULTI_PYTHON")
            .env("NO_COLOR", "1");
        cmd
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(unix)]
fn make_executable(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    let mut permissions = fs::metadata(path)
        .expect("Failed to stat fake resolver")
        .permissions();
    permissions.set_mode(0o755);
    fs::set_permissions(path, permissions).expect("Failed to make fake resolver executable");
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) {}
