//! End-to-end tests for the `pip-compile-multi lock` and `upgrade` commands.
//!
//! A fake resolver script answers with canned output, so these tests
//! exercise discovery, ordering, deduplication and lockfile rendering
//! through the real binary.
#![cfg(unix)]

mod common;
use common::prelude::*;

const BASE_RESOLVED: &str = "\
six==1.16.0
    # via -r requirements/base.in
";

const TEST_RESOLVED: &str = "\
pytest==7.4.0
    # via -r requirements/test.in
six==1.16.0
    # via -r requirements/base.in
";

const LOCAL_RESOLVED: &str = "\
pytest==7.4.0
six==1.16.0
";

fn layered() -> TestFixture {
    TestFixture::new()
        .with_input("base.in", "six\n")
        .with_input("test.in", "-r base.in\npytest\n")
        .with_input("local.in", "-r test.in\n")
        .with_resolved("base", BASE_RESOLVED)
        .with_resolved("test", TEST_RESOLVED)
        .with_resolved("local", LOCAL_RESOLVED)
}

#[test]
fn test_lock_writes_deduplicated_lockfiles() {
    let fixture = layered();

    fixture
        .command()
        .arg("lock")
        .assert()
        .success()
        .stdout(predicate::str::contains("Locked 3 environment(s)"))
        .stderr(predicate::str::contains(
            "Locking requirements/test.in to requirements/test.txt. References: {\"base\"}",
        ));

    let base = fixture.read("requirements/base.txt");
    assert!(base.starts_with("# SHA1:"));
    assert!(base.contains("# This file is autogenerated by pip-compile-multi"));
    assert!(base.contains("six==1.16.0"));

    let test = fixture.read("requirements/test.txt");
    assert!(test.contains("\n-r base.txt\npytest==7.4.0"));
    assert!(!test.contains("six=="));

    let local = fixture.read("requirements/local.txt");
    assert!(local.ends_with("\n-r test.txt\n"));
}

#[test]
fn test_lock_compiles_references_first_without_upgrading() {
    let fixture = layered();
    fixture.command().arg("lock").assert().success();

    let calls = fixture.calls();
    assert_eq!(calls.len(), 3);
    assert!(calls[0].ends_with("requirements/base.in"));
    assert!(calls[1].ends_with("requirements/test.in"));
    assert!(calls[2].ends_with("requirements/local.in"));
    assert!(calls.iter().all(|call| !call.contains("--upgrade")));
    assert!(calls.iter().all(|call| call.contains("--rebuild")));
}

#[test]
fn test_lock_is_idempotent() {
    let fixture = layered();
    fixture.command().arg("lock").assert().success();
    let first = fixture.read("requirements/test.txt");

    fixture.command().arg("lock").assert().success();
    assert_eq!(fixture.read("requirements/test.txt"), first);
}

#[test]
fn test_upgrade_forwards_upgrade_flags() {
    let fixture = layered();
    fixture.command().arg("upgrade").assert().success();
    assert!(fixture.calls().iter().all(|call| call.contains("--upgrade ")));
}

#[test]
fn test_upgrade_selected_package_skips_unaffected_environments() {
    let fixture = layered();
    fixture.command().arg("lock").assert().success();
    let base = fixture.read("requirements/base.txt");

    fixture
        .command()
        .args(["upgrade", "pytest"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 left unchanged"));

    let calls = fixture.calls();
    assert_eq!(calls.len(), 4);
    assert!(calls[3].contains("--upgrade-package=pytest"));
    assert!(calls[3].ends_with("requirements/test.in"));
    assert_eq!(fixture.read("requirements/base.txt"), base);
}

#[test]
fn test_generate_hashes_propagates_to_references() {
    let fixture = layered().with_input("docs.in", "sphinx\n").with_resolved("docs", "sphinx==7.2.0\n");

    fixture
        .command()
        .args(["lock", "--generate-hashes", "test"])
        .assert()
        .success();

    for call in fixture.calls() {
        let hashed = call.contains("--generate-hashes");
        assert_eq!(hashed, !call.ends_with("docs.in"), "{call}");
    }
}

#[test]
fn test_unknown_environment_suggests_name() {
    let fixture = layered();
    fixture
        .command()
        .args(["lock", "--only-name", "tset"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Unknown environment: tset"))
        .stderr(predicate::str::contains("Did you mean 'test'?"));
}

#[test]
fn test_conflict_fails_with_both_versions() {
    let fixture = layered().with_resolved("test", "pytest==7.4.0\nsix==1.15.0\n");

    fixture
        .command()
        .arg("lock")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("six"))
        .stderr(predicate::str::contains("1.16.0 and 1.15.0"));
}

#[test]
fn test_cycle_fails_before_compiling() {
    let fixture = TestFixture::new()
        .with_input("a.in", "-r b.in\n")
        .with_input("b.in", "-r a.in\n");

    fixture
        .command()
        .arg("lock")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Cyclic reference"));
    assert!(fixture.calls().is_empty());
}

#[test]
fn test_resolver_failure_shows_its_output() {
    let fixture = TestFixture::new().with_input("base.in", "no-such-package\n");

    fixture
        .command()
        .arg("lock")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Could not find a version"));
}

#[test]
fn test_missing_resolver_has_install_hint() {
    let fixture = TestFixture::new().with_input("base.in", "six\n");

    fixture
        .command()
        .args(["lock", "--resolver", "/nonexistent/pip-compile"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("pip install pip-tools"));
}

#[test]
fn test_configuration_file_sets_directory_and_policies() {
    let fixture = TestFixture::new()
        .with_file("deps/base.in", "django\n")
        .with_resolved("base", "django==4.2.7\n")
        .with_file(
            "requirements.ini",
            "[requirements]\ndirectory = deps\ncompatible = django\n",
        );

    fixture.command().arg("lock").assert().success();
    assert!(fixture.read("deps/base.txt").contains("django~=4.2.7"));
}

#[test]
fn test_no_matching_configuration_section_does_nothing() {
    let fixture = layered().with_file(
        "requirements.ini",
        "[requirements]\npython = 2.7\n",
    );

    fixture
        .command()
        .args(["lock", "--python-version", "3.12.1"])
        .assert()
        .success();
    assert!(fixture.calls().is_empty());
}
