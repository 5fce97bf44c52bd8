//! End-to-end harness tests against a stand-in build tool
//!
//! `tests/fixtures/fakejam.sh` reads `jamfile.targets` files and creates empty artifacts under
//! `bin/<toolset>/<variant>[/link-<link>]/`, so every behavior here goes through a real subprocess.

#![cfg(unix)]

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use jamcheck::{
    Expectation, ExpectedPaths, Harness, HarnessConfig, HarnessError, HarnessState, MatchMode, RunOptions,
};

fn fixtures() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn config() -> HarnessConfig {
    HarnessConfig::new()
        .with_program("sh")
        .with_default_arg(fixtures().join("fakejam.sh").display().to_string())
        .with_fixtures_dir(fixtures().join("trees"))
        .with_timeout(Duration::from_secs(30))
}

fn harness_with(tree: &str) -> Harness {
    let mut t = Harness::new(config()).unwrap();
    t.seed_tree(tree).unwrap();
    t
}

#[test]
fn test_three_objects_then_nothing() {
    let mut t = harness_with("basic");
    t.run_build_system(RunOptions::new()).unwrap();
    t.expect_addition(ExpectedPaths::product("bin/$toolset/debug/", "a.o b.o c.o"))
        .unwrap();
    t.expect_nothing_more().unwrap();

    // Everything is up to date: a second build changes nothing.
    t.run("").unwrap();
    t.expect_nothing().unwrap();
}

#[test]
fn test_static_link_in_subproject() {
    let mut t = harness_with("basic");
    t.run_build_system(RunOptions::new().subdir("lib").args("link=static"))
        .unwrap();

    let err = t
        .expect_addition("lib/bin/$toolset/debug/link-static/lib.so")
        .unwrap_err();
    let failure = err.as_expectation_failure().unwrap();
    assert_eq!(failure.expectation, Expectation::Addition);
    assert_eq!(failure.missing, vec!["lib/bin/gcc/debug/link-static/lib.so".to_string()]);

    t.expect_addition("lib/bin/$toolset/debug/link-static/lib.a")
        .unwrap();
    t.expect_nothing_more().unwrap();
}

#[test]
fn test_subdirectory_build_is_incremental() {
    let mut t = harness_with("nested");
    t.run_build_system(RunOptions::new().subdir("lib")).unwrap();
    t.expect_addition(ExpectedPaths::product("lib/bin/$toolset/debug/", "lib.so util.o"))
        .unwrap();

    // The root build only adds what the subproject build did not.
    t.run("").unwrap();
    t.expect_addition(ExpectedPaths::product("bin/$toolset/debug/", "app main.o"))
        .unwrap();
    t.expect_nothing_more().unwrap();
}

#[test]
fn test_chained_runs_accumulate_into_one_delta() {
    let mut t = harness_with("nested");
    t.run_build_system(RunOptions::new().subdir("lib")).unwrap();
    t.run_build_system(RunOptions::new().subdir("lib").args("variant=release"))
        .unwrap();
    assert_eq!(t.state(), HarnessState::AwaitingExpectation);

    t.expect_addition(
        ExpectedPaths::product("lib/bin/$toolset/debug/", "lib.so util.o")
            + ExpectedPaths::product("lib/bin/$toolset/release/", "lib.so util.o"),
    )
    .unwrap();
    assert_eq!(t.state(), HarnessState::Ready);
}

#[test]
fn test_removal_by_build() {
    let mut t = harness_with("basic");
    t.run("").unwrap();
    t.expect_addition(ExpectedPaths::product("bin/$toolset/debug/", "a.o b.o c.o"))
        .unwrap();

    t.run("--no-build --remove=bin/gcc/debug/b.o").unwrap();
    t.expect_removal("bin/$toolset/debug/b.o").unwrap();
    t.expect_nothing_more().unwrap();
}

#[test]
fn test_harness_writes_are_not_reported() {
    let mut t = Harness::new(config()).unwrap();
    t.write("jamfile.targets", "hello\n").unwrap();
    t.write("src/hello.cpp", "int main() {}\n").unwrap();
    t.run("").unwrap();
    t.expect_addition("bin/$toolset/debug/hello").unwrap();
    t.expect_nothing_more().unwrap();
}

#[test]
fn test_written_file_round_trip() {
    let mut t = Harness::new(config()).unwrap();
    t.write("a/b/c.txt", "content").unwrap();
    let snapshot = jamcheck::snapshot::capture(t.root()).unwrap();
    assert!(snapshot.contains("a/b/c.txt"));
    assert_eq!(snapshot.len(), 1);
}

#[test]
fn test_unrelated_files_fail_exact_match() {
    let mut t = harness_with("nested");
    t.run("").unwrap();
    let err = t
        .expect_addition(ExpectedPaths::product("bin/$toolset/debug/", "app main.o"))
        .unwrap_err();
    let failure = err.as_expectation_failure().unwrap();
    assert_eq!(
        failure.unexpected,
        vec!["lib/bin/gcc/debug/lib.so".to_string(), "lib/bin/gcc/debug/util.o".to_string()]
    );
}

#[test]
fn test_at_least_mode_tolerates_extra_files() {
    let mut t = Harness::new(config().with_match_mode(MatchMode::AtLeast)).unwrap();
    t.seed_tree("nested").unwrap();
    t.run("").unwrap();
    t.expect_addition(ExpectedPaths::product("bin/$toolset/debug/", "app main.o"))
        .unwrap();
    assert!(t.expect_nothing_more().is_err());
}

#[test]
fn test_ignored_paths_are_dropped() {
    let mut t = harness_with("nested");
    t.ignore("lib/*").unwrap();
    t.run("").unwrap();
    t.expect_addition(ExpectedPaths::product("bin/$toolset/debug/", "app main.o"))
        .unwrap();
    t.expect_nothing_more().unwrap();
}

#[test]
fn test_timeout_destroys_workspace() {
    let mut t = Harness::new(config().with_timeout(Duration::from_secs(1))).unwrap();
    t.seed_tree("basic").unwrap();
    let root = t.root().to_path_buf();

    let err = t.run("--sleep=30").unwrap_err();
    assert!(matches!(err, HarnessError::BuildTimeout { .. }));
    assert_eq!(t.state(), HarnessState::Closed);
    assert!(!root.exists());
    assert!(t.last_run().is_some_and(|record| record.timed_out));
    assert!(matches!(t.expect_nothing(), Err(HarnessError::Closed)));
}

#[test]
fn test_unexpected_failure_keeps_workspace() {
    let mut t = harness_with("basic");
    let err = t.run("--fail").unwrap_err();
    let (status, output) = match err {
        HarnessError::BuildFailed { status, output, .. } => (status, output),
        other => panic!("expected BuildFailed, got {other:?}"),
    };
    assert_eq!(status, "exit code 1");
    assert!(output.contains("failing as requested"));
    assert!(t.root().exists());
    assert_ne!(t.state(), HarnessState::Closed);
}

#[test]
fn test_expected_failure_still_tracks_changes() {
    let mut t = harness_with("basic");
    t.run_build_system(RunOptions::new().arg("--fail").expect_failure())
        .unwrap();
    assert_eq!(t.last_run().and_then(|record| record.exit_code), Some(1));
    t.expect_addition(ExpectedPaths::product("bin/$toolset/debug/", "a.o b.o c.o"))
        .unwrap();
}

#[test]
fn test_toolset_and_variant_flow_into_expectations() {
    let mut t = Harness::new(config().with_toolset("clang").with_variant("release")).unwrap();
    t.seed_tree("basic").unwrap();
    t.run("variant=release").unwrap();
    t.expect_addition(ExpectedPaths::product("bin/$toolset/$variant/", "a.obj b.obj c.obj"))
        .unwrap();
}

#[test]
fn test_parallel_harnesses_are_isolated() {
    let a = harness_with("basic");
    let b = harness_with("basic");
    assert_ne!(a.root(), b.root());

    let handles: Vec<_> = [a, b]
        .into_iter()
        .map(|mut t| {
            std::thread::spawn(move || {
                t.run("").unwrap();
                t.expect_addition(ExpectedPaths::product("bin/$toolset/debug/", "a.o b.o c.o"))
                    .unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
}

#[test]
fn test_drop_cleans_up_after_failure() {
    let root = {
        let mut t = harness_with("basic");
        t.run("").unwrap();
        let _ = t.expect_addition("nothing-like-this.o");
        t.root().to_path_buf()
    };
    assert!(!root.exists());
    assert!(fs::metadata(fixtures().join("trees/basic/jamfile.targets")).is_ok());
}
