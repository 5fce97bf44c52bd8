//! Scenario files replayed through the public scenario API

#![cfg(unix)]

use std::path::{Path, PathBuf};
use std::time::Duration;

use jamcheck::scenario::{Scenario, discover_scenarios};
use jamcheck::{HarnessConfig, HarnessError};

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

#[test]
fn test_all_passing_scenarios() {
    let files = discover_scenarios(&fixtures().join("scenarios"));
    assert_eq!(files.len(), 4);

    for file in files {
        let scenario = Scenario::load(&file).unwrap();
        let run = scenario.execute(&config());
        assert!(
            run.passed(),
            "{} failed: {}",
            file.display(),
            run.failure.map(|f| f.to_string()).unwrap_or_default()
        );
    }
}

#[test]
fn test_failing_scenario_reports_missing_path() {
    let scenario = Scenario::load(&fixtures().join("failing/wrong_library.json")).unwrap();
    let run = scenario.execute(&config());

    let failure = run.failure.expect("scenario should fail");
    assert_eq!(failure.index, Some(1));
    let mismatch = failure.error.as_expectation_failure().unwrap();
    assert_eq!(mismatch.missing, vec!["lib/bin/gcc/debug/link-static/lib.so".to_string()]);
    assert_eq!(mismatch.unexpected, vec!["lib/bin/gcc/debug/link-static/lib.a".to_string()]);
    assert!(run.last_output.unwrap().contains("link-static/lib.a"));
}

#[test]
fn test_scenario_timeout() {
    let scenario = Scenario::from_json(
        r#"{"name": "hangs", "tree": "basic", "steps": [{"run": {"args": "--sleep=30"}}, "expect_nothing"]}"#,
        Path::new("hangs.json"),
    )
    .unwrap();
    let run = scenario.execute(&config().with_timeout(Duration::from_secs(1)));
    let failure = run.failure.unwrap();
    assert_eq!(failure.index, Some(0));
    assert!(matches!(failure.error, HarnessError::BuildTimeout { .. }));
}

#[test]
fn test_missing_scenario_file() {
    let err = Scenario::load(&fixtures().join("scenarios/does-not-exist.json")).unwrap_err();
    assert!(matches!(err, HarnessError::Scenario { .. }));
}
