//! `GoTestRunner` against a stand-in toolchain.
//!
//! The runner is pointed at `sh`, so `sh test -timeout ...` executes the
//! script named `test` in the package directory with go's arguments.
#![cfg(unix)]

use std::fs;
use std::time::Duration;
use tempfile::TempDir;

use testscope_core::runner::GoTestRunner;
use testscope_core::{RunConfig, RunnerError, TestRunner};

fn package(script: &str) -> TempDir {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("test"), script).unwrap();
    temp
}

fn run_config(dir: &TempDir, names: &[&str], timeout_secs: u64) -> RunConfig {
    RunConfig {
        working_dir: dir.path().to_path_buf(),
        target_names: names.iter().map(|s| s.to_string()).collect(),
        timeout: Duration::from_secs(timeout_secs),
        extra_flags: Vec::new(),
    }
}

#[tokio::test]
async fn test_target_that_did_not_run_is_failed() {
    let dir = package(
        "echo 'testing: warning: no tests to run'\necho 'PASS'\necho 'ok  \tx\t0.001s [no tests to run]'\nexit 0\n",
    );
    let runner = GoTestRunner::new("sh");

    let raw = runner.run(run_config(&dir, &["TestA"], 30)).await.unwrap();

    assert!(!raw.passed);
    assert_eq!(raw.failing_names, Some(vec!["TestA".to_string()]));
    assert_eq!(raw.error.as_deref(), Some("did not run: TestA"));
}

#[tokio::test]
async fn test_receiver_method_runs_through_suite_function() {
    let dir = package(
        r#"case "$*" in
  *"-run ^(TestMathSuite)$ -testify.m ^(TestDiv)$"*)
    echo "=== RUN   TestMathSuite"
    echo "=== RUN   TestMathSuite/TestDiv"
    echo "--- PASS: TestMathSuite (0.00s)"
    echo "    --- PASS: TestMathSuite/TestDiv (0.00s)"
    exit 0;;
  *)
    echo "testing: warning: no tests to run"
    exit 0;;
esac
"#,
    );
    fs::write(
        dir.path().join("math_test.go"),
        "package math\n\nfunc TestMathSuite(t *testing.T) {\n\tsuite.Run(t, new(MathSuite))\n}\n",
    )
    .unwrap();
    let runner = GoTestRunner::new("sh");

    let raw = runner
        .run(run_config(&dir, &["(*MathSuite).TestDiv"], 30))
        .await
        .unwrap();

    assert!(raw.passed, "output: {:?}", raw.output);
}

#[tokio::test]
async fn test_receiver_method_without_suite_function_is_failed() {
    let dir = package("echo 'should not be called'\nexit 0\n");
    let runner = GoTestRunner::new("sh");

    let raw = runner
        .run(run_config(&dir, &["(*MathSuite).TestDiv"], 30))
        .await
        .unwrap();

    assert!(!raw.passed);
    assert!(raw.output.is_empty());
    assert_eq!(raw.failing_names, Some(vec!["(*MathSuite).TestDiv".to_string()]));
}

#[tokio::test]
async fn test_method_flag_disabled_leaves_methods_unrunnable() {
    let dir = package("echo 'should not be called'\nexit 0\n");
    fs::write(
        dir.path().join("math_test.go"),
        "package math\n\nfunc TestMathSuite(t *testing.T) {\n\tsuite.Run(t, new(MathSuite))\n}\n",
    )
    .unwrap();
    let runner = GoTestRunner::new("sh").with_suite_method_flag(None);

    let raw = runner
        .run(run_config(&dir, &["(*MathSuite).TestDiv"], 30))
        .await
        .unwrap();

    assert!(!raw.passed);
    assert!(raw.error.unwrap().contains("(*MathSuite).TestDiv"));
}

#[tokio::test]
async fn test_zero_timeout_never_kills() {
    let dir = package(
        "sleep 1\necho '=== RUN   TestA'\necho '--- PASS: TestA (1.00s)'\nexit 0\n",
    );
    let runner = GoTestRunner::new("sh").with_grace(Duration::from_millis(100));

    let raw = runner.run(run_config(&dir, &["TestA"], 0)).await.unwrap();

    assert!(raw.passed, "output: {:?}", raw.output);
}

#[tokio::test]
async fn test_process_killed_after_timeout_and_grace() {
    let dir = package("sleep 10\nexit 0\n");
    let runner = GoTestRunner::new("sh").with_grace(Duration::ZERO);

    let err = runner.run(run_config(&dir, &["TestA"], 1)).await.unwrap_err();

    assert!(matches!(err, RunnerError::Timeout(limit) if limit == Duration::from_secs(1)));
}
