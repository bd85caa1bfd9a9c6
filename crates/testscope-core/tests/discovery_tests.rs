mod common;

use std::fs;
use std::sync::Arc;

use common::{file, workspace, RecordingNotifier, TableProvider};
use testscope_core::discovery::GoSymbolProvider;
use testscope_core::{DiscoveryConfig, DiscoveryEngine, DiscoveryError, Event};

fn engine(provider: Arc<TableProvider>) -> DiscoveryEngine {
    DiscoveryEngine::new(DiscoveryConfig::default(), provider).unwrap()
}

#[tokio::test]
async fn test_cases_sorted_case_sensitively() {
    let temp = workspace(&["a_test.go"]);
    let provider = TableProvider::new(&[("a_test.go", &["Testb", "TestZ", "helper", "TestA", "ExampleB"])]);

    let report = engine(provider).discover(temp.path()).await.unwrap();

    let names: Vec<&str> = report.suites[0].children.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["ExampleB", "TestA", "TestZ", "Testb"]);
}

#[tokio::test]
async fn test_skip_folders_pruned_at_any_depth() {
    let temp = workspace(&[
        "a_test.go",
        "pkg/b_test.go",
        "vendor/c_test.go",
        "pkg/inner/vendor/d_test.go",
        ".git/e_test.go",
        "pkg/helper.go",
    ]);
    let provider = TableProvider::new(&[
        ("a_test.go", &["TestA"]),
        ("b_test.go", &["TestB"]),
        ("c_test.go", &["TestC"]),
        ("d_test.go", &["TestD"]),
        ("e_test.go", &["TestE"]),
    ]);

    let report = engine(provider).discover(temp.path()).await.unwrap();

    let mut names: Vec<&str> = report.suites.iter().map(|s| s.name.as_str()).collect();
    names.sort();
    assert_eq!(names, vec!["a_test.go", "b_test.go"]);
}

#[tokio::test]
async fn test_files_without_tests_are_empty_suites() {
    let temp = workspace(&["a_test.go", "util_test.go"]);
    let provider = TableProvider::new(&[("a_test.go", &["TestA"]), ("util_test.go", &["helper"])]);

    let report = engine(provider).discover(temp.path()).await.unwrap();

    assert_eq!(report.suites.len(), 2);
    let util = report.suites.iter().find(|s| s.name == "util_test.go").unwrap();
    assert!(!util.is_suite());
}

#[tokio::test]
async fn test_drop_empty_suites() {
    let temp = workspace(&["a_test.go", "util_test.go"]);
    let provider = TableProvider::new(&[("a_test.go", &["TestA"])]);
    let config = DiscoveryConfig {
        drop_empty_suites: true,
        ..DiscoveryConfig::default()
    };

    let report = DiscoveryEngine::new(config, provider)
        .unwrap()
        .discover(temp.path())
        .await
        .unwrap();

    assert_eq!(report.suites.len(), 1);
    assert_eq!(report.suites[0].name, "a_test.go");
}

#[tokio::test]
async fn test_lookup_failure_is_surfaced_not_dropped() {
    let temp = workspace(&["a_test.go", "broken_test.go"]);
    let provider = TableProvider::new(&[("a_test.go", &["TestA"])]);
    provider.fail("broken_test.go");
    let notifier = RecordingNotifier::default();
    let mut events: Vec<Event> = Vec::new();

    let report = engine(provider).run(temp.path(), &mut events, &notifier).await;

    assert!(report.is_ok());
    assert_eq!(report.suites.len(), 2);
    assert_eq!(report.warnings.len(), 1);
    assert!(matches!(report.warnings[0], DiscoveryError::Lookup(_)));

    let messages = notifier.messages.lock().unwrap();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("broken_test.go"));
}

#[tokio::test]
async fn test_publishes_started_then_full_tree_once() {
    let temp = workspace(&["a_test.go", "pkg/b_test.go"]);
    let provider = TableProvider::new(&[("a_test.go", &["TestA"]), ("b_test.go", &["TestB", "TestC"])]);
    let notifier = RecordingNotifier::default();
    let mut events: Vec<Event> = Vec::new();

    engine(provider).run(temp.path(), &mut events, &notifier).await;

    assert_eq!(events.len(), 2);
    assert!(matches!(events[0], Event::DiscoveryStarted));
    match &events[1] {
        Event::Discovered(suites) => {
            assert_eq!(suites.len(), 2);
            assert_eq!(suites.iter().map(|s| s.children.len()).sum::<usize>(), 3);
        }
        other => panic!("unexpected event {:?}", other),
    }
}

#[tokio::test]
async fn test_missing_root_publishes_empty_tree_and_notifies() {
    let temp = workspace(&[]);
    let missing = file(temp.path(), "nope");
    let notifier = RecordingNotifier::default();
    let mut events: Vec<Event> = Vec::new();

    let report = engine(TableProvider::new(&[])).run(&missing, &mut events, &notifier).await;

    assert!(matches!(report.error, Some(DiscoveryError::RootNotFound(_))));
    assert!(matches!(&events[1], Event::Discovered(s) if s.is_empty()));
    assert!(notifier.messages.lock().unwrap()[0].starts_with("discovery failed"));
}

#[tokio::test]
async fn test_resolve_root_prefers_src() {
    let with_src = workspace(&["src/a_test.go"]);
    let without_src = workspace(&["a_test.go"]);
    let engine = engine(TableProvider::new(&[]));

    assert_eq!(engine.resolve_root(with_src.path()), with_src.path().join("src"));
    assert_eq!(engine.resolve_root(without_src.path()), without_src.path());
}

#[tokio::test]
async fn test_discovers_real_go_files() {
    let temp = workspace(&[]);
    let pkg = temp.path().join("pkg");
    fs::create_dir_all(&pkg).unwrap();
    fs::write(
        pkg.join("math_test.go"),
        r#"package pkg

import "testing"

type MathSuite struct{}

func TestSub(t *testing.T) {}
func TestAdd(t *testing.T) {}
func (s *MathSuite) TestDiv() {}
func ExampleAdd() {}
func BenchmarkAdd(b *testing.B) {}
func helper() {}
"#,
    )
    .unwrap();
    fs::write(pkg.join("math.go"), "package pkg\n\nfunc TestNotATestFile() {}\n").unwrap();

    let engine = DiscoveryEngine::new(DiscoveryConfig::default(), Arc::new(GoSymbolProvider::new())).unwrap();
    let report = engine.discover(temp.path()).await.unwrap();

    assert_eq!(report.suites.len(), 1);
    let names: Vec<&str> = report.suites[0].children.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["(*MathSuite).TestDiv", "ExampleAdd", "TestAdd", "TestSub"]);
    assert_eq!(report.suites[0].children[2].range.unwrap().start_line, 8);
}
