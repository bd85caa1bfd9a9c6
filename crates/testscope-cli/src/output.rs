//! Plain-text rendering of the test tree.

use std::path::Path;

use testscope_core::{Notifier, Status, StatusSummary, TestSuite};

/// Surfaces discovery problems on stderr, above any progress output.
pub struct StderrNotifier;

impl Notifier for StderrNotifier {
    fn notify_error(&self, message: &str) {
        eprintln!("warning: {}", message);
    }
}

fn icon(status: Status) -> &'static str {
    match status {
        Status::Loading => "…",
        Status::Unknown => "·",
        Status::Passed => "✓",
        Status::Failed => "✗",
    }
}

fn relative<'a>(path: &'a Path, root: &Path) -> &'a Path {
    path.strip_prefix(root).unwrap_or(path)
}

pub fn print_tree(suites: &[TestSuite], root: &Path) {
    if suites.is_empty() {
        println!("No test files found under {}", root.display());
        return;
    }

    for suite in suites {
        println!("{}", relative(&suite.location, root).display());
        for case in &suite.children {
            match case.range {
                Some(range) => println!("  {} (line {})", case.name, range.start_line),
                None => println!("  {}", case.name),
            }
        }
    }
}

/// Prints every case that ran, with failure output for the failed ones.
pub fn print_results(suites: &[TestSuite], root: &Path) {
    for suite in suites.iter().filter(|s| s.last_result().is_some()) {
        println!(
            "{} {}",
            icon(suite.status()),
            relative(&suite.location, root).display()
        );

        for case in suite.children.iter().filter(|c| c.last_result().is_some()) {
            println!("    {} {}", icon(case.status()), case.name);
        }
    }

    // Case runs don't attach a suite result, so walk the cases separately.
    for suite in suites.iter().filter(|s| s.last_result().is_none()) {
        for case in suite.children.iter().filter(|c| c.last_result().is_some()) {
            println!(
                "{} {}::{}",
                icon(case.status()),
                relative(&suite.location, root).display(),
                case.name
            );
        }
    }

    for report in failure_reports(suites) {
        println!("\n--- {} ---", report.names.join(", "));
        if let Some(error) = report.error {
            println!("{}", error);
        }
        for line in report.output {
            println!("{}", line);
        }
    }
}

/// One block of failure output and every failed case it belongs to.
#[derive(Debug)]
pub struct FailureReport<'a> {
    pub names: Vec<&'a str>,
    pub error: Option<&'a str>,
    pub output: &'a [String],
}

/// Failed cases grouped per suite by identical output, so a suite run
/// charged to every case shows its `go test` output once.
pub fn failure_reports(suites: &[TestSuite]) -> Vec<FailureReport<'_>> {
    let mut reports: Vec<FailureReport<'_>> = Vec::new();
    for suite in suites {
        let start = reports.len();
        for case in &suite.children {
            let Some(result) = case.last_result().filter(|r| !r.passed) else {
                continue;
            };
            let error = result.error.as_deref();
            let existing = reports[start..]
                .iter_mut()
                .find(|r| r.output == result.output.as_slice() && r.error == error);
            match existing {
                Some(report) => report.names.push(&case.name),
                None => reports.push(FailureReport {
                    names: vec![&case.name],
                    error,
                    output: &result.output,
                }),
            }
        }
    }
    reports
}

pub fn print_summary(summary: &StatusSummary) {
    println!(
        "\n{} passed, {} failed, {} not run ({} total)",
        summary.passed,
        summary.failed,
        summary.unknown + summary.loading,
        summary.total()
    );
}
