//! Splitting one runner response into per-node results.

use super::{RunRequest, RunTarget};
use crate::config::UnattributedFailure;
use crate::model::{NodeKey, RunResult};
use crate::runner::{RawRunOutput, RunnerError};

/// Converts a runner outcome into results for every node the request covers.
///
/// A case request yields one result carrying the raw pass/fail. A suite
/// request yields one result per case followed by a synthetic suite result
/// that passes only if every case did. A case in a failed suite run is
/// charged when the runner named it, or, when the runner named nobody,
/// according to `policy`. Dispatch errors fail every node.
pub fn fan_out(
    request: &RunRequest,
    outcome: Result<RawRunOutput, RunnerError>,
    policy: UnattributedFailure,
) -> Vec<RunResult> {
    let (raw, dispatch_failed) = match outcome {
        Ok(raw) => (raw, false),
        Err(err) => (
            RawRunOutput {
                passed: false,
                output: Vec::new(),
                failing_names: None,
                error: Some(err.to_string()),
            },
            true,
        ),
    };

    match &request.target {
        RunTarget::Case(key) => vec![RunResult::new(key, raw.passed, raw.output, raw.error)],
        RunTarget::Suite { key, cases } => {
            let attributed = raw.attributed_failures();
            let charge_unattributed = dispatch_failed || policy == UnattributedFailure::ChargeAll;

            let mut results = Vec::with_capacity(cases.len() + 1);
            for name in cases {
                let failed = !raw.passed
                    && match attributed {
                        Some(names) => names.iter().any(|n| n == name),
                        None => charge_unattributed,
                    };
                results.push(RunResult::new(
                    &NodeKey::new(&key.location, name),
                    !failed,
                    raw.output.clone(),
                    if failed { raw.error.clone() } else { None },
                ));
            }

            let suite_passed = results.iter().all(|r| r.passed);
            results.push(RunResult::new(key, suite_passed, raw.output, raw.error));
            results
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{TestCase, TestSuite};
    use std::path::Path;

    fn suite_request(cases: &[&str]) -> RunRequest {
        let location = Path::new("/w/pkg/a_test.go");
        let children = cases.iter().map(|c| TestCase::new(*c, location)).collect();
        RunRequest::suite(&TestSuite::for_file(location, children))
    }

    fn outcomes(results: &[RunResult]) -> Vec<(&str, bool)> {
        results.iter().map(|r| (r.name.as_str(), r.passed)).collect()
    }

    #[test]
    fn test_attributed_failure_charges_named_case_only() {
        let raw = RawRunOutput::failed(vec![], Some(vec!["B".to_string()]));
        let results = fan_out(&suite_request(&["A", "B", "C"]), Ok(raw), UnattributedFailure::ChargeAll);
        assert_eq!(
            outcomes(&results),
            vec![("A", true), ("B", false), ("C", true), ("a_test.go", false)]
        );
    }

    #[test]
    fn test_unattributed_failure_charges_all() {
        let raw = RawRunOutput::failed(vec![], Some(vec![]));
        let results = fan_out(&suite_request(&["A", "B"]), Ok(raw), UnattributedFailure::ChargeAll);
        assert_eq!(
            outcomes(&results),
            vec![("A", false), ("B", false), ("a_test.go", false)]
        );
    }

    #[test]
    fn test_unattributed_failure_charge_none_policy() {
        let raw = RawRunOutput::failed(vec![], None);
        let results = fan_out(&suite_request(&["A", "B"]), Ok(raw), UnattributedFailure::ChargeNone);
        assert_eq!(
            outcomes(&results),
            vec![("A", true), ("B", true), ("a_test.go", true)]
        );
    }

    #[test]
    fn test_dispatch_error_fails_everything_regardless_of_policy() {
        let err = RunnerError::Aborted("runner panicked".to_string());
        let results = fan_out(&suite_request(&["A", "B"]), Err(err), UnattributedFailure::ChargeNone);
        assert!(results.iter().all(|r| !r.passed));
        assert!(results
            .iter()
            .all(|r| r.error.as_deref() == Some("Test run aborted: runner panicked")));
    }

    #[test]
    fn test_passing_suite() {
        let raw = RawRunOutput::passed(vec!["ok  \tpkg\t0.01s".to_string()]);
        let results = fan_out(&suite_request(&["A", "B"]), Ok(raw), UnattributedFailure::ChargeAll);
        assert!(results.iter().all(|r| r.passed));
        assert!(results.iter().all(|r| r.output.len() == 1));
    }

    #[test]
    fn test_case_request_uses_raw_outcome() {
        let request = RunRequest::case(NodeKey::new("/w/pkg/a_test.go", "TestA"));
        let raw = RawRunOutput::failed(vec!["build failed".to_string()], None);
        let results = fan_out(&request, Ok(raw), UnattributedFailure::ChargeNone);
        assert_eq!(outcomes(&results), vec![("TestA", false)]);
    }
}
