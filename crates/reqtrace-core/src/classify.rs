//! Classification: one coverage verdict per spec entry.

use crate::runner::RunResults;
use crate::scanner::FunctionIndex;
use crate::spec::TransitionSpec;
use serde::Serialize;

/// Coverage verdict for one spec entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    /// The target function exists (reference mode) or was reported passing
    /// (execution mode).
    Pass,
    /// The target function ran and reported a failure.
    Fail,
    /// The target function does not exist in the test sources.
    MissingTest,
    /// Execution was requested but no binary reported the function.
    NotRun,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pass => "PASS",
            Status::Fail => "FAIL",
            Status::MissingTest => "MISSING_TEST",
            Status::NotRun => "NOT_RUN",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Assign a status to every entry, in place.
///
/// `results` is `Some` when execution was requested (execution mode) and
/// `None` in reference mode. Resolution precedence per entry, independent
/// of all other entries:
///
/// 1. function absent from the index: `MISSING_TEST`. This always wins,
///    even when execution results exist;
/// 2. reference mode: `PASS`, existence is sufficient evidence;
/// 3. function reported by a binary: `PASS`/`FAIL` mirroring the report;
/// 4. otherwise: `NOT_RUN`, which is distinct from a live failure.
pub fn classify(
    transitions: &mut [TransitionSpec],
    index: &FunctionIndex,
    results: Option<&RunResults>,
) {
    for transition in transitions {
        let function = transition.test_function.as_str();

        let Some(files) = index.files_for(function) else {
            transition.status = Some(Status::MissingTest);
            transition.status_detail =
                format!("Function '{}' not found in test sources", function);
            continue;
        };

        match results {
            None => {
                transition.status = Some(Status::Pass);
                transition.status_detail = format!("Found in {}", files.join(", "));
            }
            Some(results) => match results.get(function) {
                Some(outcome) => {
                    transition.status = Some(if outcome.passed {
                        Status::Pass
                    } else {
                        Status::Fail
                    });
                    transition.status_detail = outcome.detail.clone();
                }
                None => {
                    transition.status = Some(Status::NotRun);
                    transition.status_detail =
                        "Test binary did not report this function".to_string();
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, function: &str) -> TransitionSpec {
        TransitionSpec {
            id: id.to_string(),
            test_function: function.to_string(),
            ..TransitionSpec::default()
        }
    }

    fn index_with(entries: &[(&str, &str)]) -> FunctionIndex {
        let mut index = FunctionIndex::new();
        for (file, content) in entries {
            index.add_file_content(file, content);
        }
        index
    }

    #[test]
    fn test_missing_function_reference_mode() {
        let mut transitions = vec![entry("T1", "test_ghost")];
        let index = FunctionIndex::new();

        classify(&mut transitions, &index, None);

        assert_eq!(transitions[0].status, Some(Status::MissingTest));
        assert_eq!(
            transitions[0].status_detail,
            "Function 'test_ghost' not found in test sources"
        );
    }

    #[test]
    fn test_missing_function_wins_over_execution_results() {
        let mut transitions = vec![entry("T1", "test_ghost")];
        let index = FunctionIndex::new();
        // Even a recorded PASS cannot rescue a function the scanner never saw
        let mut results = RunResults::new();
        results.record("test_ghost", true, "[PASS] test_ghost");

        classify(&mut transitions, &index, Some(&results));

        assert_eq!(transitions[0].status, Some(Status::MissingTest));
    }

    #[test]
    fn test_reference_mode_existence_is_enough() {
        let mut transitions = vec![entry("T2", "test_real")];
        let index = index_with(&[("x.c", "void test_real(void) {}")]);

        classify(&mut transitions, &index, None);

        assert_eq!(transitions[0].status, Some(Status::Pass));
        assert_eq!(transitions[0].status_detail, "Found in x.c");
    }

    #[test]
    fn test_reference_mode_lists_all_defining_files() {
        let mut transitions = vec![entry("T2", "test_real")];
        let index = index_with(&[
            ("a.c", "void test_real(void) {}"),
            ("b.c", "void test_real(void) {}"),
        ]);

        classify(&mut transitions, &index, None);

        assert_eq!(transitions[0].status_detail, "Found in a.c, b.c");
    }

    #[test]
    fn test_execution_mode_mirrors_recorded_outcome() {
        let mut transitions = vec![entry("T2", "test_real")];
        let index = index_with(&[("x.c", "void test_real(void) {}")]);
        let mut results = RunResults::new();
        results.record("test_real", false, "[FAIL] test_real - assertion X");

        classify(&mut transitions, &index, Some(&results));

        assert_eq!(transitions[0].status, Some(Status::Fail));
        assert_eq!(transitions[0].status_detail, "[FAIL] test_real - assertion X");
    }

    #[test]
    fn test_execution_mode_unreported_function_is_not_run() {
        let mut transitions = vec![entry("T3", "test_untouched")];
        let index = index_with(&[("x.c", "void test_untouched(void) {}")]);
        let results = RunResults::new();

        classify(&mut transitions, &index, Some(&results));

        assert_eq!(transitions[0].status, Some(Status::NotRun));
        assert_eq!(
            transitions[0].status_detail,
            "Test binary did not report this function"
        );
    }

    #[test]
    fn test_build_failure_degrades_to_not_run() {
        // An empty result set (failed build) resolves every existing
        // function to NOT_RUN, never to an error
        let mut transitions = vec![
            entry("T1", "test_one"),
            entry("T2", "test_two"),
            entry("T3", "test_ghost"),
        ];
        let index = index_with(&[("x.c", "void test_one(void) {}\nvoid test_two(void) {}")]);
        let results = RunResults::new();

        classify(&mut transitions, &index, Some(&results));

        assert_eq!(transitions[0].status, Some(Status::NotRun));
        assert_eq!(transitions[1].status, Some(Status::NotRun));
        assert_eq!(transitions[2].status, Some(Status::MissingTest));
    }

    #[test]
    fn test_every_entry_gets_exactly_one_status() {
        let mut transitions = vec![
            entry("T1", "test_one"),
            entry("T2", "test_ghost"),
            entry("T3", "test_flaky"),
        ];
        let index = index_with(&[("x.c", "void test_one(void) {}\nvoid test_flaky(void) {}")]);
        let mut results = RunResults::new();
        results.record("test_flaky", false, "[FAIL] test_flaky - watchdog");

        classify(&mut transitions, &index, Some(&results));

        assert!(transitions.iter().all(|t| t.status.is_some()));
    }

    #[test]
    fn test_classification_is_idempotent() {
        let mut first = vec![entry("T1", "test_one"), entry("T2", "test_ghost")];
        let index = index_with(&[("x.c", "void test_one(void) {}")]);
        let mut results = RunResults::new();
        results.record("test_one", true, "[PASS] test_one");

        classify(&mut first, &index, Some(&results));
        let mut second = first.clone();
        classify(&mut second, &index, Some(&results));

        for (a, b) in first.iter().zip(&second) {
            assert_eq!(a.status, b.status);
            assert_eq!(a.status_detail, b.status_detail);
        }
    }
}
