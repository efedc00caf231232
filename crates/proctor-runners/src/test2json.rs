//! Classifier for the line-delimited JSON events printed by `go test -json`
//! (the `test2json` format).

use anyhow::Result;
use proctor_core::{ResultsParser, RunContext, TestResult};
use serde::Deserialize;
use tracing::{debug, warn};

/// One event. Only `Action` and `Test` drive classification.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct TestEvent {
    #[serde(rename = "Time", default)]
    pub time: Option<String>,
    #[serde(rename = "Action", default)]
    pub action: String,
    #[serde(rename = "Package", default)]
    pub package: String,
    #[serde(rename = "Test", default)]
    pub test: String,
    #[serde(rename = "Output", default)]
    pub output: Option<String>,
    #[serde(rename = "Elapsed", default)]
    pub elapsed: Option<f64>,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct Test2JsonParser;

impl Test2JsonParser {
    pub fn new() -> Self {
        Self
    }

    /// Folds the event stream into `seed`, or into a fresh result.
    pub fn parse(&self, seed: Option<TestResult>, raw: &[u8]) -> TestResult {
        let mut res = match seed {
            Some(mut seed) => {
                seed.reset_classification();
                seed
            }
            None => TestResult::default(),
        };

        let mut skipped = 0usize;
        for (idx, line) in raw.split(|b| *b == b'\n').enumerate() {
            let line = line.trim_ascii();
            if line.is_empty() {
                continue;
            }
            let event: TestEvent = match serde_json::from_slice(line) {
                Ok(ev) => ev,
                Err(e) => {
                    skipped += 1;
                    warn!(line = idx + 1, error = %e, "skipping malformed test event");
                    continue;
                }
            };
            if event.test.is_empty() {
                continue;
            }
            match event.action.as_str() {
                "pass" => res.record_pass(event.test),
                "fail" => res.record_fail(event.test),
                _ => {}
            }
        }

        res.finalize();
        debug!(
            passed = res.passed_tests.len(),
            failed = res.failed_tests.len(),
            skipped,
            "classified test events"
        );
        res
    }
}

impl ResultsParser for Test2JsonParser {
    fn parse_results(&self, _ctx: &RunContext, seed: Option<TestResult>, raw: &[u8]) -> Result<TestResult> {
        Ok(self.parse(seed, raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proctor_core::{ResourceDescriptor, TestOutcome};

    fn ev(action: &str, test: &str) -> String {
        format!(
            r#"{{"Time":"2025-01-01T00:00:00Z","Action":"{action}","Package":"example.com/m","Test":"{test}","Elapsed":0.01}}"#
        )
    }

    fn stream(lines: &[String]) -> Vec<u8> {
        lines.join("\n").into_bytes()
    }

    #[test]
    fn all_passing() {
        let raw = stream(&[ev("run", "TestA"), ev("pass", "TestA"), ev("pass", "TestB")]);
        let res = Test2JsonParser::new().parse(None, &raw);
        assert_eq!(res.result, TestOutcome::Pass);
        assert_eq!(res.passed_tests, vec!["TestA", "TestB"]);
        assert!(res.failed_tests.is_empty());
    }

    #[test]
    fn one_failure_fails_the_run() {
        let raw = stream(&[ev("pass", "TestA"), ev("fail", "TestB"), ev("pass", "TestC"), ev("fail", "TestD")]);
        let res = Test2JsonParser::new().parse(None, &raw);
        assert_eq!(res.result, TestOutcome::Fail);
        assert_eq!(res.failed_tests, vec!["TestB", "TestD"]);
        assert_eq!(res.passed_tests, vec!["TestA", "TestC"]);
    }

    #[test]
    fn malformed_line_is_skipped() {
        let raw = stream(&[ev("pass", "TestA"), "{not json".to_string(), ev("pass", "TestB")]);
        let res = Test2JsonParser::new().parse(None, &raw);
        assert_eq!(res.result, TestOutcome::Pass);
        assert_eq!(res.passed_tests, vec!["TestA", "TestB"]);
    }

    #[test]
    fn package_events_and_other_actions_are_ignored() {
        let pkg = r#"{"Action":"fail","Package":"example.com/m","Elapsed":0.2}"#.to_string();
        let raw = stream(&[pkg, ev("skip", "TestS"), ev("output", "TestA"), ev("pass", "TestA")]);
        let res = Test2JsonParser::new().parse(None, &raw);
        assert_eq!(res.result, TestOutcome::Pass);
        assert_eq!(res.passed_tests, vec!["TestA"]);
    }

    #[test]
    fn duplicates_are_kept_in_order() {
        let raw = stream(&[ev("pass", "TestA/sub"), ev("pass", "TestA"), ev("pass", "TestA")]);
        let res = Test2JsonParser::new().parse(None, &raw);
        assert_eq!(res.passed_tests, vec!["TestA/sub", "TestA", "TestA"]);
    }

    #[test]
    fn seed_keeps_configuration_and_drops_old_state() {
        let rd = ResourceDescriptor::for_commit("v1", "git+https://example.com/r@abc", "abc");
        let mut seed = TestResult::with_configuration(vec![rd.clone()]);
        seed.record_fail("TestStale");
        seed.finalize();

        let raw = stream(&[ev("pass", "TestA")]);
        let res = Test2JsonParser::new().parse_results(&RunContext::new(), Some(seed), &raw).unwrap();
        assert_eq!(res.result, TestOutcome::Pass);
        assert!(res.failed_tests.is_empty());
        assert_eq!(res.configuration, vec![rd]);
    }

    #[test]
    fn empty_stream_passes() {
        let res = Test2JsonParser::new().parse(None, b"");
        assert_eq!(res.result, TestOutcome::Pass);
        assert!(res.passed_tests.is_empty());
    }
}
