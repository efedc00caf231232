use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use proctor_core::{ResultsParser, RunContext, RunOutput, TestResult, TestRunner};

use crate::shell::ShellRunner;
use crate::test2json::Test2JsonParser;

pub const GO_COMMAND: &str = "go";
pub const GO_TEST_ARGS: [&str; 3] = ["test", "-json", "./..."];

/// Runs `go test -json ./...` and classifies its events.
#[derive(Clone, Debug)]
pub struct GoRunner {
    work_dir: PathBuf,
    shell: ShellRunner,
    parser: Test2JsonParser,
}

impl GoRunner {
    pub fn new(work_dir: impl Into<PathBuf>) -> Result<Self> {
        let work_dir = work_dir.into();
        if !work_dir.is_dir() {
            return Err(anyhow!("working dir does not exist: {}", work_dir.display()));
        }
        let shell = ShellRunner::new(GO_COMMAND).with_work_dir(&work_dir).with_args(GO_TEST_ARGS);
        Ok(Self { work_dir, shell, parser: Test2JsonParser::new() })
    }

    /// Appends arguments after the default `test -json ./...`.
    pub fn with_extra_args(mut self, extra: &[String]) -> Self {
        self.shell.options.args.extend(extra.iter().cloned());
        self
    }

    pub fn with_env(mut self, env: BTreeMap<String, String>) -> Self {
        self.shell.options.env.extend(env);
        self
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    pub fn args(&self) -> &[String] {
        &self.shell.options.args
    }
}

impl TestRunner for GoRunner {
    fn run(&self, ctx: &RunContext) -> Result<RunOutput> {
        self.shell.run(ctx)
    }
}

impl ResultsParser for GoRunner {
    fn parse_results(&self, ctx: &RunContext, seed: Option<TestResult>, raw: &[u8]) -> Result<TestResult> {
        self.parser.parse_results(ctx, seed, raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proctor_core::TestOutcome;
    use tempfile::tempdir;

    #[test]
    fn builds_go_test_invocation() {
        let dir = tempdir().unwrap();
        let runner = GoRunner::new(dir.path()).unwrap().with_extra_args(&["-count=1".to_string()]);
        assert_eq!(runner.args(), ["test", "-json", "./...", "-count=1"]);
        assert_eq!(runner.work_dir(), dir.path());
    }

    #[test]
    fn rejects_missing_work_dir() {
        let dir = tempdir().unwrap();
        assert!(GoRunner::new(dir.path().join("nope")).is_err());
    }

    #[test]
    fn parses_like_test2json() {
        let dir = tempdir().unwrap();
        let runner = GoRunner::new(dir.path()).unwrap();
        let raw = br#"{"Action":"fail","Test":"TestBroken"}"#;
        let res = runner.parse_results(&RunContext::new(), None, raw).unwrap();
        assert_eq!(res.result, TestOutcome::Fail);
        assert_eq!(res.failed_tests, vec!["TestBroken"]);
    }
}
