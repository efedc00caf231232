use std::fmt;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use proctor_core::{LaunchError, ResultsParser, TestRunner};
use proctor_runners::{GoRunner, ShellRunner, Test2JsonParser};

use crate::config::{RunnerConfig, RunnerKind};

/// A runner paired with the parser that understands its output.
pub struct LaunchPack {
    pub ecosystem: String,
    pub runner: Box<dyn TestRunner>,
    pub parser: Box<dyn ResultsParser>,
}

impl fmt::Debug for LaunchPack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LaunchPack").field("ecosystem", &self.ecosystem).finish_non_exhaustive()
    }
}

#[derive(Default)]
pub struct LaunchPackBuilder {
    ecosystem: Option<String>,
    runner: Option<Box<dyn TestRunner>>,
    parser: Option<Box<dyn ResultsParser>>,
}

impl LaunchPackBuilder {
    pub fn ecosystem(mut self, name: impl Into<String>) -> Self {
        self.ecosystem = Some(name.into());
        self
    }

    pub fn runner(mut self, runner: impl TestRunner + 'static) -> Self {
        self.runner = Some(Box::new(runner));
        self
    }

    pub fn parser(mut self, parser: impl ResultsParser + 'static) -> Self {
        self.parser = Some(Box::new(parser));
        self
    }

    /// Fails with every missing half listed.
    pub fn build(self) -> Result<LaunchPack> {
        let mut missing = Vec::new();
        if self.parser.is_none() {
            missing.push("LaunchPack has no parser set".to_string());
        }
        if self.runner.is_none() {
            missing.push("LaunchPack has no runner set".to_string());
        }
        match (self.runner, self.parser) {
            (Some(runner), Some(parser)) => Ok(LaunchPack {
                ecosystem: self.ecosystem.unwrap_or_else(|| "custom".to_string()),
                runner,
                parser,
            }),
            _ => Err(LaunchError::IncompletePack(missing).into()),
        }
    }
}

type BuildFn = fn(&Path, &RunnerConfig) -> Result<LaunchPack>;

struct Detector {
    name: &'static str,
    detect: fn(&Path) -> bool,
    build: BuildFn,
}

/// Checked in order; the first matching detector builds the pack.
const DETECTORS: &[Detector] = &[Detector { name: "go", detect: has_go_module, build: go_pack }];

fn has_go_module(path: &Path) -> bool {
    path.join("go.mod").is_file()
}

fn go_pack(path: &Path, cfg: &RunnerConfig) -> Result<LaunchPack> {
    let runner = GoRunner::new(path)
        .context("initializing go launchpack")?
        .with_extra_args(&cfg.args)
        .with_env(cfg.env.clone());
    let shared = Arc::new(runner);
    LaunchPack::builder().ecosystem("go").runner(shared.clone()).parser(shared).build()
}

fn command_pack(path: &Path, cfg: &RunnerConfig) -> Result<LaunchPack> {
    let command = cfg.command.as_deref().unwrap_or_default();
    let runner = ShellRunner::new(command)
        .with_work_dir(path)
        .with_args(cfg.args.iter().cloned())
        .with_env(cfg.env.clone());
    LaunchPack::builder()
        .ecosystem(format!("command:{command}"))
        .runner(runner)
        .parser(Test2JsonParser::new())
        .build()
}

/// Name of the first ecosystem detected at `path`.
pub fn detect_ecosystem(path: &Path) -> Option<&'static str> {
    DETECTORS.iter().find(|d| (d.detect)(path)).map(|d| d.name)
}

impl LaunchPack {
    pub fn builder() -> LaunchPackBuilder {
        LaunchPackBuilder::default()
    }

    /// Builds a pack by looking at the files in the codebase.
    pub fn from_repo(path: &Path) -> Result<Self> {
        Self::from_config(path, &RunnerConfig::default())
    }

    /// Builds the pack the runner config asks for, detecting when `auto`.
    pub fn from_config(path: &Path, cfg: &RunnerConfig) -> Result<Self> {
        match cfg.kind {
            RunnerKind::Go => go_pack(path, cfg),
            RunnerKind::Command => command_pack(path, cfg),
            RunnerKind::Auto => {
                let detector = DETECTORS
                    .iter()
                    .find(|d| (d.detect)(path))
                    .ok_or_else(|| LaunchError::UnsupportedEcosystem(path.to_path_buf()))?;
                (detector.build)(path, cfg)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proctor_core::{RunContext, RunOutput, TestResult};
    use tempfile::tempdir;

    struct NoopRunner;

    impl TestRunner for NoopRunner {
        fn run(&self, _ctx: &RunContext) -> Result<RunOutput> {
            Ok(RunOutput::default())
        }
    }

    #[test]
    fn detects_go_module() {
        let dir = tempdir().unwrap();
        assert_eq!(detect_ecosystem(dir.path()), None);
        std::fs::write(dir.path().join("go.mod"), "module example.com/m\n").unwrap();
        assert_eq!(detect_ecosystem(dir.path()), Some("go"));

        let pack = LaunchPack::from_repo(dir.path()).unwrap();
        assert_eq!(pack.ecosystem, "go");
    }

    #[test]
    fn unknown_ecosystem_is_an_error() {
        let dir = tempdir().unwrap();
        let err = LaunchPack::from_repo(dir.path()).unwrap_err();
        assert!(matches!(err.downcast_ref::<LaunchError>(), Some(LaunchError::UnsupportedEcosystem(_))));
    }

    #[test]
    fn configured_kind_skips_detection() {
        let dir = tempdir().unwrap();
        let cfg = RunnerConfig { kind: RunnerKind::Go, ..RunnerConfig::default() };
        assert_eq!(LaunchPack::from_config(dir.path(), &cfg).unwrap().ecosystem, "go");

        let cfg = RunnerConfig {
            kind: RunnerKind::Command,
            command: Some("gotestsum".into()),
            ..RunnerConfig::default()
        };
        assert_eq!(LaunchPack::from_config(dir.path(), &cfg).unwrap().ecosystem, "command:gotestsum");
    }

    #[test]
    fn builder_reports_missing_halves() {
        let err = LaunchPack::builder().build().unwrap_err();
        match err.downcast_ref::<LaunchError>() {
            Some(LaunchError::IncompletePack(missing)) => assert_eq!(missing.len(), 2),
            other => panic!("unexpected error: {other:?}"),
        }

        let pack = LaunchPack::builder().runner(NoopRunner).parser(Test2JsonParser::new()).build().unwrap();
        assert_eq!(pack.ecosystem, "custom");
        let res: TestResult = pack.parser.parse_results(&RunContext::new(), None, b"").unwrap();
        assert!(res.passed_tests.is_empty());
    }
}
