use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use proctor_core::{LaunchError, ResourceDescriptor, RunContext, Statement, TestResult};
use proctor_vcs::ProvenanceSource;
use proctor_vcs_git::{is_git_worktree, GitRepo};
use tracing::{debug, info, warn};

use crate::config::LaunchConfig;
use crate::pack::LaunchPack;

/// Where a launch is in its pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LaunchStage {
    Init,
    Provenance,
    Running,
    Parsing,
    Serializing,
    Done,
    Failed,
}

pub struct LaunchOptions {
    /// Sink for the final document. Owned and closed by the caller.
    pub writer: Option<Box<dyn Write + Send>>,
    pub work_dir: PathBuf,
    /// Wrap the result in an in-toto statement.
    pub attest: bool,
    /// Treat provenance failures as fatal.
    pub provenance_required: bool,
    pub result_url: Option<String>,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            writer: Some(Box::new(std::io::stdout())),
            work_dir: PathBuf::from("."),
            attest: true,
            provenance_required: true,
            result_url: None,
        }
    }
}

impl fmt::Debug for LaunchOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LaunchOptions")
            .field("writer", &self.writer.as_ref().map(|_| "<writer>"))
            .field("work_dir", &self.work_dir)
            .field("attest", &self.attest)
            .field("provenance_required", &self.provenance_required)
            .field("result_url", &self.result_url)
            .finish()
    }
}

impl LaunchOptions {
    /// Options for `work_dir` taken from `cfg`, writing to `writer`.
    pub fn from_config(work_dir: impl Into<PathBuf>, cfg: &LaunchConfig, writer: Option<Box<dyn Write + Send>>) -> Self {
        Self {
            writer,
            work_dir: work_dir.into(),
            attest: cfg.output.attest,
            provenance_required: cfg.provenance.required,
            result_url: cfg.result.url.clone(),
        }
    }
}

/// Produces the provenance-seeded result a launch starts from.
pub trait LauncherBackend: Send + Sync {
    /// `None` when the codebase carries no VCS metadata.
    fn init_result(&self, ctx: &RunContext, work_dir: &Path) -> Result<Option<TestResult>>;
}

/// Reads provenance from a git working copy.
#[derive(Clone, Copy, Debug, Default)]
pub struct GitBackend;

impl LauncherBackend for GitBackend {
    fn init_result(&self, _ctx: &RunContext, work_dir: &Path) -> Result<Option<TestResult>> {
        if !is_git_worktree(work_dir) {
            debug!(dir = %work_dir.display(), "no .git marker, skipping provenance");
            return Ok(None);
        }
        let repo = GitRepo::open(work_dir)?;
        let descriptor = describe_repository(&repo)?;
        Ok(Some(TestResult::with_configuration(vec![descriptor])))
    }
}

/// The resource descriptor of the revision a source points at.
pub fn describe_repository(source: &dyn ProvenanceSource) -> Result<ResourceDescriptor> {
    let locator = source.vcs_locator().context("reading VCS locator")?;
    let version = source.repo_version().context("computing git commit")?;
    Ok(ResourceDescriptor::for_commit(version.version, locator, &version.commit))
}

/// Encodes the document written at the end of a launch.
pub fn render_document(result: &TestResult, attest: bool) -> Result<Vec<u8>> {
    let mut data = if attest {
        let statement = Statement::for_result(result.clone()).ok_or(LaunchError::MissingSubject)?;
        serde_json::to_vec_pretty(&statement).context(LaunchError::Serialize)?
    } else {
        serde_json::to_vec_pretty(result).context(LaunchError::Serialize)?
    };
    data.push(b'\n');
    Ok(data)
}

/// Runs a launch pack and writes the provenance-bearing result.
pub struct Launcher {
    backend: Box<dyn LauncherBackend>,
    pub options: LaunchOptions,
    stage: LaunchStage,
}

impl Launcher {
    pub fn new(options: LaunchOptions) -> Self {
        Self { backend: Box::new(GitBackend), options, stage: LaunchStage::Init }
    }

    pub fn with_backend(mut self, backend: impl LauncherBackend + 'static) -> Self {
        self.backend = Box::new(backend);
        self
    }

    pub fn stage(&self) -> LaunchStage {
        self.stage
    }

    fn enter(&mut self, stage: LaunchStage) {
        debug!(from = ?self.stage, to = ?stage, "launch stage");
        self.stage = stage;
    }

    /// Runs the tests of `pack` and writes the result. Failing tests are a
    /// valid outcome; only errors abort, and nothing is written then.
    pub fn test(&mut self, ctx: &RunContext, pack: &LaunchPack) -> Result<TestResult> {
        self.stage = LaunchStage::Init;
        match self.run_stages(ctx, pack) {
            Ok(result) => {
                self.enter(LaunchStage::Done);
                Ok(result)
            }
            Err(e) => {
                self.enter(LaunchStage::Failed);
                Err(e)
            }
        }
    }

    fn run_stages(&mut self, ctx: &RunContext, pack: &LaunchPack) -> Result<TestResult> {
        self.enter(LaunchStage::Provenance);
        let mut seed = self.init_provenance(ctx)?;
        if let Some(url) = &self.options.result_url {
            seed.get_or_insert_with(TestResult::default).url = Some(url.clone());
        }

        checkpoint(ctx)?;
        self.enter(LaunchStage::Running);
        let run = pack.runner.run(ctx).context(LaunchError::Execution)?;
        if !run.succeeded {
            debug!(ecosystem = %pack.ecosystem, "test command exited unsuccessfully");
        }

        self.enter(LaunchStage::Parsing);
        let result = pack
            .parser
            .parse_results(ctx, seed, &run.output)
            .context(LaunchError::Parse)?;
        info!(
            ecosystem = %pack.ecosystem,
            result = ?result.result,
            passed = result.passed_tests.len(),
            failed = result.failed_tests.len(),
            "tests finished"
        );

        checkpoint(ctx)?;
        self.enter(LaunchStage::Serializing);
        let document = render_document(&result, self.options.attest)?;

        let writer = self.options.writer.as_mut().ok_or(LaunchError::NoWriter)?;
        writer.write_all(&document).context(LaunchError::Write)?;
        writer.flush().context(LaunchError::Write)?;
        Ok(result)
    }

    fn init_provenance(&self, ctx: &RunContext) -> Result<Option<TestResult>> {
        match self.backend.init_result(ctx, &self.options.work_dir) {
            Ok(seed) => Ok(seed),
            Err(e) if !self.options.provenance_required => {
                warn!("continuing without provenance: {e:#}");
                Ok(None)
            }
            Err(e) => Err(e.context(LaunchError::Provenance)),
        }
    }
}

fn checkpoint(ctx: &RunContext) -> Result<()> {
    if ctx.is_cancelled() {
        return Err(LaunchError::Cancelled.into());
    }
    Ok(())
}
