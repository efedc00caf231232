use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;

use crate::model::TestResult;

/// Per-launch context handed to runners and parsers.
///
/// Cancellation is cooperative: a launch checks the flag between stages, a
/// running subprocess is left to finish.
#[derive(Clone, Debug, Default)]
pub struct RunContext {
    cancelled: Arc<AtomicBool>,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// What a runner captured from the test tool.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunOutput {
    pub output: Vec<u8>,
    /// `false` when the tool ran but exited non-zero (usually failing tests).
    pub succeeded: bool,
}

pub trait TestRunner: Send + Sync {
    /// Runs the suite. `Err` means the tool could not be run at all.
    fn run(&self, ctx: &RunContext) -> Result<RunOutput>;
}

pub trait ResultsParser: Send + Sync {
    /// Classifies `raw` into a result. A `seed` keeps its configuration and
    /// url; its previous pass/fail state is discarded.
    fn parse_results(&self, ctx: &RunContext, seed: Option<TestResult>, raw: &[u8]) -> Result<TestResult>;
}

impl<T: TestRunner + ?Sized> TestRunner for Box<T> {
    fn run(&self, ctx: &RunContext) -> Result<RunOutput> {
        (**self).run(ctx)
    }
}

impl<T: ResultsParser + ?Sized> ResultsParser for Box<T> {
    fn parse_results(&self, ctx: &RunContext, seed: Option<TestResult>, raw: &[u8]) -> Result<TestResult> {
        (**self).parse_results(ctx, seed, raw)
    }
}

impl<T: TestRunner + ?Sized> TestRunner for Arc<T> {
    fn run(&self, ctx: &RunContext) -> Result<RunOutput> {
        (**self).run(ctx)
    }
}

impl<T: ResultsParser + ?Sized> ResultsParser for Arc<T> {
    fn parse_results(&self, ctx: &RunContext, seed: Option<TestResult>, raw: &[u8]) -> Result<TestResult> {
        (**self).parse_results(ctx, seed, raw)
    }
}
