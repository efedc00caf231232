use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::Command;

use anyhow::{anyhow, Context, Result};
use proctor_core::{RunContext, RunOutput, TestRunner};
use tracing::debug;

#[derive(Clone, Debug, Default)]
pub struct ShellOptions {
    /// Runs in the current directory when unset.
    pub work_dir: Option<PathBuf>,
    pub command: String,
    pub args: Vec<String>,
    /// Added on top of the inherited environment.
    pub env: BTreeMap<String, String>,
}

/// Runs one external command and captures what it printed.
///
/// The exit status is reported, never interpreted: a non-zero exit is a
/// successful run with `succeeded == false`.
#[derive(Clone, Debug)]
pub struct ShellRunner {
    pub options: ShellOptions,
}

impl ShellRunner {
    pub fn new(command: impl Into<String>) -> Self {
        Self { options: ShellOptions { command: command.into(), ..ShellOptions::default() } }
    }

    pub fn with_work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.options.work_dir = Some(dir.into());
        self
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_env(mut self, env: BTreeMap<String, String>) -> Self {
        self.options.env = env;
        self
    }

    /// Runs the command, returning stdout followed by stderr.
    pub fn execute(&self) -> Result<RunOutput> {
        let opts = &self.options;
        if opts.command.trim().is_empty() {
            return Err(anyhow!("no command configured"));
        }

        let mut cmd = Command::new(&opts.command);
        cmd.args(&opts.args).envs(&opts.env);
        if let Some(dir) = &opts.work_dir {
            cmd.current_dir(dir);
        }
        debug!(command = %opts.command, args = ?opts.args, dir = ?opts.work_dir, "spawning");

        let out = cmd
            .output()
            .with_context(|| format!("shelling out to {} {:?}", opts.command, opts.args))?;

        let mut output = out.stdout;
        output.extend_from_slice(&out.stderr);
        debug!(status = %out.status, bytes = output.len(), "command finished");
        Ok(RunOutput { output, succeeded: out.status.success() })
    }
}

impl TestRunner for ShellRunner {
    fn run(&self, _ctx: &RunContext) -> Result<RunOutput> {
        self.execute()
    }
}
