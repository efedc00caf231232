use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

/// Files looked up in the work dir when no config path is given.
pub const CONFIG_FILE_NAMES: [&str; 2] = [".proctor.toml", ".proctor.yaml"];

pub const DEFAULT_OUTPUT_PATH: &str = "tests.intoto.json";

/// Output path meaning standard output.
pub const STDOUT_PATH: &str = "-";

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaunchConfig {
    pub output: OutputConfig,
    pub provenance: ProvenanceConfig,
    pub runner: RunnerConfig,
    pub result: ResultConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub path: String,
    /// Write the full in-toto statement instead of the bare predicate.
    pub attest: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { path: DEFAULT_OUTPUT_PATH.to_string(), attest: true }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvenanceConfig {
    /// When false a repository that cannot be described only logs a warning.
    pub required: bool,
}

impl Default for ProvenanceConfig {
    fn default() -> Self {
        Self { required: true }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    pub kind: RunnerKind,
    /// Executable for `kind = "command"`.
    pub command: Option<String>,
    /// Appended to the Go invocation, or the full argument list of a command.
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunnerKind {
    #[default]
    Auto,
    Go,
    Command,
}

impl FromStr for RunnerKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "auto" | "" => Ok(RunnerKind::Auto),
            "go" | "golang" => Ok(RunnerKind::Go),
            "command" => Ok(RunnerKind::Command),
            other => Err(anyhow!("unknown runner kind: {other} (expected auto, go or command)")),
        }
    }
}

impl fmt::Display for RunnerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunnerKind::Auto => "auto",
            RunnerKind::Go => "go",
            RunnerKind::Command => "command",
        };
        f.write_str(s)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResultConfig {
    /// Link to the CI run, recorded as the result `url`.
    pub url: Option<String>,
}

impl LaunchConfig {
    /// Reads TOML for `.toml` files and YAML for anything else.
    pub fn load_from(path: &Path) -> Result<Self> {
        let s = std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        let cfg = if path.extension().is_some_and(|ext| ext == "toml") {
            toml::from_str(&s).with_context(|| format!("parse {}", path.display()))?
        } else {
            serde_yaml::from_str(&s).with_context(|| format!("parse {}", path.display()))?
        };
        Ok(cfg)
    }

    /// Loads the first config file found in `work_dir`, or the defaults.
    pub fn discover(work_dir: &Path) -> Result<Self> {
        match Self::find_in(work_dir) {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn find_in(work_dir: &Path) -> Option<PathBuf> {
        CONFIG_FILE_NAMES.iter().map(|name| work_dir.join(name)).find(|p| p.is_file())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let s = if path.extension().is_some_and(|ext| ext == "toml") {
            toml::to_string_pretty(self).with_context(|| "serialize toml")?
        } else {
            serde_yaml::to_string(self).with_context(|| "serialize yaml")?
        };
        std::fs::write(path, s).with_context(|| format!("write {}", path.display()))?;
        Ok(())
    }

    /// Where the document goes; `None` means standard output.
    pub fn output_path(&self) -> Option<PathBuf> {
        let raw = self.output.path.trim();
        if raw == STDOUT_PATH {
            return None;
        }
        Some(PathBuf::from(shellexpand::tilde(raw).to_string()))
    }

    pub fn validate(&self, work_dir: &Path) -> Result<()> {
        let mut errs = Vec::new();
        if !work_dir.is_dir() {
            errs.push(format!("working directory does not exist: {}", work_dir.display()));
        }
        if self.output.path.trim().is_empty() {
            errs.push("output path is required".to_string());
        }
        if self.runner.kind == RunnerKind::Command
            && self.runner.command.as_deref().map_or(true, |c| c.trim().is_empty())
        {
            errs.push("runner kind \"command\" needs runner.command".to_string());
        }
        if errs.is_empty() {
            Ok(())
        } else {
            Err(anyhow!(errs.join("; ")))
        }
    }
}
