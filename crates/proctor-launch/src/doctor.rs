use anyhow::{anyhow, Context, Result};
use std::path::Path;

use proctor_core::LaunchError;
use proctor_vcs_git::{is_git_worktree, GitRepo};

use crate::config::{LaunchConfig, RunnerKind};
use crate::pack::detect_ecosystem;
use crate::util::probe_tool;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DoctorCheck {
    pub name: &'static str,
    pub detail: String,
}

/// Preflight for `proctor run`: everything a launch in `work_dir` needs.
/// Stops at the first failed check.
pub fn doctor(work_dir: &Path, cfg: &LaunchConfig) -> Result<Vec<DoctorCheck>> {
    let mut checks = Vec::new();

    if !work_dir.is_dir() {
        return Err(anyhow!("working directory does not exist: {}", work_dir.display()));
    }
    checks.push(DoctorCheck { name: "work_dir", detail: work_dir.display().to_string() });

    if is_git_worktree(work_dir) {
        let version = probe_tool(work_dir, "git", &["--version"])?;
        checks.push(DoctorCheck { name: "git", detail: version });

        let repo = GitRepo::open(work_dir)?;
        let head = repo.head_hash()?;
        checks.push(DoctorCheck { name: "repository", detail: format!("HEAD at {head}") });
    } else if cfg.provenance.required && cfg.output.attest {
        // Attesting needs a subject, which only a repository provides.
        return Err(LaunchError::MissingSubject).context("no .git found in work dir");
    }

    let (ecosystem, program, probe_args): (String, String, Vec<&str>) = match cfg.runner.kind {
        RunnerKind::Command => {
            let command = cfg.runner.command.clone().unwrap_or_default();
            (format!("command:{command}"), command, vec!["--version"])
        }
        RunnerKind::Go => ("go".into(), "go".into(), vec!["version"]),
        RunnerKind::Auto => match detect_ecosystem(work_dir) {
            Some(name) => (name.into(), name.into(), vec!["version"]),
            None => return Err(LaunchError::UnsupportedEcosystem(work_dir.to_path_buf()).into()),
        },
    };
    checks.push(DoctorCheck { name: "ecosystem", detail: ecosystem });

    let tool = probe_tool(work_dir, &program, &probe_args)?;
    checks.push(DoctorCheck { name: "runner", detail: tool });
    Ok(checks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proctor_vcs::fixture::init_git_repo;
    use tempfile::tempdir;

    #[test]
    fn undetectable_ecosystem_fails() {
        let dir = tempdir().unwrap();
        init_git_repo(dir.path()).unwrap();
        let err = doctor(dir.path(), &LaunchConfig::default()).unwrap_err();
        assert!(matches!(err.downcast_ref::<LaunchError>(), Some(LaunchError::UnsupportedEcosystem(_))));
    }

    #[test]
    fn attesting_outside_a_repository_fails() {
        let dir = tempdir().unwrap();
        let err = doctor(dir.path(), &LaunchConfig::default()).unwrap_err();
        assert!(matches!(err.downcast_ref::<LaunchError>(), Some(LaunchError::MissingSubject)));
    }

    #[cfg(unix)]
    #[test]
    fn command_runner_is_probed() {
        let dir = tempdir().unwrap();
        init_git_repo(dir.path()).unwrap();
        let mut cfg = LaunchConfig::default();
        cfg.runner.kind = RunnerKind::Command;
        cfg.runner.command = Some("true".into());

        let checks = doctor(dir.path(), &cfg).unwrap();
        let names: Vec<_> = checks.iter().map(|c| c.name).collect();
        assert_eq!(names, ["work_dir", "git", "repository", "ecosystem", "runner"]);
        assert!(checks[1].detail.starts_with("git version"));

        cfg.runner.command = Some("proctor-no-such-tool".into());
        assert!(doctor(dir.path(), &cfg).is_err());
    }
}
