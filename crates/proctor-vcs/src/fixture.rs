use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{anyhow, Context, Result};

/// Committer time of the first fixture commit; each later commit is one
/// minute newer so tag ordering is deterministic.
pub const FIXTURE_EPOCH: i64 = 1_700_000_000;

/// A throwaway git repository for tests, with pinned commit dates.
#[derive(Debug)]
pub struct FixtureRepo {
    pub dir: PathBuf,
    clock: i64,
    commits: usize,
}

/// Initialize a git repo fixture with one commit.
pub fn init_git_repo(dir: &Path) -> Result<FixtureRepo> {
    let mut repo = FixtureRepo { dir: dir.to_path_buf(), clock: FIXTURE_EPOCH, commits: 0 };
    repo.git(&["init", "-q"])?;
    repo.git(&["config", "user.email", "proctor@example.com"])?;
    repo.git(&["config", "user.name", "proctor"])?;
    repo.git(&["config", "commit.gpgsign", "false"])?;
    repo.git(&["config", "tag.gpgsign", "false"])?;
    repo.commit("init")?;
    Ok(repo)
}

impl FixtureRepo {
    /// Writes a new file and commits it. Returns the new HEAD hash.
    pub fn commit(&mut self, message: &str) -> Result<String> {
        self.commits += 1;
        self.clock += 60;
        std::fs::write(self.dir.join(format!("file-{}.txt", self.commits)), message)?;
        self.git(&["add", "."])?;
        self.git(&["commit", "-q", "-m", message])?;
        self.head()
    }

    /// Lightweight tag on HEAD.
    pub fn tag(&self, name: &str) -> Result<()> {
        self.git(&["tag", name]).map(drop)
    }

    /// Annotated tag on HEAD.
    pub fn annotated_tag(&self, name: &str, message: &str) -> Result<()> {
        self.git(&["tag", "-a", name, "-m", message]).map(drop)
    }

    pub fn add_remote(&self, name: &str, url: &str) -> Result<()> {
        self.git(&["remote", "add", name, url]).map(drop)
    }

    /// Creates `branch` at `start` and checks it out.
    pub fn branch_from(&self, branch: &str, start: &str) -> Result<()> {
        self.git(&["checkout", "-q", "-b", branch, start]).map(drop)
    }

    pub fn checkout(&self, rev: &str) -> Result<()> {
        self.git(&["checkout", "-q", rev]).map(drop)
    }

    /// Merges `branch` into the checked out branch with a merge commit.
    /// Returns the merge commit hash.
    pub fn merge(&mut self, branch: &str) -> Result<String> {
        self.clock += 60;
        let message = format!("merge {branch}");
        self.git(&["merge", "-q", "--no-ff", "-m", &message, branch])?;
        self.head()
    }

    pub fn head(&self) -> Result<String> {
        self.git(&["rev-parse", "HEAD"])
    }

    pub fn git(&self, args: &[&str]) -> Result<String> {
        let date = format!("{} +0000", self.clock);
        let out = Command::new("git")
            .args(args)
            .current_dir(&self.dir)
            .env("GIT_AUTHOR_DATE", &date)
            .env("GIT_COMMITTER_DATE", &date)
            .env("GIT_CONFIG_NOSYSTEM", "1")
            .output()
            .with_context(|| format!("run git {:?}", args))?;
        if !out.status.success() {
            return Err(anyhow!(
                "command failed: git {:?}\nstdout:{}\nstderr:{}",
                args,
                String::from_utf8_lossy(&out.stdout),
                String::from_utf8_lossy(&out.stderr)
            ));
        }
        Ok(String::from_utf8_lossy(&out.stdout).trim().to_string())
    }
}
