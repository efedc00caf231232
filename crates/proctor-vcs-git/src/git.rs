use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::{Context, Result};
use proctor_core::ProvenanceError;
use proctor_vcs::{
    make_vcs_locator, select_latest_tag, synthesize_version, HeadDetails, ProvenanceSource, Remotes,
    RepoVersion, TagRef,
};
use tracing::debug;

/// Presence check used before attempting any provenance work.
pub fn is_git_worktree(path: &Path) -> bool {
    path.join(".git").exists()
}

/// Read-only access to a git working copy through the `git` executable.
#[derive(Clone, Debug)]
pub struct GitRepo {
    root: PathBuf,
}

impl GitRepo {
    /// Opens the repository whose top level is `path`. A subdirectory of a
    /// working copy is rejected.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let not_a_root = |reason: String| ProvenanceError::Repository { path: path.to_path_buf(), reason };

        if !path.is_dir() {
            return Err(not_a_root("directory does not exist".into()).into());
        }
        let out = Command::new("git")
            .args(["rev-parse", "--show-toplevel"])
            .current_dir(path)
            .output()
            .map_err(|e| not_a_root(format!("running git: {e}")))?;
        if !out.status.success() {
            return Err(not_a_root(String::from_utf8_lossy(&out.stderr).trim().to_string()).into());
        }

        let top = PathBuf::from(String::from_utf8_lossy(&out.stdout).trim());
        let top = top.canonicalize().with_context(|| format!("canonicalize {}", top.display()))?;
        let root = path.canonicalize().with_context(|| format!("canonicalize {}", path.display()))?;
        if top != root {
            return Err(not_a_root(format!("path is inside the repository at {}", top.display())).into());
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn run(&self, args: &[&str]) -> Result<String> {
        debug!(repo = %self.root.display(), ?args, "git");
        let git_failed = |stderr: String| ProvenanceError::Git { command: args.join(" "), stderr };
        let out = Command::new("git")
            .args(args)
            .current_dir(&self.root)
            .output()
            .map_err(|e| git_failed(e.to_string()))?;
        if !out.status.success() {
            return Err(git_failed(String::from_utf8_lossy(&out.stderr).trim().to_string()).into());
        }
        Ok(String::from_utf8_lossy(&out.stdout).trim().to_string())
    }

    pub fn head_hash(&self) -> Result<String> {
        let hash = self
            .run(&["rev-parse", "--verify", "HEAD"])
            .map_err(|e| ProvenanceError::Head(format!("{e:#}")))?;
        if !is_commit_hash(&hash) {
            return Err(ProvenanceError::Head(format!("unexpected hash {hash:?}")).into());
        }
        Ok(hash)
    }

    /// Tags in ref-name order, each peeled to its commit.
    pub fn tags(&self) -> Result<Vec<TagRef>> {
        let refs = self.run(&["for-each-ref", "--format=%(refname)", "refs/tags"])?;
        refs.lines()
            .filter(|l| !l.is_empty())
            .map(|refname| self.peel_tag(refname))
            .collect()
    }

    fn peel_tag(&self, refname: &str) -> Result<TagRef> {
        let name = refname.strip_prefix("refs/tags/").unwrap_or(refname).to_string();
        let tag_failed = |reason: String| ProvenanceError::Tag { tag: name.clone(), reason };

        let rev = format!("{refname}^{{commit}}");
        let line = self
            .run(&["log", "-1", "--format=%H %ct", &rev])
            .map_err(|e| tag_failed(format!("{e:#}")))?;
        let (commit, ts) = line
            .split_once(' ')
            .ok_or_else(|| tag_failed(format!("unexpected log output {line:?}")))?;
        let committed_at = ts
            .parse::<i64>()
            .map_err(|e| tag_failed(format!("bad commit time {ts:?}: {e}")))?;
        Ok(TagRef { name, commit: commit.to_string(), committed_at })
    }

    /// The tag whose commit carries the latest committer time.
    pub fn latest_tag(&self) -> Result<Option<TagRef>> {
        Ok(select_latest_tag(self.tags()?))
    }

    /// Counts commits visited from HEAD before reaching the commit `tag`
    /// points at. The first-parent chain is walked first; the rest of the
    /// reachable history only when the tag is not on that chain.
    pub fn commits_from_tag(&self, tag: &str) -> Result<usize> {
        let rev = format!("refs/tags/{tag}^{{commit}}");
        let tag_commit = self
            .run(&["rev-parse", "--verify", &rev])
            .map_err(|e| ProvenanceError::Tag { tag: tag.to_string(), reason: format!("{e:#}") })?;
        let head = self.head_hash()?;

        if let Some(distance) = self.find_in_rev_list(&["--first-parent", &head], &tag_commit)? {
            return Ok(distance);
        }
        debug!(tag, "tag is not on the first-parent chain, walking merged history");
        self.find_in_rev_list(&[&head], &tag_commit)?
            .ok_or_else(|| ProvenanceError::HistoryMismatch { tag: tag.to_string() }.into())
    }

    /// Position of `target` in `git rev-list <args>`, reading only as far as
    /// needed. A rev-list that fails before `target` shows up is a git error.
    fn find_in_rev_list(&self, args: &[&str], target: &str) -> Result<Option<usize>> {
        debug!(repo = %self.root.display(), ?args, "git rev-list");
        let git_failed =
            |stderr: String| ProvenanceError::Git { command: format!("rev-list {}", args.join(" ")), stderr };
        let mut child = Command::new("git")
            .arg("rev-list")
            .args(args)
            .current_dir(&self.root)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| git_failed(e.to_string()))?;
        let stdout = child.stdout.take().context("rev-list stdout")?;

        let mut found = None;
        for (i, line) in BufReader::new(stdout).lines().enumerate() {
            if line.context("reading rev-list output")?.trim() == target {
                found = Some(i);
                break;
            }
        }
        if found.is_some() {
            // The rest of the history is not needed.
            let _ = child.kill();
            let _ = child.wait();
            return Ok(found);
        }

        let mut stderr = String::new();
        if let Some(mut pipe) = child.stderr.take() {
            pipe.read_to_string(&mut stderr).context("reading rev-list stderr")?;
        }
        let status = child.wait().context("waiting for rev-list")?;
        if !status.success() {
            return Err(git_failed(stderr.trim().to_string()).into());
        }
        Ok(None)
    }

    /// Computes the version of HEAD from the latest tag and the distance to it.
    pub fn repo_version(&self) -> Result<RepoVersion> {
        let commit = self.head_hash().context("reading head hash")?;
        let Some(latest) = self.latest_tag().context("reading latest tag")? else {
            return Ok(RepoVersion { version: String::new(), commit });
        };
        let distance = self
            .commits_from_tag(&latest.name)
            .context("finding commits from tag")?;
        debug!(tag = %latest.name, distance, "resolved latest tag");
        Ok(RepoVersion { version: synthesize_version(&latest.name, distance, &commit), commit })
    }

    pub fn remotes(&self) -> Result<Remotes> {
        let out = self.run(&["remote", "-v"]).context("running git to get remotes")?;
        Ok(parse_remotes(&out))
    }

    pub fn head_details(&self) -> Result<HeadDetails> {
        let commit_sha = self.head_hash()?;
        let tags = self.run(&["tag", "--points-at", "HEAD"])?;
        let tag = tags.lines().next().unwrap_or_default().to_string();
        Ok(HeadDetails { commit_sha, tag })
    }

    pub fn vcs_locator(&self) -> Result<String> {
        let head = self.head_details().context("getting head details")?;
        let remotes = self.remotes().context("reading remotes")?;
        Ok(make_vcs_locator(&head, &remotes)?)
    }
}

impl ProvenanceSource for GitRepo {
    fn repo_version(&self) -> Result<RepoVersion> {
        GitRepo::repo_version(self)
    }

    fn vcs_locator(&self) -> Result<String> {
        GitRepo::vcs_locator(self)
    }
}

/// Parses `git remote -v` output into name → URL.
pub fn parse_remotes(output: &str) -> Remotes {
    let mut remotes = Remotes::new();
    for line in output.lines() {
        let mut fields = line.split_whitespace();
        if let (Some(name), Some(url)) = (fields.next(), fields.next()) {
            remotes.insert(name.to_string(), url.to_string());
        }
    }
    remotes
}

fn is_commit_hash(s: &str) -> bool {
    s.len() == 40 && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}
