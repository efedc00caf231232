use std::collections::HashMap;

use anyhow::Result;

/// Remote name to raw URL, as configured in the repository.
pub type Remotes = HashMap<String, String>;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HeadDetails {
    pub commit_sha: String,
    /// Tag pointing at HEAD, empty when HEAD is untagged.
    pub tag: String,
}

/// A tag peeled to the commit it points at.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TagRef {
    pub name: String,
    pub commit: String,
    /// Committer timestamp of `commit`, unix seconds.
    pub committed_at: i64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RepoVersion {
    /// Latest tag, possibly extended with the distance from it. Empty when the
    /// repository has no tags.
    pub version: String,
    pub commit: String,
}

/// Where provenance for a launch comes from.
pub trait ProvenanceSource: Send + Sync {
    fn repo_version(&self) -> Result<RepoVersion>;

    fn vcs_locator(&self) -> Result<String>;
}
