use std::path::Path;

use proctor_core::ProvenanceError;
use url::Url;

use crate::types::{HeadDetails, Remotes};

/// Remotes tried, in order, before falling back to any other remote.
pub const PREFERRED_REMOTES: [&str; 2] = ["upstream", "origin"];

/// SSH hosts whose `.git` suffix is dropped from the locator.
const COMPACT_SSH_HOSTS: &[&str] = &["github.com"];

/// Returns the URL of the remote the locator is built from.
pub fn pick_remote_url(remotes: &Remotes) -> Option<&str> {
    PREFERRED_REMOTES
        .iter()
        .find_map(|name| remotes.get(*name))
        .or_else(|| remotes.values().next())
        .map(String::as_str)
}

/// Normalizes a remote URL so SSH and HTTPS clones of the same project
/// produce comparable locators.
pub fn normalize_remote_url(raw: &str) -> Result<Url, ProvenanceError> {
    let raw = raw.trim();
    let candidate = if is_scp_like(raw) {
        scp_to_ssh(raw)
    } else if Path::new(raw).is_absolute() {
        return Url::from_file_path(raw).map_err(|_| ProvenanceError::Locator {
            url: raw.to_string(),
            reason: "path cannot be expressed as a file URL".into(),
        });
    } else {
        raw.to_string()
    };

    Url::parse(&candidate)
        .map_err(|e| ProvenanceError::Locator { url: raw.to_string(), reason: e.to_string() })
}

/// Builds `git+<url>@<commit>` for HEAD from the preferred remote. A
/// repository without remotes still gets a locator, `git+@<commit>`.
pub fn make_vcs_locator(head: &HeadDetails, remotes: &Remotes) -> Result<String, ProvenanceError> {
    let Some(raw) = pick_remote_url(remotes) else {
        return Ok(format!("git+@{}", head.commit_sha));
    };
    let url = normalize_remote_url(raw)?;
    Ok(format!("git+{}@{}", url.as_str(), head.commit_sha))
}

// user@host:path, which git accepts as shorthand for ssh://user@host/path.
fn is_scp_like(raw: &str) -> bool {
    raw.contains('@') && !raw.contains("://")
}

fn scp_to_ssh(raw: &str) -> String {
    let (_, rest) = raw.split_once('@').unwrap_or(("", raw));
    let mut rest = rest.replacen(':', "/", 1);
    let host = rest.split('/').next().unwrap_or_default();
    if COMPACT_SSH_HOSTS.contains(&host) {
        if let Some(stripped) = rest.strip_suffix(".git") {
            rest = stripped.to_string();
        }
    }
    format!("ssh://{rest}")
}
