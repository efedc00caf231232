use std::path::PathBuf;

use thiserror::Error;

/// Failures while resolving where and at which revision a codebase lives.
#[derive(Debug, Error)]
pub enum ProvenanceError {
    #[error("not a git repository root: {path}: {reason}")]
    Repository { path: PathBuf, reason: String },
    #[error("reading HEAD: {0}")]
    Head(String),
    #[error("resolving tag {tag:?}: {reason}")]
    Tag { tag: String, reason: String },
    #[error("tag {tag:?} not found in history")]
    HistoryMismatch { tag: String },
    #[error("building VCS locator from {url:?}: {reason}")]
    Locator { url: String, reason: String },
    #[error("git {command} failed: {stderr}")]
    Git { command: String, stderr: String },
}

/// Fatal outcomes of a launch.
///
/// The unit variants are attached as context on top of the underlying
/// error, so `downcast_ref::<LaunchError>()` finds them on the chain.
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("initializing provenance")]
    Provenance,
    #[error("runner error")]
    Execution,
    #[error("parsing results")]
    Parse,
    #[error("cannot attest: no repository data found")]
    MissingSubject,
    #[error("tests ran but no writer was configured")]
    NoWriter,
    #[error("launch cancelled")]
    Cancelled,
    #[error("unable to detect the language ecosystem in {}", .0.display())]
    UnsupportedEcosystem(PathBuf),
    #[error("launch pack incomplete: {}", .0.join("; "))]
    IncompletePack(Vec<String>),
    #[error("serializing output")]
    Serialize,
    #[error("writing output")]
    Write,
}
