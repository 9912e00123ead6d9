//! Git Integration Module
//!
//! The pipeline talks to version control through [`VersionControl`]; the
//! default implementation is [`GitCli`].

pub mod ops;

pub use ops::{redact_url_credentials, GitCli, GitError};

use async_trait::async_trait;
use std::path::Path;

/// Identity recorded on commits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitAuthor {
    pub name: String,
    pub email: String,
}

impl CommitAuthor {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }
}

/// Local repository operations used by a publish run
#[async_trait]
pub trait VersionControl: Send + Sync {
    /// Make `dir` a repository on `branch` (no-op for an existing one) and
    /// configure the commit identity
    async fn init(&self, dir: &Path, branch: &str, author: &CommitAuthor) -> Result<(), GitError>;

    /// Stage every change in the working tree
    async fn stage_all(&self, dir: &Path) -> Result<(), GitError>;

    /// Commit staged changes and return the full hash
    ///
    /// Fails with [`GitError::NothingToCommit`] when nothing is staged.
    async fn commit(&self, dir: &Path, message: &str) -> Result<String, GitError>;

    /// Current HEAD hash, `None` before the first commit
    async fn head(&self, dir: &Path) -> Result<Option<String>, GitError>;

    /// Point `origin` at `remote_url` and push `branch` with upstream tracking
    async fn push(&self, dir: &Path, remote_url: &str, branch: &str) -> Result<(), GitError>;
}
