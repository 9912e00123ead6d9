//! Git Operations
//!
//! Shells out to the `git` binary. Every invocation is bounded by a timeout
//! and never prompts for credentials.

use super::{CommitAuthor, VersionControl};
use async_trait::async_trait;
use regex::Regex;
use std::path::Path;
use std::process::Stdio;
use std::sync::OnceLock;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info};

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum GitError {
    #[error("`{command}` failed: {stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error("No changes to commit")]
    NothingToCommit,

    #[error("`{command}` timed out after {seconds}s")]
    Timeout { command: String, seconds: u64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<GitError> for pagesmith_foundation::Error {
    fn from(err: GitError) -> Self {
        match err {
            GitError::NothingToCommit => pagesmith_foundation::Error::NothingToCommit,
            other => pagesmith_foundation::Error::VersionControl(other.to_string()),
        }
    }
}

fn credentials_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"://[^/@\s]+@").expect("valid credentials pattern"))
}

/// Replace userinfo in any URL inside `text` with `***`
pub fn redact_url_credentials(text: &str) -> String {
    credentials_pattern()
        .replace_all(text, "://***@")
        .into_owned()
}

// ============================================================================
// Git CLI
// ============================================================================

/// [`VersionControl`] backed by the git command line
#[derive(Debug, Clone)]
pub struct GitCli {
    timeout: Duration,
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new(Duration::from_secs(120))
    }
}

impl GitCli {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Run a git command in `dir` and return trimmed stdout
    async fn run_git(&self, dir: &Path, args: &[&str]) -> Result<String, GitError> {
        let command = redact_url_credentials(&format!("git {}", args.join(" ")));
        debug!("Running {} in {}", command, dir.display());

        let child = Command::new("git")
            .args(args)
            .current_dir(dir)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| GitError::Timeout {
                command: command.clone(),
                seconds: self.timeout.as_secs(),
            })??;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(GitError::CommandFailed {
                command,
                stderr: redact_url_credentials(stderr.trim()),
            })
        }
    }

    /// Whether `dir` holds its own repository
    ///
    /// A `.git` that is not a directory is refused rather than followed.
    async fn is_repo(&self, dir: &Path) -> Result<bool, GitError> {
        match tokio::fs::symlink_metadata(dir.join(".git")).await {
            Ok(meta) if meta.is_dir() => Ok(true),
            Ok(_) => Err(GitError::Io(std::io::Error::other(format!(
                "{} is not a directory",
                dir.join(".git").display()
            )))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl VersionControl for GitCli {
    async fn init(&self, dir: &Path, branch: &str, author: &CommitAuthor) -> Result<(), GitError> {
        if !self.is_repo(dir).await? {
            self.run_git(dir, &["init", "--quiet"]).await?;
            let head_ref = format!("refs/heads/{}", branch);
            self.run_git(dir, &["symbolic-ref", "HEAD", &head_ref]).await?;
            info!("Initialized repository at {}", dir.display());
        }

        self.run_git(dir, &["config", "user.name", &author.name]).await?;
        self.run_git(dir, &["config", "user.email", &author.email]).await?;
        self.run_git(dir, &["config", "commit.gpgsign", "false"]).await?;
        Ok(())
    }

    async fn stage_all(&self, dir: &Path) -> Result<(), GitError> {
        self.run_git(dir, &["add", "-A"]).await?;
        Ok(())
    }

    async fn commit(&self, dir: &Path, message: &str) -> Result<String, GitError> {
        let staged = self.run_git(dir, &["status", "--porcelain"]).await?;
        if staged.is_empty() {
            return Err(GitError::NothingToCommit);
        }

        self.run_git(dir, &["commit", "--quiet", "-m", message]).await?;
        let hash = self.run_git(dir, &["rev-parse", "HEAD"]).await?;

        info!("Created commit: {}", hash);
        Ok(hash)
    }

    async fn head(&self, dir: &Path) -> Result<Option<String>, GitError> {
        if !self.is_repo(dir).await? {
            return Ok(None);
        }
        match self.run_git(dir, &["rev-parse", "--verify", "--quiet", "HEAD"]).await {
            Ok(hash) if !hash.is_empty() => Ok(Some(hash)),
            Ok(_) | Err(GitError::CommandFailed { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn push(&self, dir: &Path, remote_url: &str, branch: &str) -> Result<(), GitError> {
        if self.run_git(dir, &["remote", "get-url", "origin"]).await.is_ok() {
            self.run_git(dir, &["remote", "set-url", "origin", remote_url])
                .await?;
        } else {
            self.run_git(dir, &["remote", "add", "origin", remote_url])
                .await?;
        }

        self.run_git(dir, &["branch", "-M", branch]).await?;
        self.run_git(dir, &["push", "--quiet", "-u", "origin", branch])
            .await?;
        info!("Pushed {} to {}", branch, redact_url_credentials(remote_url));
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
