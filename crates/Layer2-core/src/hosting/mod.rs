//! Source hosting platform
//!
//! Remote repository creation and static-site enablement. [`GitHubClient`]
//! talks to the GitHub REST API.

pub mod github;

pub use github::{classify_pages_setup, classify_repo_creation, GitHubClient};

use async_trait::async_trait;
use pagesmith_foundation::Result;

/// Outcome of a create-repository call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepoStatus {
    Created,
    AlreadyExists,
}

/// Outcome of an enable-pages call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagesStatus {
    Enabled,
    AlreadyEnabled,
}

/// Hosting platform operations used by a publish run
#[async_trait]
pub trait HostingApi: Send + Sync {
    /// Create a public repository; an existing one is not an error
    async fn create_repository(&self, name: &str) -> Result<RepoStatus>;

    /// Serve `branch` at the site root; already-enabled is not an error
    async fn enable_pages(&self, name: &str, branch: &str) -> Result<PagesStatus>;

    /// Authenticated push URL. Contains credentials; never log it unredacted.
    fn push_url(&self, name: &str) -> String;

    /// Browser URL of the repository
    fn repo_url(&self, name: &str) -> String;

    /// Public URL of the published site
    fn pages_url(&self, name: &str) -> String;
}

/// First part of a response body, for error messages
pub(crate) fn body_snippet(body: &str) -> String {
    const MAX_CHARS: usize = 300;
    let trimmed = body.trim();
    if trimmed.chars().count() <= MAX_CHARS {
        trimmed.to_string()
    } else {
        let cut: String = trimmed.chars().take(MAX_CHARS).collect();
        format!("{}...", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_snippet() {
        assert_eq!(body_snippet("  short \n"), "short");
        let long = "x".repeat(400);
        let snippet = body_snippet(&long);
        assert_eq!(snippet.len(), 303);
        assert!(snippet.ends_with("..."));
    }
}
