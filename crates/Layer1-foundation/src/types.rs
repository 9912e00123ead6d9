//! Request and result types shared across layers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Scheme prefix of inline-data attachment URLs
pub const DATA_URL_PREFIX: &str = "data:";

// ============================================================================
// Inbound
// ============================================================================

/// A file shipped with a task request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// Filename inside the workspace
    pub name: String,

    /// Inline `data:` URL or a remote URL (remote URLs are ignored)
    pub url: String,
}

impl Attachment {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }

    /// Whether the payload is embedded in the URL
    pub fn is_inline(&self) -> bool {
        self.url.starts_with(DATA_URL_PREFIX)
    }
}

/// A request to generate and publish one web app
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRequest {
    pub email: String,
    pub secret: String,
    /// Task name, also used as the repository name
    pub task: String,
    pub round: u32,
    /// Opaque value echoed back in the completion record
    pub nonce: String,
    pub brief: String,
    #[serde(default)]
    pub checks: Vec<String>,
    #[serde(alias = "callback_url")]
    pub evaluation_url: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

impl fmt::Debug for TaskRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskRequest")
            .field("email", &self.email)
            .field("secret", &"***")
            .field("task", &self.task)
            .field("round", &self.round)
            .field("nonce", &self.nonce)
            .field("brief", &self.brief)
            .field("checks", &self.checks)
            .field("evaluation_url", &self.evaluation_url)
            .field("attachments", &self.attachments.len())
            .finish()
    }
}

// ============================================================================
// Outbound
// ============================================================================

/// Outcome of a successful publish run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishResult {
    pub task: String,
    pub repo_url: String,
    /// Full hash of the published commit
    pub commit_sha: String,
    pub pages_url: String,
    pub published_at: DateTime<Utc>,
}

/// Body posted to the caller's callback URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionRecord {
    pub email: String,
    pub task: String,
    pub round: u32,
    pub nonce: String,
    pub repo_url: String,
    pub commit_sha: String,
    pub pages_url: String,
}

impl CompletionRecord {
    pub fn new(request: &TaskRequest, result: &PublishResult) -> Self {
        Self {
            email: request.email.clone(),
            task: request.task.clone(),
            round: request.round,
            nonce: request.nonce.clone(),
            repo_url: result.repo_url.clone(),
            commit_sha: result.commit_sha.clone(),
            pages_url: result.pages_url.clone(),
        }
    }
}

/// Response body of `POST /api`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskResponse {
    pub status: String,
    pub pages_url: String,
}

impl TaskResponse {
    pub fn done(pages_url: impl Into<String>) -> Self {
        Self {
            status: "done".to_string(),
            pages_url: pages_url.into(),
        }
    }
}
