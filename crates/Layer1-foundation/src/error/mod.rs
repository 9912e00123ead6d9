//! Error types for Pagesmith
//!
//! Every failure a publish run can produce lives here, tagged with the
//! pipeline stage it came from so the HTTP layer can name it.

use crate::retry::{RetryClassification, RetryableError};
use std::fmt;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

// ============================================================================
// Stage
// ============================================================================

/// Pipeline stage a failure belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Startup,
    Authenticate,
    Validate,
    Workspace,
    Augment,
    Generate,
    WriteArtifacts,
    Commit,
    CreateRepository,
    Push,
    EnablePages,
    Notify,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Startup => "startup",
            Stage::Authenticate => "authentication",
            Stage::Validate => "validation",
            Stage::Workspace => "workspace preparation",
            Stage::Augment => "brief augmentation",
            Stage::Generate => "code generation",
            Stage::WriteArtifacts => "artifact writing",
            Stage::Commit => "commit",
            Stage::CreateRepository => "repository creation",
            Stage::Push => "push",
            Stage::EnablePages => "pages setup",
            Stage::Notify => "evaluation notification",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Error
// ============================================================================

/// Pagesmith error type
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Startup
    // ========================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    // ========================================================================
    // Request
    // ========================================================================
    #[error("Invalid secret")]
    Unauthorized,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    // ========================================================================
    // Local pipeline steps
    // ========================================================================
    #[error("Attachment '{name}' could not be decoded: {message}")]
    AttachmentDecode { name: String, message: String },

    #[error("Brief augmentation failed: {0}")]
    BriefAugment(String),

    #[error("Code generation failed: {0}")]
    GenerationFailed(String),

    #[error("Version control failed: {0}")]
    VersionControl(String),

    #[error("No changes to commit")]
    NothingToCommit,

    #[error("IO error during {stage}: {source}")]
    Io {
        stage: Stage,
        #[source]
        source: std::io::Error,
    },

    // ========================================================================
    // Remote steps
    // ========================================================================
    #[error("GitHub repo creation failed: {}", describe(.status, .message))]
    RepoCreationFailed { status: Option<u16>, message: String },

    #[error("Push failed: {0}")]
    PushFailed(String),

    #[error("GitHub Pages setup failed: {}", describe(.status, .message))]
    PagesSetupFailed { status: Option<u16>, message: String },

    #[error("Evaluation notification failed: {}", describe(.status, .message))]
    NotificationFailed { status: Option<u16>, message: String },
}

fn describe(status: &Option<u16>, message: &str) -> String {
    match status {
        Some(code) => format!("HTTP {}: {}", code, message),
        None => message.to_string(),
    }
}

impl Error {
    /// Stage the error belongs to
    pub fn stage(&self) -> Stage {
        match self {
            Error::Config(_) => Stage::Startup,
            Error::Unauthorized => Stage::Authenticate,
            Error::InvalidRequest(_) => Stage::Validate,
            Error::AttachmentDecode { .. } => Stage::Workspace,
            Error::BriefAugment(_) => Stage::Augment,
            Error::GenerationFailed(_) => Stage::Generate,
            Error::VersionControl(_) | Error::NothingToCommit => Stage::Commit,
            Error::Io { stage, .. } => *stage,
            Error::RepoCreationFailed { .. } => Stage::CreateRepository,
            Error::PushFailed(_) => Stage::Push,
            Error::PagesSetupFailed { .. } => Stage::EnablePages,
            Error::NotificationFailed { .. } => Stage::Notify,
        }
    }

    /// Whether the error is the caller's fault rather than a downstream failure
    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::Unauthorized | Error::InvalidRequest(_))
    }

    /// Closure for `map_err` that tags an IO error with its stage
    pub fn io(stage: Stage) -> impl FnOnce(std::io::Error) -> Self {
        move |source| Error::Io { stage, source }
    }

    /// HTTP status carried by a remote failure, if any
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Error::RepoCreationFailed { status, .. }
            | Error::PagesSetupFailed { status, .. }
            | Error::NotificationFailed { status, .. } => *status,
            _ => None,
        }
    }
}

impl RetryableError for Error {
    fn classify(&self) -> RetryClassification {
        match self {
            // No status means the request never completed (connect, timeout)
            Error::RepoCreationFailed { status, .. }
            | Error::PagesSetupFailed { status, .. }
            | Error::NotificationFailed { status, .. } => match status {
                None => RetryClassification::Retry,
                Some(429) => RetryClassification::RateLimited {
                    retry_after_ms: None,
                },
                Some(code) if *code >= 500 => RetryClassification::Retry,
                Some(_) => RetryClassification::NoRetry,
            },
            _ => RetryClassification::NoRetry,
        }
    }
}
