//! # pagesmith-foundation
//!
//! Foundation layer for Pagesmith:
//! - Error: pipeline error taxonomy tagged by stage
//! - Config: `PublisherConfig` loaded once at startup
//! - Retry: bounded exponential backoff shared by outbound clients
//! - Types: task request, publish result, completion record

pub mod config;
pub mod error;
pub mod retry;
pub mod types;

// ============================================================================
// Error
// ============================================================================
pub use error::{Error, Result, Stage};

// ============================================================================
// Config
// ============================================================================
pub use config::{
    AuthConfig, HostingConfig, ModelConfig, NotifyConfig, PublisherConfig, Secret, ServerConfig,
    WorkspaceConfig,
};

// ============================================================================
// Retry
// ============================================================================
pub use retry::{with_retry, RetryClassification, RetryConfig, RetryableError};

// ============================================================================
// Types
// ============================================================================
pub use types::{Attachment, CompletionRecord, PublishResult, TaskRequest, TaskResponse};
