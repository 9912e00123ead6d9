//! # pagesmith-provider
//!
//! LLM provider abstraction layer for Pagesmith.
//!
//! ## Features
//! - `Provider` trait with a single-shot `complete` call
//! - OpenAI-compatible chat-completions provider
//! - `CodeGenerator`: instruction template + provider + retry policy

pub mod error;
pub mod generator;
pub mod message;
pub mod providers;
pub mod r#trait;

// Core traits and types
pub use message::{Message, MessageRole};
pub use r#trait::{
    FinishReason, ModelInfo, Provider, ProviderMetadata, ProviderResponse, TokenUsage,
};

// Error
pub use error::ProviderError;

// Generator
pub use generator::CodeGenerator;

// Provider implementations
pub use providers::openai::OpenAiProvider;
