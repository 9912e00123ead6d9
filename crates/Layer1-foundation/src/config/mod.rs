//! Config - startup configuration
//!
//! - `publisher.rs` - PublisherConfig and its sections
//! - `secret.rs` - Secret credential wrapper

mod publisher;
mod secret;

pub use publisher::{
    default_search_paths, AuthConfig, HostingConfig, ModelConfig, NotifyConfig, PublisherConfig,
    ServerConfig, WorkspaceConfig, BRIEF_PLACEHOLDER, CONFIG_DIR_NAME, CONFIG_FILE,
    DEFAULT_INSTRUCTION_TEMPLATE,
};
pub use secret::Secret;
