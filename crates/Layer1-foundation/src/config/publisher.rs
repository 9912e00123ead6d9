//! Publisher Config
//!
//! Loaded once at startup and handed to the pipeline; nothing reads the
//! process environment after that.
//!
//! ## Load order (later wins)
//!
//! 1. User-level: `~/.pagesmith/pagesmith.toml`
//! 2. Project-level: `./pagesmith.toml`
//! 3. Environment variables (`GITHUB_TOKEN`, `GITHUB_USER`, ...)
//!
//! An explicit `--config` path replaces steps 1 and 2.

use super::Secret;
use crate::retry::RetryConfig;
use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Config file name
pub const CONFIG_FILE: &str = "pagesmith.toml";

/// User-level config directory name
pub const CONFIG_DIR_NAME: &str = ".pagesmith";

/// Placeholder substituted with the brief in the instruction template
pub const BRIEF_PLACEHOLDER: &str = "{brief}";

/// Default instruction template sent to the model
pub const DEFAULT_INSTRUCTION_TEMPLATE: &str = "Create a minimal, self-contained HTML/JS web app \
in a single index.html file based on this brief: {brief}\n\n\
Respond with the complete file contents only. Do not include explanations, \
commentary or Markdown code fences.";

// ============================================================================
// PublisherConfig
// ============================================================================

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PublisherConfig {
    pub server: ServerConfig,
    pub workspace: WorkspaceConfig,
    pub hosting: HostingConfig,
    pub model: ModelConfig,
    pub notify: NotifyConfig,
    pub retry: RetryConfig,
    pub auth: AuthConfig,
}

/// Inbound HTTP server
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to bind
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8000".to_string(),
        }
    }
}

/// Local workspaces and version control
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WorkspaceConfig {
    /// Directory holding one sub-directory per task
    pub root: PathBuf,

    /// Branch pushed and served by Pages
    pub branch: String,

    /// Timeout for a single git invocation (seconds)
    pub git_timeout_secs: u64,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("./repos"),
            branch: "main".to_string(),
            git_timeout_secs: 120,
        }
    }
}

/// Hosting platform (GitHub)
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HostingConfig {
    /// REST API base URL
    pub api_base_url: String,

    /// Host used in push URLs
    pub git_host: String,

    /// Account that owns the published repositories
    pub user: String,

    /// Access token (`GITHUB_TOKEN`)
    pub token: Secret,

    /// Commit author email; defaults to `<user>@example.com`
    pub author_email: Option<String>,

    /// Request timeout (seconds)
    pub timeout_secs: u64,
}

impl Default for HostingConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.github.com".to_string(),
            git_host: "github.com".to_string(),
            user: String::new(),
            token: Secret::default(),
            author_email: None,
            timeout_secs: 30,
        }
    }
}

impl HostingConfig {
    pub fn effective_author_email(&self) -> String {
        self.author_email
            .clone()
            .unwrap_or_else(|| format!("{}@example.com", self.user))
    }
}

/// Language model service (OpenAI-compatible)
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// API key (`OPENAI_API_KEY`)
    pub api_key: Secret,

    /// API base such as `https://api.openai.com/v1`; a full
    /// `/chat/completions` endpoint is accepted too
    pub base_url: String,

    /// Model ID
    pub model: String,

    /// Max output tokens
    pub max_tokens: u32,

    /// Request timeout (seconds)
    pub timeout_secs: u64,

    /// Prompt template; must contain `{brief}`
    pub instruction_template: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            api_key: Secret::default(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            max_tokens: 4096,
            timeout_secs: 300,
            instruction_template: DEFAULT_INSTRUCTION_TEMPLATE.to_string(),
        }
    }
}

/// Callback notification
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    /// Request timeout (seconds)
    pub timeout_secs: u64,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self { timeout_secs: 30 }
    }
}

/// Inbound authentication
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Shared secret (`STUDENT_SECRET`)
    pub secret: Secret,
}

impl PublisherConfig {
    // ========================================================================
    // Load
    // ========================================================================

    /// Load from config files and the process environment, then validate
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let paths = match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(Error::Config(format!(
                        "config file not found: {}",
                        path.display()
                    )));
                }
                vec![path.to_path_buf()]
            }
            None => default_search_paths(),
        };

        let mut merged = toml::Value::Table(toml::map::Map::new());
        for path in paths.iter().filter(|p| p.exists()) {
            let content = std::fs::read_to_string(path).map_err(|e| {
                Error::Config(format!("failed to read {}: {}", path.display(), e))
            })?;
            let value: toml::Value = toml::from_str(&content).map_err(|e| {
                Error::Config(format!("failed to parse {}: {}", path.display(), e))
            })?;
            info!("Loaded settings from: {}", path.display());
            merge_values(&mut merged, value);
        }

        let mut config: Self = merged
            .try_into()
            .map_err(|e: toml::de::Error| Error::Config(e.to_string()))?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parse a single TOML document (no environment, no validation)
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }

    /// Apply environment overrides through `lookup`
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("GITHUB_TOKEN") {
            self.hosting.token = Secret::new(v);
        }
        if let Some(v) = get("GITHUB_USER") {
            self.hosting.user = v;
        }
        if let Some(v) = get("GITHUB_API_URL") {
            self.hosting.api_base_url = v;
        }
        if let Some(v) = get("OPENAI_API_KEY") {
            self.model.api_key = Secret::new(v);
        }
        if let Some(v) = get("OPENAI_BASE_URL") {
            self.model.base_url = v;
        }
        if let Some(v) = get("OPENAI_MODEL") {
            self.model.model = v;
        }
        if let Some(v) = get("STUDENT_SECRET") {
            self.auth.secret = Secret::new(v);
        }
        if let Some(v) = get("PAGESMITH_BIND") {
            self.server.bind = v;
        }
        if let Some(v) = get("PAGESMITH_REPOS_ROOT") {
            self.workspace.root = PathBuf::from(v);
        }
    }

    /// Reject configurations the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        let mut missing = Vec::new();
        if self.hosting.token.is_empty() {
            missing.push("GITHUB_TOKEN");
        }
        if self.hosting.user.is_empty() {
            missing.push("GITHUB_USER");
        }
        if self.model.api_key.is_empty() {
            missing.push("OPENAI_API_KEY");
        }
        if self.auth.secret.is_empty() {
            missing.push("STUDENT_SECRET");
        }
        if !missing.is_empty() {
            return Err(Error::Config(format!(
                "missing required settings: {}",
                missing.join(", ")
            )));
        }

        if !self.model.instruction_template.contains(BRIEF_PLACEHOLDER) {
            return Err(Error::Config(format!(
                "model.instruction_template must contain {}",
                BRIEF_PLACEHOLDER
            )));
        }
        if self.workspace.branch.trim().is_empty() {
            return Err(Error::Config("workspace.branch must not be empty".into()));
        }

        debug!(
            "Config validated: user={}, model={}, repos_root={}",
            self.hosting.user,
            self.model.model,
            self.workspace.root.display()
        );
        Ok(())
    }
}

/// Default config file locations, lowest priority first
pub fn default_search_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(CONFIG_DIR_NAME).join(CONFIG_FILE));
    }
    paths.push(PathBuf::from(CONFIG_FILE));
    paths
}

/// Deep-merge `overlay` into `base` (tables merge, everything else replaces)
fn merge_values(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, value) in overlay_table {
                match base_table.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base_table.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

// ============================================================================
// Tests
// ============================================================================
