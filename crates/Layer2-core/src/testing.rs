//! In-memory fakes for the pipeline's collaborators
//!
//! Available to this crate's tests and, with the `test-utils` feature, to
//! downstream crates.

use crate::git::{CommitAuthor, GitError, VersionControl};
use crate::hosting::{classify_pages_setup, classify_repo_creation, HostingApi, PagesStatus, RepoStatus};
use crate::notify::Notifier;
use async_trait::async_trait;
use pagesmith_foundation::{CompletionRecord, Error, Result};
use pagesmith_provider::{
    FinishReason, Message, ModelInfo, Provider, ProviderError, ProviderMetadata, ProviderResponse,
    TokenUsage,
};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

// ============================================================================
// Provider
// ============================================================================

/// Provider that answers every prompt with a fixed reply
pub struct FakeProvider {
    metadata: ProviderMetadata,
    model: ModelInfo,
    reply: String,
    fail: bool,
    prompts: Mutex<Vec<String>>,
}

impl FakeProvider {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            metadata: ProviderMetadata {
                id: "fake".to_string(),
                display_name: "Fake".to_string(),
                base_url: None,
            },
            model: ModelInfo::new("fake-model", "fake"),
            reply: reply.into(),
            fail: false,
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Provider whose every call fails with a server error
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new("")
        }
    }

    /// Prompts received so far
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

#[async_trait]
impl Provider for FakeProvider {
    fn metadata(&self) -> &ProviderMetadata {
        &self.metadata
    }

    fn model(&self) -> &ModelInfo {
        &self.model
    }

    async fn complete(
        &self,
        messages: Vec<Message>,
        _system_prompt: Option<String>,
    ) -> std::result::Result<ProviderResponse, ProviderError> {
        let prompt = messages
            .into_iter()
            .map(|m| m.content)
            .collect::<Vec<_>>()
            .join("\n");
        self.prompts.lock().push(prompt);

        if self.fail {
            return Err(ProviderError::ServerError("fake provider failure".to_string()));
        }
        Ok(ProviderResponse {
            content: self.reply.clone(),
            usage: TokenUsage::default(),
            finish_reason: FinishReason::Stop,
            model: self.model.id.clone(),
        })
    }

    fn is_available(&self) -> bool {
        true
    }
}

// ============================================================================
// Version control
// ============================================================================

/// Version control that keeps commit counters in memory
#[derive(Default)]
pub struct FakeVcs {
    heads: Mutex<HashMap<PathBuf, u64>>,
    pushes: Mutex<Vec<(PathBuf, String, String)>>,
    messages: Mutex<Vec<String>>,
}

impl FakeVcs {
    pub fn new() -> Self {
        Self::default()
    }

    /// `(dir, remote_url, branch)` of every push
    pub fn pushes(&self) -> Vec<(PathBuf, String, String)> {
        self.pushes.lock().clone()
    }

    /// Commit messages in order
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }

    fn hash(counter: u64) -> String {
        format!("{:040x}", counter)
    }
}

#[async_trait]
impl VersionControl for FakeVcs {
    async fn init(
        &self,
        dir: &Path,
        _branch: &str,
        _author: &CommitAuthor,
    ) -> std::result::Result<(), GitError> {
        self.heads.lock().entry(dir.to_path_buf()).or_insert(0);
        Ok(())
    }

    async fn stage_all(&self, _dir: &Path) -> std::result::Result<(), GitError> {
        Ok(())
    }

    async fn commit(&self, dir: &Path, message: &str) -> std::result::Result<String, GitError> {
        let mut heads = self.heads.lock();
        let counter = heads.entry(dir.to_path_buf()).or_insert(0);
        *counter += 1;
        self.messages.lock().push(message.to_string());
        Ok(Self::hash(*counter))
    }

    async fn head(&self, dir: &Path) -> std::result::Result<Option<String>, GitError> {
        Ok(self
            .heads
            .lock()
            .get(dir)
            .filter(|counter| **counter > 0)
            .map(|counter| Self::hash(*counter)))
    }

    async fn push(
        &self,
        dir: &Path,
        remote_url: &str,
        branch: &str,
    ) -> std::result::Result<(), GitError> {
        self.pushes
            .lock()
            .push((dir.to_path_buf(), remote_url.to_string(), branch.to_string()));
        Ok(())
    }
}

// ============================================================================
// Hosting
// ============================================================================

/// Hosting platform that tracks repositories in memory
pub struct FakeHosting {
    user: String,
    push_url: Option<String>,
    repo_failure: Option<u16>,
    pages_failure: Option<u16>,
    repos: Mutex<HashSet<String>>,
    pages: Mutex<HashSet<String>>,
    calls: Mutex<Vec<String>>,
}

impl FakeHosting {
    pub fn new(user: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            push_url: None,
            repo_failure: None,
            pages_failure: None,
            repos: Mutex::new(HashSet::new()),
            pages: Mutex::new(HashSet::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Push every repository to `url` (e.g. a local bare repository)
    pub fn with_push_url(mut self, url: impl Into<String>) -> Self {
        self.push_url = Some(url.into());
        self
    }

    /// Treat `name` as already present on the platform
    pub fn with_existing_repo(self, name: &str) -> Self {
        self.repos.lock().insert(name.to_string());
        self
    }

    /// Answer repository creation with HTTP `status`
    pub fn failing_repo_creation(mut self, status: u16) -> Self {
        self.repo_failure = Some(status);
        self
    }

    /// Answer pages setup with HTTP `status`
    pub fn failing_pages(mut self, status: u16) -> Self {
        self.pages_failure = Some(status);
        self
    }

    /// Calls made so far, e.g. `create demo1` or `pages demo1 main`
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl HostingApi for FakeHosting {
    async fn create_repository(&self, name: &str) -> Result<RepoStatus> {
        self.calls.lock().push(format!("create {}", name));
        if let Some(status) = self.repo_failure {
            return classify_repo_creation(status, "fake repository failure");
        }
        if self.repos.lock().insert(name.to_string()) {
            Ok(RepoStatus::Created)
        } else {
            classify_repo_creation(422, "name already exists on this account")
        }
    }

    async fn enable_pages(&self, name: &str, branch: &str) -> Result<PagesStatus> {
        self.calls.lock().push(format!("pages {} {}", name, branch));
        if let Some(status) = self.pages_failure {
            return classify_pages_setup(status, "fake pages failure");
        }
        if self.pages.lock().insert(name.to_string()) {
            Ok(PagesStatus::Enabled)
        } else {
            classify_pages_setup(409, "")
        }
    }

    fn push_url(&self, name: &str) -> String {
        self.push_url
            .clone()
            .unwrap_or_else(|| format!("https://git.invalid/{}/{}.git", self.user, name))
    }

    fn repo_url(&self, name: &str) -> String {
        format!("https://github.com/{}/{}", self.user, name)
    }

    fn pages_url(&self, name: &str) -> String {
        format!("https://{}.github.io/{}/", self.user, name)
    }
}

// ============================================================================
// Notifier
// ============================================================================

/// Notifier that records deliveries instead of sending them
#[derive(Default)]
pub struct RecordingNotifier {
    failure: Option<u16>,
    sent: Mutex<Vec<(String, CompletionRecord)>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every delivery with HTTP `status`
    pub fn failing_with(status: u16) -> Self {
        Self {
            failure: Some(status),
            ..Self::default()
        }
    }

    /// `(url, record)` of every delivery attempt
    pub fn sent(&self) -> Vec<(String, CompletionRecord)> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, url: &str, record: &CompletionRecord) -> Result<()> {
        self.sent.lock().push((url.to_string(), record.clone()));
        match self.failure {
            Some(status) => Err(Error::NotificationFailed {
                status: Some(status),
                message: "fake callback failure".to_string(),
            }),
            None => Ok(()),
        }
    }
}
