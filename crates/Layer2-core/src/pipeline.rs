//! Task publisher
//!
//! One publish run, strictly in order:
//!
//! 1. authenticate the shared secret
//! 2. prepare the workspace and decode attachments
//! 3. augment the brief from `data.csv`
//! 4. generate the app
//! 5. write `index.html`, `README.md`, `LICENSE`
//! 6. commit
//! 7. create the remote repository and push
//! 8. enable Pages
//! 9. notify the callback URL
//!
//! The first failure aborts the run. Side effects already made stay in place.

use crate::artifact::write_artifacts;
use crate::augment::BriefAugmenter;
use crate::git::{CommitAuthor, GitCli, GitError, VersionControl};
use crate::hosting::{GitHubClient, HostingApi};
use crate::lock::TaskLocks;
use crate::notify::{HttpNotifier, Notifier};
use crate::workspace::{validate_repo_name, WorkspacePreparer};
use chrono::Utc;
use pagesmith_foundation::{
    CompletionRecord, Error, PublishResult, PublisherConfig, Result, Secret, TaskRequest,
};
use pagesmith_provider::{CodeGenerator, OpenAiProvider};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, info_span, warn, Instrument};

/// Runs publish requests end to end
pub struct TaskPublisher {
    secret: Secret,
    branch: String,
    author: CommitAuthor,
    workspace: WorkspacePreparer,
    augmenter: BriefAugmenter,
    generator: CodeGenerator,
    vcs: Arc<dyn VersionControl>,
    hosting: Arc<dyn HostingApi>,
    notifier: Arc<dyn Notifier>,
    locks: TaskLocks,
}

impl TaskPublisher {
    /// Assemble from explicit collaborators
    pub fn new(
        config: &PublisherConfig,
        generator: CodeGenerator,
        vcs: Arc<dyn VersionControl>,
        hosting: Arc<dyn HostingApi>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            secret: config.auth.secret.clone(),
            branch: config.workspace.branch.clone(),
            author: CommitAuthor::new(
                config.hosting.user.clone(),
                config.hosting.effective_author_email(),
            ),
            workspace: WorkspacePreparer::new(config.workspace.root.clone()),
            augmenter: BriefAugmenter::new(),
            generator,
            vcs,
            hosting,
            notifier,
            locks: TaskLocks::new(),
        }
    }

    /// Assemble the production stack: OpenAI, git CLI, GitHub, HTTP callbacks
    pub fn from_config(config: &PublisherConfig) -> Result<Self> {
        let provider = OpenAiProvider::from_config(&config.model)
            .map_err(|e| Error::Config(format!("model provider: {}", e)))?;
        let generator = CodeGenerator::new(Arc::new(provider))
            .with_template(config.model.instruction_template.clone())
            .with_retry_config(config.retry.clone());

        let vcs = GitCli::new(Duration::from_secs(config.workspace.git_timeout_secs));
        let hosting = GitHubClient::from_config(&config.hosting, config.retry.clone())?;
        let notifier = HttpNotifier::from_config(&config.notify, config.retry.clone())?;

        Ok(Self::new(
            config,
            generator,
            Arc::new(vcs),
            Arc::new(hosting),
            Arc::new(notifier),
        ))
    }

    /// Exact match against the configured secret
    pub fn authenticate(&self, secret: &str) -> Result<()> {
        if secret == self.secret.expose() {
            Ok(())
        } else {
            Err(Error::Unauthorized)
        }
    }

    /// Publish one task
    ///
    /// Authentication and request validation happen before any side effect.
    /// Runs for the same task name are serialized.
    pub async fn publish(&self, request: &TaskRequest) -> Result<PublishResult> {
        self.authenticate(&request.secret)?;
        validate_request(request)?;

        let span = info_span!("publish", task = %request.task, round = request.round);
        async {
            let _guard = self.locks.acquire(&request.task).await;
            info!("Publishing");
            let result = self.run(request).await;
            match &result {
                Ok(published) => info!("Published {}", published.pages_url),
                Err(e) => warn!("Failed during {}: {}", e.stage(), e),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn run(&self, request: &TaskRequest) -> Result<PublishResult> {
        let task = request.task.as_str();

        let dir = self.workspace.prepare(task, &request.attachments).await?;
        let brief = self.augmenter.augment(&dir, &request.brief).await?;

        let html = self.generator.generate(&brief).await?;
        write_artifacts(&dir, &html, task, &request.brief, &request.checks).await?;

        let commit_sha = self.commit(&dir, request.round).await?;

        self.hosting.create_repository(task).await?;
        self.vcs
            .push(&dir, &self.hosting.push_url(task), &self.branch)
            .await
            .map_err(|e| Error::PushFailed(e.to_string()))?;
        self.hosting.enable_pages(task, &self.branch).await?;

        let result = PublishResult {
            task: task.to_string(),
            repo_url: self.hosting.repo_url(task),
            commit_sha,
            pages_url: self.hosting.pages_url(task),
            published_at: Utc::now(),
        };

        let record = CompletionRecord::new(request, &result);
        self.notifier
            .notify(&request.evaluation_url, &record)
            .await?;

        Ok(result)
    }

    /// Commit the workspace; unchanged content republishes the current HEAD
    async fn commit(&self, dir: &Path, round: u32) -> Result<String> {
        self.vcs.init(dir, &self.branch, &self.author).await?;
        self.vcs.stage_all(dir).await?;

        match self.vcs.commit(dir, &format!("Round {} commit", round)).await {
            Ok(hash) => Ok(hash),
            Err(GitError::NothingToCommit) => match self.vcs.head(dir).await? {
                Some(head) => {
                    info!("No changes since {}, republishing it", head);
                    Ok(head)
                }
                None => Err(Error::NothingToCommit),
            },
            Err(e) => Err(e.into()),
        }
    }
}

fn validate_request(request: &TaskRequest) -> Result<()> {
    validate_repo_name(&request.task)?;
    if request.evaluation_url.trim().is_empty() {
        return Err(Error::InvalidRequest(
            "evaluation_url must not be empty".to_string(),
        ));
    }
    Ok(())
}
