//! pagesmith-core: publish pipeline for Pagesmith
//!
//! Layer2 - turns a task request into a published GitHub Pages site
//!
//! # Modules
//!
//! - `workspace`: per-task directory and inline attachments
//! - `augment`: `data.csv` sales total appended to the brief
//! - `artifact`: `index.html`, `README.md`, `LICENSE`
//! - `git`: `VersionControl` trait and the git CLI driver
//! - `hosting`: `HostingApi` trait and the GitHub REST client
//! - `notify`: callback delivery
//! - `lock`: per-task serialization
//! - `pipeline`: `TaskPublisher`, the ordered run
//!
//! # Example
//!
//! ```ignore
//! use pagesmith_core::TaskPublisher;
//! use pagesmith_foundation::PublisherConfig;
//!
//! let config = PublisherConfig::load(None)?;
//! let publisher = TaskPublisher::from_config(&config)?;
//! let result = publisher.publish(&request).await?;
//! println!("{}", result.pages_url);
//! ```

pub mod artifact;
pub mod augment;
pub mod git;
pub mod hosting;
pub mod lock;
pub mod notify;
pub mod pipeline;
pub mod workspace;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

// Re-exports: Pipeline
pub use pipeline::TaskPublisher;

// Re-exports: Steps
pub use artifact::{render_readme, write_artifacts, LICENSE_TEXT};
pub use augment::{augment_brief, sum_sales, BriefAugmenter};
pub use workspace::{decode_data_url, validate_attachment_name, validate_repo_name, WorkspacePreparer};

// Re-exports: Collaborators
pub use git::{CommitAuthor, GitCli, GitError, VersionControl};
pub use hosting::{GitHubClient, HostingApi, PagesStatus, RepoStatus};
pub use lock::{TaskGuard, TaskLocks};
pub use notify::{HttpNotifier, Notifier};
