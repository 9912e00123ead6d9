//! Workspace preparation
//!
//! One directory per task under the configured root. The directory is
//! reused across runs; inline attachments are decoded into it.

use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine};
use pagesmith_foundation::{Attachment, Error, Result, Stage};
use regex::Regex;
use std::path::{Component, Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, info};

/// Longest repository name GitHub accepts
const MAX_REPO_NAME_LEN: usize = 100;

fn repo_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9._-]+$").expect("valid repo name pattern"))
}

/// Check that `name` is usable both as a repository name and a directory name
pub fn validate_repo_name(name: &str) -> Result<()> {
    if name.is_empty() || name.len() > MAX_REPO_NAME_LEN {
        return Err(Error::InvalidRequest(format!(
            "task name must be 1-{} characters",
            MAX_REPO_NAME_LEN
        )));
    }
    if name == "." || name == ".." || !repo_name_pattern().is_match(name) {
        return Err(Error::InvalidRequest(format!(
            "task name '{}' is not a valid repository name",
            name
        )));
    }
    Ok(())
}

/// Check that an attachment name stays inside the workspace
pub fn validate_attachment_name(name: &str) -> Result<()> {
    let reject = |reason: &str| Error::AttachmentDecode {
        name: name.to_string(),
        message: reason.to_string(),
    };

    if name.is_empty() {
        return Err(reject("empty file name"));
    }
    if name.contains('/') || name.contains('\\') || name.contains('\0') {
        return Err(reject("file name must not contain path separators"));
    }

    // A `.git` file can point git at another repository via `gitdir:`
    if name.eq_ignore_ascii_case(".git") {
        return Err(reject("file name is reserved for git metadata"));
    }

    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(reject("file name must be a plain file name")),
    }
}

/// Decode the payload of a `data:` URL (base64 after the first comma)
pub fn decode_data_url(name: &str, url: &str) -> Result<Vec<u8>> {
    let (_, payload) = url.split_once(',').ok_or_else(|| Error::AttachmentDecode {
        name: name.to_string(),
        message: "data URL has no payload separator".to_string(),
    })?;

    BASE64_STANDARD
        .decode(payload.trim())
        .map_err(|e| Error::AttachmentDecode {
            name: name.to_string(),
            message: e.to_string(),
        })
}

// ============================================================================
// WorkspacePreparer
// ============================================================================

/// Materializes task workspaces under a root directory
#[derive(Debug, Clone)]
pub struct WorkspacePreparer {
    root: PathBuf,
}

impl WorkspacePreparer {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory for `task` (not created)
    pub fn path_for(&self, task: &str) -> PathBuf {
        self.root.join(task)
    }

    /// Ensure the task directory exists and write inline attachments into it
    ///
    /// Every attachment is validated and decoded before the first write, so
    /// a bad attachment leaves no partial files behind.
    pub async fn prepare(&self, task: &str, attachments: &[Attachment]) -> Result<PathBuf> {
        validate_repo_name(task)?;

        let mut decoded = Vec::new();
        for attachment in attachments {
            if !attachment.is_inline() {
                debug!("Skipping non-inline attachment: {}", attachment.name);
                continue;
            }
            validate_attachment_name(&attachment.name)?;
            let bytes = decode_data_url(&attachment.name, &attachment.url)?;
            decoded.push((attachment.name.as_str(), bytes));
        }

        let dir = self.path_for(task);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(Error::io(Stage::Workspace))?;

        for (name, bytes) in &decoded {
            tokio::fs::write(dir.join(name), bytes)
                .await
                .map_err(Error::io(Stage::Workspace))?;
            debug!("Wrote attachment {} ({} bytes)", name, bytes.len());
        }

        info!(
            "Workspace ready at {} ({} attachment(s) written)",
            dir.display(),
            decoded.len()
        );
        Ok(dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_validate_repo_name() {
        assert!(validate_repo_name("demo1").is_ok());
        assert!(validate_repo_name("my-app_v2.0").is_ok());
        assert!(validate_repo_name("").is_err());
        assert!(validate_repo_name("..").is_err());
        assert!(validate_repo_name("a/b").is_err());
        assert!(validate_repo_name("with space").is_err());
        assert!(validate_repo_name(&"x".repeat(101)).is_err());
    }

    #[test]
    fn test_validate_attachment_name() {
        assert!(validate_attachment_name("data.csv").is_ok());
        assert!(validate_attachment_name(".hidden").is_ok());
        assert!(validate_attachment_name("../escape.txt").is_err());
        assert!(validate_attachment_name("..").is_err());
        assert!(validate_attachment_name(".").is_err());
        assert!(validate_attachment_name("/etc/passwd").is_err());
        assert!(validate_attachment_name("dir\\file").is_err());
        assert!(validate_attachment_name("").is_err());
        assert!(validate_attachment_name(".git").is_err());
        assert!(validate_attachment_name(".GIT").is_err());
        assert!(validate_attachment_name(".gitignore").is_ok());
    }

    #[test]
    fn test_decode_data_url() {
        let bytes = decode_data_url("hello.txt", "data:text/plain;base64,SGVsbG8=").unwrap();
        assert_eq!(bytes, b"Hello");

        assert!(matches!(
            decode_data_url("x", "data:text/plain;base64"),
            Err(Error::AttachmentDecode { .. })
        ));
        assert!(matches!(
            decode_data_url("x", "data:text/plain;base64,@@not-base64@@"),
            Err(Error::AttachmentDecode { .. })
        ));
    }

    #[tokio::test]
    async fn test_prepare_writes_inline_attachments() {
        let root = tempdir().unwrap();
        let preparer = WorkspacePreparer::new(root.path());

        let dir = preparer
            .prepare(
                "demo1",
                &[
                    Attachment::new("hello.txt", "data:text/plain;base64,SGVsbG8="),
                    Attachment::new("remote.png", "https://example.com/remote.png"),
                ],
            )
            .await
            .unwrap();

        assert_eq!(dir, root.path().join("demo1"));
        assert_eq!(std::fs::read(dir.join("hello.txt")).unwrap(), b"Hello");
        assert!(!dir.join("remote.png").exists());
    }

    #[tokio::test]
    async fn test_prepare_is_idempotent() {
        let root = tempdir().unwrap();
        let preparer = WorkspacePreparer::new(root.path());

        let dir = preparer.prepare("demo1", &[]).await.unwrap();
        std::fs::write(dir.join("keep.txt"), "kept").unwrap();

        preparer.prepare("demo1", &[]).await.unwrap();
        assert_eq!(std::fs::read_to_string(dir.join("keep.txt")).unwrap(), "kept");
    }

    #[tokio::test]
    async fn test_prepare_rejects_traversal_before_writing() {
        let root = tempdir().unwrap();
        let preparer = WorkspacePreparer::new(root.path());

        let err = preparer
            .prepare(
                "demo1",
                &[
                    Attachment::new("ok.txt", "data:text/plain;base64,SGVsbG8="),
                    Attachment::new("../evil.txt", "data:text/plain;base64,SGVsbG8="),
                ],
            )
            .await
            .unwrap_err();

        assert!(matches!(err, Error::AttachmentDecode { .. }));
        assert!(!root.path().join("evil.txt").exists());
        assert!(!root.path().join("demo1").join("ok.txt").exists());
    }

    #[tokio::test]
    async fn test_prepare_rejects_git_pointer_file() {
        let root = tempdir().unwrap();
        let preparer = WorkspacePreparer::new(root.path());

        // "gitdir: /tmp/elsewhere/.git"
        let err = preparer
            .prepare(
                "demo1",
                &[Attachment::new(
                    ".Git",
                    "data:text/plain;base64,Z2l0ZGlyOiAvdG1wL2Vsc2V3aGVyZS8uZ2l0",
                )],
            )
            .await
            .unwrap_err();

        assert!(matches!(err, Error::AttachmentDecode { .. }));
        assert!(!root.path().join("demo1").join(".Git").exists());
    }

    #[tokio::test]
    async fn test_prepare_rejects_malformed_payload() {
        let root = tempdir().unwrap();
        let preparer = WorkspacePreparer::new(root.path());

        let err = preparer
            .prepare("demo1", &[Attachment::new("bad.bin", "data:;base64,!!!")])
            .await
            .unwrap_err();
        assert_eq!(err.stage(), Stage::Workspace);
    }
}
