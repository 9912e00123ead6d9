//! GitHub client and callback notifier against a local stub server

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use pagesmith_core::{GitHubClient, HostingApi, HttpNotifier, Notifier, PagesStatus, RepoStatus};
use pagesmith_foundation::{
    CompletionRecord, Error, HostingConfig, NotifyConfig, RetryConfig, Secret,
};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Clone)]
struct Recorded {
    path: String,
    authorization: Option<String>,
    accept: Option<String>,
    user_agent: Option<String>,
    body: Value,
}

struct Stub {
    repo_reply: (u16, String),
    pages_reply: (u16, String),
    callback_status: u16,
    requests: Mutex<Vec<Recorded>>,
}

impl Stub {
    fn new() -> Self {
        Self {
            repo_reply: (201, "{}".to_string()),
            pages_reply: (201, "{}".to_string()),
            callback_status: 200,
            requests: Mutex::new(Vec::new()),
        }
    }

    fn record(&self, path: String, headers: &HeaderMap, body: Value) {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        self.requests.lock().push(Recorded {
            path,
            authorization: header("authorization"),
            accept: header("accept"),
            user_agent: header("user-agent"),
            body,
        });
    }

    fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().clone()
    }
}

fn reply((status, body): &(u16, String)) -> (StatusCode, String) {
    (
        StatusCode::from_u16(*status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        body.clone(),
    )
}

async fn create_repo(
    State(stub): State<Arc<Stub>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, String) {
    stub.record("/user/repos".to_string(), &headers, body);
    reply(&stub.repo_reply)
}

async fn enable_pages(
    State(stub): State<Arc<Stub>>,
    Path((owner, repo)): Path<(String, String)>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, String) {
    stub.record(format!("/repos/{}/{}/pages", owner, repo), &headers, body);
    reply(&stub.pages_reply)
}

async fn callback(
    State(stub): State<Arc<Stub>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> StatusCode {
    stub.record("/callback".to_string(), &headers, body);
    StatusCode::from_u16(stub.callback_status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

async fn spawn(stub: Arc<Stub>) -> String {
    let router = Router::new()
        .route("/user/repos", post(create_repo))
        .route("/repos/:owner/:repo/pages", post(enable_pages))
        .route("/callback", post(callback))
        .with_state(stub);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

fn github(base: &str, retry: RetryConfig) -> GitHubClient {
    let config = HostingConfig {
        api_base_url: base.to_string(),
        user: "octo".to_string(),
        token: Secret::new("ghp_test"),
        ..Default::default()
    };
    GitHubClient::from_config(&config, retry).unwrap()
}

fn record() -> CompletionRecord {
    CompletionRecord {
        email: "student@example.com".to_string(),
        task: "demo1".to_string(),
        round: 1,
        nonce: "n-1".to_string(),
        repo_url: "https://github.com/octo/demo1".to_string(),
        commit_sha: "a".repeat(40),
        pages_url: "https://octo.github.io/demo1/".to_string(),
    }
}

#[tokio::test]
async fn test_create_repository_sends_public_repo() {
    let stub = Arc::new(Stub::new());
    let base = spawn(stub.clone()).await;

    let status = github(&base, RetryConfig::no_retry())
        .create_repository("demo1")
        .await
        .unwrap();
    assert_eq!(status, RepoStatus::Created);

    let requests = stub.requests();
    assert_eq!(requests.len(), 1);
    let req = &requests[0];
    assert_eq!(req.path, "/user/repos");
    assert_eq!(req.authorization.as_deref(), Some("Bearer ghp_test"));
    assert_eq!(req.accept.as_deref(), Some("application/vnd.github+json"));
    assert!(req.user_agent.as_deref().unwrap_or("").starts_with("pagesmith/"));
    assert_eq!(req.body["name"], "demo1");
    assert_eq!(req.body["private"], false);
}

#[tokio::test]
async fn test_existing_repository_is_tolerated() {
    let stub = Arc::new(Stub {
        repo_reply: (
            422,
            r#"{"message":"Repository creation failed.","errors":[{"message":"name already exists on this account"}]}"#.to_string(),
        ),
        ..Stub::new()
    });
    let base = spawn(stub).await;

    let status = github(&base, RetryConfig::no_retry())
        .create_repository("demo1")
        .await
        .unwrap();
    assert_eq!(status, RepoStatus::AlreadyExists);
}

#[tokio::test]
async fn test_server_error_is_retried_when_configured() {
    let stub = Arc::new(Stub {
        repo_reply: (502, "bad gateway".to_string()),
        ..Stub::new()
    });
    let base = spawn(stub.clone()).await;
    let retry = RetryConfig {
        max_retries: 2,
        initial_delay_ms: 1,
        jitter: false,
        ..Default::default()
    };

    let err = github(&base, retry)
        .create_repository("demo1")
        .await
        .unwrap_err();

    assert!(matches!(err, Error::RepoCreationFailed { status: Some(502), .. }));
    assert_eq!(stub.requests().len(), 3);
}

#[tokio::test]
async fn test_client_error_is_not_retried() {
    let stub = Arc::new(Stub {
        repo_reply: (401, r#"{"message":"Bad credentials"}"#.to_string()),
        ..Stub::new()
    });
    let base = spawn(stub.clone()).await;
    let retry = RetryConfig {
        max_retries: 3,
        initial_delay_ms: 1,
        ..Default::default()
    };

    let err = github(&base, retry)
        .create_repository("demo1")
        .await
        .unwrap_err();

    assert!(err.to_string().contains("Bad credentials"));
    assert_eq!(stub.requests().len(), 1);
}

#[tokio::test]
async fn test_enable_pages() {
    let stub = Arc::new(Stub::new());
    let base = spawn(stub.clone()).await;

    let status = github(&base, RetryConfig::no_retry())
        .enable_pages("demo1", "main")
        .await
        .unwrap();
    assert_eq!(status, PagesStatus::Enabled);

    let req = &stub.requests()[0];
    assert_eq!(req.path, "/repos/octo/demo1/pages");
    assert_eq!(req.body["source"]["branch"], "main");
    assert_eq!(req.body["source"]["path"], "/");
}

#[tokio::test]
async fn test_pages_already_enabled_and_failure() {
    let stub = Arc::new(Stub {
        pages_reply: (409, r#"{"message":"GitHub Pages is already enabled."}"#.to_string()),
        ..Stub::new()
    });
    let base = spawn(stub).await;
    let status = github(&base, RetryConfig::no_retry())
        .enable_pages("demo1", "main")
        .await
        .unwrap();
    assert_eq!(status, PagesStatus::AlreadyEnabled);

    let stub = Arc::new(Stub {
        pages_reply: (404, r#"{"message":"Not Found"}"#.to_string()),
        ..Stub::new()
    });
    let base = spawn(stub).await;
    let err = github(&base, RetryConfig::no_retry())
        .enable_pages("demo1", "main")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::PagesSetupFailed { status: Some(404), .. }));
}

#[tokio::test]
async fn test_notifier_posts_record() {
    let stub = Arc::new(Stub::new());
    let base = spawn(stub.clone()).await;
    let notifier = HttpNotifier::from_config(&NotifyConfig::default(), RetryConfig::no_retry())
        .unwrap();

    notifier
        .notify(&format!("{}/callback", base), &record())
        .await
        .unwrap();

    let req = &stub.requests()[0];
    assert_eq!(req.body["commit_sha"], "a".repeat(40));
    assert_eq!(req.body["pages_url"], "https://octo.github.io/demo1/");
    assert_eq!(req.body["nonce"], "n-1");
    assert_eq!(req.body["round"], 1);
    assert!(req.authorization.is_none());
}

#[tokio::test]
async fn test_notifier_requires_200() {
    for status in [500u16, 201] {
        let stub = Arc::new(Stub {
            callback_status: status,
            ..Stub::new()
        });
        let base = spawn(stub).await;
        let notifier =
            HttpNotifier::from_config(&NotifyConfig::default(), RetryConfig::no_retry()).unwrap();

        let err = notifier
            .notify(&format!("{}/callback", base), &record())
            .await
            .unwrap_err();
        assert_eq!(err.http_status(), Some(status));
    }
}

#[tokio::test]
async fn test_notifier_unreachable_callback() {
    let notifier =
        HttpNotifier::from_config(&NotifyConfig::default(), RetryConfig::no_retry()).unwrap();
    // Port 9 (discard) on loopback refuses connections
    let err = notifier
        .notify("http://127.0.0.1:9/callback", &record())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotificationFailed { status: None, .. }));
}
