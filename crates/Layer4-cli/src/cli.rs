//! One-shot mode: publish a single request file without the server

use pagesmith_core::TaskPublisher;
use pagesmith_foundation::TaskRequest;
use std::path::Path;

/// Run the request stored at `path` and print the result as JSON
pub async fn run_once(publisher: &TaskPublisher, path: &Path) -> anyhow::Result<()> {
    let content = tokio::fs::read_to_string(path).await?;
    let request: TaskRequest = serde_json::from_str(&content)?;

    println!("Pagesmith - publishing {} (round {})...\n", request.task, request.round);
    let result = publisher.publish(&request).await?;

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
