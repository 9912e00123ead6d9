//! Pagesmith CLI - Main entry point

mod cli;
mod server;

use clap::{Parser, Subcommand};
use pagesmith_core::TaskPublisher;
use pagesmith_foundation::PublisherConfig;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Pagesmith - generate web apps from briefs and publish them to GitHub Pages
#[derive(Parser, Debug)]
#[command(name = "pagesmith")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Config file to use instead of the default search paths
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (default)
    Serve {
        /// Address to listen on
        #[arg(short, long)]
        bind: Option<String>,

        /// Directory holding task workspaces
        #[arg(long)]
        repos_root: Option<PathBuf>,
    },
    /// Publish a single TaskRequest JSON file and exit
    Run {
        /// Path to the request file
        #[arg(short, long)]
        request: PathBuf,

        /// Directory holding task workspaces
        #[arg(long)]
        repos_root: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Load configuration
    let mut config = PublisherConfig::load(args.config.as_deref())?;

    let command = args.command.unwrap_or(Command::Serve {
        bind: None,
        repos_root: None,
    });

    match command {
        Command::Serve { bind, repos_root } => {
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            if let Some(root) = repos_root {
                config.workspace.root = root;
            }

            let publisher = Arc::new(TaskPublisher::from_config(&config)?);
            tracing::info!(
                "Publishing as {} with model {}",
                config.hosting.user,
                config.model.model
            );
            server::serve(&config.server.bind, publisher).await?;
        }
        Command::Run {
            request,
            repos_root,
        } => {
            if let Some(root) = repos_root {
                config.workspace.root = root;
            }

            let publisher = TaskPublisher::from_config(&config)?;
            cli::run_once(&publisher, &request).await?;
        }
    }

    Ok(())
}
