//! queue-slim: archive finished commands and read messages
//!
//! ```bash
//! # Slim ashigaru1's inbox
//! queue-slim ashigaru1
//!
//! # Coordinator: slim the command queue and karo's inbox
//! queue-slim karo
//!
//! # Alternate layout
//! QUEUE_SLIM_ROOT=/srv/swarm queue-slim karo --archive-dir /backup/queue
//! ```
//!
//! All output goes to stderr. Exit status is non-zero when any step fails.

use anyhow::{Context, Result};
use clap::Parser;
use queue_slim::{slim_agent, FsStore, SlimConfig, SystemClock};
use std::path::PathBuf;
use std::process::ExitCode;

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Agent whose inbox is slimmed (the coordinator also slims the command queue)
    agent_id: String,

    /// Project root holding the queue directory (overrides QUEUE_SLIM_ROOT)
    #[arg(long)]
    root: Option<PathBuf>,

    /// Agent id that also slims the command queue (overrides QUEUE_SLIM_COORDINATOR)
    #[arg(long)]
    coordinator: Option<String>,

    /// Command queue file (overrides QUEUE_SLIM_QUEUE_FILE)
    #[arg(long)]
    queue_file: Option<PathBuf>,

    /// Inbox directory (overrides QUEUE_SLIM_INBOX_DIR)
    #[arg(long)]
    inbox_dir: Option<PathBuf>,

    /// Archive directory (overrides QUEUE_SLIM_ARCHIVE_DIR)
    #[arg(long)]
    archive_dir: Option<PathBuf>,
}

impl Args {
    fn into_config(self) -> (String, SlimConfig) {
        let mut config = SlimConfig::from_env();

        if let Some(root) = self.root {
            config.root = root;
        }
        if let Some(name) = self.coordinator {
            config.coordinator = name;
        }
        if let Some(path) = self.queue_file {
            config.queue_file = path;
        }
        if let Some(dir) = self.inbox_dir {
            config.inbox_dir = dir;
        }
        if let Some(dir) = self.archive_dir {
            config.archive_dir = dir;
        }
        config.resolve_paths();

        (self.agent_id, config)
    }
}

fn run(agent_id: &str, config: &SlimConfig) -> Result<()> {
    std::fs::create_dir_all(&config.archive_dir).with_context(|| {
        format!(
            "Failed to create archive directory {}",
            config.archive_dir.display()
        )
    })?;

    slim_agent(config, agent_id, &FsStore, &SystemClock)?;
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let (agent_id, config) = args.into_config();
    tracing::debug!(
        agent = %agent_id,
        queue = %config.queue_file.display(),
        inbox = %config.inbox_path(&agent_id).display(),
        archive = %config.archive_dir.display(),
        "queue-slim starting"
    );

    match run(&agent_id, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
