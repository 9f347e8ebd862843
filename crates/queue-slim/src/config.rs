//! Slimming configuration
//!
//! Defaults describe the standard swarm layout under the project root:
//!
//! ```text
//! queue/shogun_to_karo.yaml   coordinator command queue
//! queue/inbox/<agent>.yaml    per-agent inboxes
//! queue/archive/              generated archives
//! ```
//!
//! Environment variables override the defaults, CLI flags override both.

use std::path::PathBuf;

/// Agent whose run also slims the shared command queue.
pub const DEFAULT_COORDINATOR: &str = "karo";

/// Slimming configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlimConfig {
    /// Project root; relative paths below are joined to it
    pub root: PathBuf,

    /// Command queue file
    pub queue_file: PathBuf,

    /// Directory holding `<agent>.yaml` inboxes
    pub inbox_dir: PathBuf,

    /// Directory receiving archive files
    pub archive_dir: PathBuf,

    /// Agent id that triggers queue compaction
    pub coordinator: String,
}

impl Default for SlimConfig {
    fn default() -> Self {
        Self {
            root: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            queue_file: PathBuf::from("queue/shogun_to_karo.yaml"),
            inbox_dir: PathBuf::from("queue/inbox"),
            archive_dir: PathBuf::from("queue/archive"),
            coordinator: DEFAULT_COORDINATOR.to_string(),
        }
    }
}

impl SlimConfig {
    /// Create config from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create config from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(dir) = lookup("QUEUE_SLIM_ROOT") {
            config.root = PathBuf::from(dir);
        }
        if let Some(path) = lookup("QUEUE_SLIM_QUEUE_FILE") {
            config.queue_file = PathBuf::from(path);
        }
        if let Some(dir) = lookup("QUEUE_SLIM_INBOX_DIR") {
            config.inbox_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("QUEUE_SLIM_ARCHIVE_DIR") {
            config.archive_dir = PathBuf::from(dir);
        }
        if let Some(name) = lookup("QUEUE_SLIM_COORDINATOR") {
            if !name.trim().is_empty() {
                config.coordinator = name.trim().to_string();
            }
        }

        config
    }

    /// Resolve paths relative to the root
    pub fn resolve_paths(&mut self) {
        if self.queue_file.is_relative() {
            self.queue_file = self.root.join(&self.queue_file);
        }
        if self.inbox_dir.is_relative() {
            self.inbox_dir = self.root.join(&self.inbox_dir);
        }
        if self.archive_dir.is_relative() {
            self.archive_dir = self.root.join(&self.archive_dir);
        }
    }

    /// Inbox file for `agent_id`
    pub fn inbox_path(&self, agent_id: &str) -> PathBuf {
        self.inbox_dir.join(format!("{}.yaml", agent_id))
    }

    /// Whether `agent_id` also slims the command queue
    pub fn is_coordinator(&self, agent_id: &str) -> bool {
        agent_id == self.coordinator
    }
}
