//! Queue slimming for the agent swarm
//!
//! Keeps the coordination YAML files small by moving finished entries into
//! timestamped archive files:
//! - the coordinator's command queue loses commands in a terminal status
//!   (`done`, `done_ng`, `stalled`, `cancelled`, `qc_pass`)
//! - every agent's inbox loses messages marked `read: true`
//!
//! # Usage
//!
//! ```bash
//! # Slim an agent's inbox
//! queue-slim ashigaru1
//!
//! # Coordinator run: slim the command queue, then the coordinator's inbox
//! queue-slim karo
//! ```

pub mod compact;
pub mod config;
pub mod document;
pub mod error;
pub mod inbox;
pub mod queue;
pub mod raw_status;
pub mod store;

pub use compact::{CompactionOutcome, Partition};
pub use config::SlimConfig;
pub use document::DocumentShape;
pub use error::{SlimError, SlimResult};
pub use inbox::compact_inbox;
pub use queue::compact_queue;
pub use store::{Clock, FixedClock, FsStore, MemoryStore, Store, SystemClock};

/// What one agent run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentReport {
    /// Queue outcome; `None` when the agent is not the coordinator
    pub queue: Option<CompactionOutcome>,
    pub inbox: CompactionOutcome,
}

/// Slim the files belonging to `agent_id`.
///
/// The coordinator slims the command queue first; a queue failure stops the
/// run before its inbox is touched. Every agent then slims its own inbox.
pub fn slim_agent(
    config: &SlimConfig,
    agent_id: &str,
    store: &dyn Store,
    clock: &dyn Clock,
) -> SlimResult<AgentReport> {
    let queue = if config.is_coordinator(agent_id) {
        Some(compact_queue(
            store,
            clock,
            &config.queue_file,
            &config.archive_dir,
        )?)
    } else {
        None
    };

    let inbox = compact_inbox(
        store,
        clock,
        agent_id,
        &config.inbox_path(agent_id),
        &config.archive_dir,
    )?;

    tracing::debug!(
        agent = agent_id,
        queue = ?queue.as_ref().map(ToString::to_string),
        inbox = %inbox,
        "Slimming finished"
    );

    Ok(AgentReport { queue, inbox })
}
