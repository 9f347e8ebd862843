//! Agent inbox compaction.
//!
//! Messages flagged `read: true` move from `<inbox_dir>/<agent>.yaml` into
//! `<archive_dir>/inbox_<agent>_<timestamp>.yaml`.

use crate::compact::{self, CompactionOutcome, Partition};
use crate::document::{self, Located, INBOX_KEY};
use crate::error::{SlimError, SlimResult};
use crate::store::{archive_stamp, Clock, Store};
use serde_yaml::Value;
use std::path::Path;
use tracing::info;

/// Whether a message has been read. Only a boolean `true` counts.
pub fn is_read(msg: &Value) -> bool {
    msg.get("read").and_then(Value::as_bool).unwrap_or(false)
}

/// Archive read messages from `agent_id`'s inbox file at `inbox_path`.
pub fn compact_inbox(
    store: &dyn Store,
    clock: &dyn Clock,
    agent_id: &str,
    inbox_path: &Path,
    archive_dir: &Path,
) -> SlimResult<CompactionOutcome> {
    // No inbox yet is normal for a fresh agent.
    let Some((_, doc)) = compact::load(store, inbox_path)? else {
        return Ok(CompactionOutcome::Missing);
    };

    let (shape, messages) = match document::locate(&doc, &[INBOX_KEY], false) {
        Located::Empty => return Ok(CompactionOutcome::Empty),
        Located::Unrecognized => return Ok(CompactionOutcome::UnrecognizedShape),
        Located::NotAList(shape) => {
            return Err(SlimError::not_a_list(inbox_path, shape.field_name()));
        }
        Located::Records(shape, messages) => (shape, messages),
    };

    let partition = Partition::split(messages, is_read);
    if partition.archived.is_empty() {
        return Ok(CompactionOutcome::NothingToArchive {
            retained: partition.retained.len(),
        });
    }

    let archive_path = archive_dir.join(format!(
        "inbox_{}_{}.yaml",
        agent_id,
        archive_stamp(clock)
    ));
    let outcome = compact::commit(store, inbox_path, doc, &shape, partition, archive_path)?;

    if let CompactionOutcome::Archived {
        archived,
        archive_path,
        ..
    } = &outcome
    {
        info!(
            "Archived {} messages from {} to {}",
            archived,
            agent_id,
            archive_path.file_name().unwrap_or_default().to_string_lossy()
        );
    }
    Ok(outcome)
}
