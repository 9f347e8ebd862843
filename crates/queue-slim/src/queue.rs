//! Command queue compaction.
//!
//! Moves commands in a terminal status out of the coordinator's queue file
//! into `<archive_dir>/<queue_stem>_<timestamp>.yaml`.

use crate::compact::{self, CompactionOutcome, Partition};
use crate::document::{self, Located, QUEUE_KEYS};
use crate::error::{SlimError, SlimResult};
use crate::raw_status;
use crate::store::{archive_stamp, Clock, Store};
use serde_yaml::Value;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info, warn};

/// Statuses that take a command out of the live queue.
pub const ARCHIVE_STATUSES: [&str; 5] = ["done", "done_ng", "stalled", "cancelled", "qc_pass"];

const UNKNOWN: &str = "unknown";

/// Whether `status` is terminal.
pub fn is_archivable(status: &str) -> bool {
    ARCHIVE_STATUSES.contains(&status)
}

/// Archive terminal commands from the queue file at `queue_path`.
pub fn compact_queue(
    store: &dyn Store,
    clock: &dyn Clock,
    queue_path: &Path,
    archive_dir: &Path,
) -> SlimResult<CompactionOutcome> {
    let Some((raw, doc)) = compact::load(store, queue_path)? else {
        warn!(path = %queue_path.display(), "Queue file not found");
        return Ok(CompactionOutcome::Missing);
    };

    let (shape, records) = match document::locate(&doc, &QUEUE_KEYS, true) {
        Located::Empty => return Ok(CompactionOutcome::Empty),
        Located::Unrecognized => {
            debug!(path = %queue_path.display(), "No commands/queue list, skipping");
            return Ok(CompactionOutcome::UnrecognizedShape);
        }
        Located::NotAList(shape) => {
            return Err(SlimError::not_a_list(queue_path, shape.field_name()));
        }
        Located::Records(shape, records) => (shape, records),
    };

    let first_statuses = raw_status::first_status_by_id(&raw);
    let mut partition = Partition::default();
    for cmd in records {
        let mut cmd = cmd.clone();
        let status = settle_status(&mut cmd, &first_statuses);
        partition.push(cmd, is_archivable(&status));
    }

    if partition.archived.is_empty() {
        return Ok(CompactionOutcome::NothingToArchive {
            retained: partition.retained.len(),
        });
    }

    let stem = queue_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "queue".to_string());
    let archive_path = archive_dir.join(format!("{}_{}.yaml", stem, archive_stamp(clock)));

    let outcome = compact::commit(store, queue_path, doc, &shape, partition, archive_path)?;

    if let CompactionOutcome::Archived {
        archived,
        archive_path,
        ..
    } = &outcome
    {
        info!(
            "Archived {} commands to {}",
            archived,
            archive_path.file_name().unwrap_or_default().to_string_lossy()
        );
    }
    Ok(outcome)
}

/// Effective status of one command.
///
/// The loaded `status` (last occurrence when the key is repeated) is checked
/// against the first occurrence in the raw text; the first one wins.
pub fn resolve_status(cmd: &Value, first_statuses: &HashMap<String, String>) -> String {
    if !cmd.is_mapping() {
        warn!("Queue entry is not a mapping, keeping it active");
        return UNKNOWN.to_string();
    }

    let cmd_id = cmd.get("id").and_then(scalar_text);
    let loaded = cmd
        .get("status")
        .and_then(scalar_text)
        .unwrap_or_else(|| UNKNOWN.to_string());

    let raw = first_statuses.get(cmd_id.as_deref().unwrap_or(UNKNOWN));
    match raw {
        Some(raw) if *raw != loaded => {
            warn!(
                "Duplicate status key in {}: yaml={} raw={}, using raw (first occurrence)",
                cmd_id.as_deref().unwrap_or(UNKNOWN),
                loaded,
                raw
            );
            raw.clone()
        }
        _ => loaded,
    }
}

/// Resolve the status of `cmd` and write a corrected value back into it.
///
/// Only a `status` key already holding a scalar is rewritten, so the slimmed
/// queue and the archive carry the first-occurrence value instead of the
/// duplicate. Null and missing values are left as loaded.
pub fn settle_status(cmd: &mut Value, first_statuses: &HashMap<String, String>) -> String {
    let status = resolve_status(cmd, first_statuses);
    if let Some(slot) = cmd.as_mapping_mut().and_then(|map| map.get_mut("status")) {
        if scalar_text(slot).is_some_and(|current| current != status) {
            *slot = Value::String(status.clone());
        }
    }
    status
}

/// Text of a scalar YAML value; `None` for null, collections and tags.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{FixedClock, MemoryStore};
    use chrono::{Local, TimeZone};
    use std::path::PathBuf;

    const QUEUE: &str = "queue/shogun_to_karo.yaml";
    const ARCHIVE: &str = "queue/archive/shogun_to_karo_20260110123000.yaml";

    fn clock() -> FixedClock {
        FixedClock(Local.with_ymd_and_hms(2026, 1, 10, 12, 30, 0).unwrap())
    }

    fn run(store: &MemoryStore) -> SlimResult<CompactionOutcome> {
        compact_queue(store, &clock(), Path::new(QUEUE), Path::new("queue/archive"))
    }

    #[test]
    fn test_archive_statuses_are_closed_set() {
        for status in ARCHIVE_STATUSES {
            assert!(is_archivable(status));
        }
        for status in ["pending", "in_progress", "assigned", "unknown", "DONE", ""] {
            assert!(!is_archivable(status));
        }
    }

    #[test]
    fn test_end_to_end_bare_list() {
        let store = MemoryStore::new().with_file(
            QUEUE,
            "- id: a\n  status: done\n- id: b\n  status: pending\n- id: c\n  status: qc_pass\n",
        );

        let outcome = run(&store).unwrap();
        assert_eq!(
            outcome,
            CompactionOutcome::Archived {
                archived: 2,
                retained: 1,
                archive_path: PathBuf::from(ARCHIVE),
            }
        );
        assert_eq!(
            store.get(QUEUE).as_deref(),
            Some("- id: b\n  status: pending\n")
        );
        assert_eq!(
            store.get(ARCHIVE).as_deref(),
            Some("- id: a\n  status: done\n- id: c\n  status: qc_pass\n")
        );
    }

    #[test]
    fn test_duplicate_status_first_occurrence_keeps_active() {
        let source = "- id: cmd_001\n  status: in_progress\n  status: done\n";
        let store = MemoryStore::new().with_file(QUEUE, source);

        let outcome = run(&store).unwrap();
        assert_eq!(outcome, CompactionOutcome::NothingToArchive { retained: 1 });
        assert_eq!(store.get(QUEUE).as_deref(), Some(source));
        assert_eq!(store.paths().len(), 1);
    }

    #[test]
    fn test_duplicate_status_first_occurrence_archives() {
        let store = MemoryStore::new().with_file(
            QUEUE,
            "- id: cmd_002\n  status: done\n  status: in_progress\n- id: cmd_003\n  status: pending\n",
        );

        let outcome = run(&store).unwrap();
        assert!(matches!(outcome, CompactionOutcome::Archived { archived: 1, .. }));
        let archive = store.get(ARCHIVE).unwrap();
        assert!(archive.contains("cmd_002"));
        assert!(!archive.contains("cmd_003"));
    }

    #[test]
    fn test_rewrite_persists_first_occurrence() {
        let store = MemoryStore::new().with_file(
            QUEUE,
            "- id: x\n  status: in_progress\n  status: done\n- id: y\n  status: done\n",
        );

        run(&store).unwrap();
        assert_eq!(
            store.get(QUEUE).as_deref(),
            Some("- id: x\n  status: in_progress\n")
        );
        assert_eq!(
            run(&store).unwrap(),
            CompactionOutcome::NothingToArchive { retained: 1 }
        );
    }

    #[test]
    fn test_null_status_is_never_rewritten() {
        let store = MemoryStore::new().with_file(
            QUEUE,
            "- id: a\n  status:\n  purpose: x\n- id: n\n  status: ~\n- id: b\n  status: done\n",
        );

        let outcome = run(&store).unwrap();
        assert!(matches!(
            outcome,
            CompactionOutcome::Archived {
                archived: 1,
                retained: 2,
                ..
            }
        ));
        assert_eq!(
            store.get(QUEUE).as_deref(),
            Some("- id: a\n  status: null\n  purpose: x\n- id: n\n  status: null\n")
        );
    }

    #[test]
    fn test_settle_status_leaves_missing_key_alone() {
        let mut cmd = document::parse("id: z\nmeta:\n  status: done\n").unwrap();
        let mut first = HashMap::new();
        first.insert("z".to_string(), "done".to_string());

        assert_eq!(settle_status(&mut cmd, &first), "done");
        assert!(cmd.get("status").is_none());
    }

    #[test]
    fn test_wrapped_shape_preserved() {
        let store = MemoryStore::new().with_file(
            QUEUE,
            "owner: shogun\ncommands:\n- id: a\n  status: cancelled\n- id: b\n  status: assigned\n",
        );

        run(&store).unwrap();
        assert_eq!(
            store.get(ARCHIVE).as_deref(),
            Some("commands:\n- id: a\n  status: cancelled\n")
        );
        assert_eq!(
            store.get(QUEUE).as_deref(),
            Some("owner: shogun\ncommands:\n- id: b\n  status: assigned\n")
        );
    }

    #[test]
    fn test_queue_key_used_when_commands_absent() {
        let store =
            MemoryStore::new().with_file(QUEUE, "queue:\n- id: a\n  status: stalled\n");

        let outcome = run(&store).unwrap();
        assert!(outcome.wrote_files());
        assert_eq!(
            store.get(ARCHIVE).as_deref(),
            Some("queue:\n- id: a\n  status: stalled\n")
        );
        assert_eq!(store.get(QUEUE).as_deref(), Some("queue: []\n"));
    }

    #[test]
    fn test_missing_and_empty_are_noops() {
        let store = MemoryStore::new();
        assert_eq!(run(&store).unwrap(), CompactionOutcome::Missing);

        for content in ["[]\n", "", "{}\n", "key: [unclosed\n"] {
            let store = MemoryStore::new().with_file(QUEUE, content);
            assert_eq!(run(&store).unwrap(), CompactionOutcome::Empty, "{:?}", content);
            assert_eq!(store.paths().len(), 1);
        }
    }

    #[test]
    fn test_unrecognized_mapping_is_noop() {
        let store = MemoryStore::new().with_file(QUEUE, "tasks:\n- id: a\n  status: done\n");
        assert_eq!(run(&store).unwrap(), CompactionOutcome::UnrecognizedShape);
        assert_eq!(store.paths().len(), 1);
    }

    #[test]
    fn test_non_list_queue_is_error() {
        let store = MemoryStore::new().with_file(QUEUE, "commands:\n  id: a\n  status: done\n");
        let err = run(&store).unwrap_err();
        assert!(matches!(err, SlimError::NotAList { ref field, .. } if field == "commands"));
        assert_eq!(store.paths().len(), 1);
    }

    #[test]
    fn test_missing_status_and_non_mapping_stay_active() {
        let store = MemoryStore::new().with_file(
            QUEUE,
            "- id: a\n  purpose: no status\n- plain string entry\n- id: b\n  status: done\n",
        );

        let outcome = run(&store).unwrap();
        assert!(matches!(
            outcome,
            CompactionOutcome::Archived {
                archived: 1,
                retained: 2,
                ..
            }
        ));
        assert_eq!(
            store.get(QUEUE).as_deref(),
            Some("- id: a\n  purpose: no status\n- plain string entry\n")
        );
    }

    #[test]
    fn test_second_run_is_noop() {
        let store = MemoryStore::new().with_file(
            QUEUE,
            "- id: a\n  status: done_ng\n- id: b\n  status: in_progress\n",
        );
        assert!(run(&store).unwrap().wrote_files());
        let after_first = store.get(QUEUE);

        assert_eq!(
            run(&store).unwrap(),
            CompactionOutcome::NothingToArchive { retained: 1 }
        );
        assert_eq!(store.get(QUEUE), after_first);
        assert_eq!(store.paths().len(), 2);
    }

    #[test]
    fn test_source_rewrite_failure_reports_archive() {
        let store = MemoryStore::new()
            .with_file(QUEUE, "- id: a\n  status: done\n")
            .fail_writes_to(QUEUE);

        let err = run(&store).unwrap_err();
        match err {
            SlimError::SourceRewrite { archive, .. } => {
                assert_eq!(archive, PathBuf::from(ARCHIVE));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(store.get(ARCHIVE).is_some());
    }

    #[test]
    fn test_resolve_status_numeric_id() {
        let cmd = document::parse("id: 42\nstatus: done\n").unwrap();
        let mut first = HashMap::new();
        first.insert("42".to_string(), "pending".to_string());
        assert_eq!(resolve_status(&cmd, &first), "pending");
        assert_eq!(resolve_status(&cmd, &HashMap::new()), "done");
    }
}
