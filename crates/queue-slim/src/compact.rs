//! Shared partition and two-file commit used by both compactors.

use crate::document::{self, DocumentShape};
use crate::error::{SlimError, SlimResult};
use crate::store::Store;
use serde_yaml::{Sequence, Value};
use std::fmt;
use std::path::{Path, PathBuf};

/// What a compaction run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompactionOutcome {
    /// Source file does not exist.
    Missing,
    /// Source is blank, unparsable, `[]` or `{}`.
    Empty,
    /// Source has no recognizable record list.
    UnrecognizedShape,
    /// No record qualified; nothing was written.
    NothingToArchive { retained: usize },
    /// Archive written and source rewritten.
    Archived {
        archived: usize,
        retained: usize,
        archive_path: PathBuf,
    },
}

impl CompactionOutcome {
    /// Whether any file was written.
    pub fn wrote_files(&self) -> bool {
        matches!(self, Self::Archived { .. })
    }
}

impl fmt::Display for CompactionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => write!(f, "missing"),
            Self::Empty => write!(f, "empty"),
            Self::UnrecognizedShape => write!(f, "unrecognized_shape"),
            Self::NothingToArchive { retained } => {
                write!(f, "nothing_to_archive({} retained)", retained)
            }
            Self::Archived {
                archived,
                retained,
                archive_path,
            } => write!(
                f,
                "archived({} -> {}, {} retained)",
                archived,
                archive_path.display(),
                retained
            ),
        }
    }
}

/// Records split by an archive predicate, original order kept on both sides.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Partition {
    pub retained: Sequence,
    pub archived: Sequence,
}

impl Partition {
    /// Stable split of `records`; `archive` decides each record once.
    pub fn split<F>(records: &[Value], mut archive: F) -> Self
    where
        F: FnMut(&Value) -> bool,
    {
        let mut partition = Self::default();
        for record in records {
            let decision = archive(record);
            partition.push(record.clone(), decision);
        }
        partition
    }

    /// Append one record to the archived or retained side.
    pub fn push(&mut self, record: Value, archive: bool) {
        if archive {
            self.archived.push(record);
        } else {
            self.retained.push(record);
        }
    }
}

/// Load a source file through `store`.
///
/// `Ok(None)` means the file is missing. Unparsable YAML is logged and
/// loaded as `Value::Null`.
pub(crate) fn load(store: &dyn Store, path: &Path) -> SlimResult<Option<(String, Value)>> {
    let raw = store.read(path).map_err(|source| SlimError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let Some(raw) = raw else {
        return Ok(None);
    };

    let doc = match document::parse(&raw) {
        Ok(doc) => doc,
        Err(e) => {
            tracing::error!(
                path = %path.display(),
                error = %e,
                "Error parsing YAML, treating as empty"
            );
            Value::Null
        }
    };
    Ok(Some((raw, doc)))
}

/// Write the archive, then the slimmed source.
///
/// The archive is created first; if that fails the source is untouched. A
/// failed source write after a successful archive is reported as
/// [`SlimError::SourceRewrite`] and the archive is left in place.
pub(crate) fn commit(
    store: &dyn Store,
    source_path: &Path,
    mut doc: Value,
    shape: &DocumentShape,
    partition: Partition,
    archive_path: PathBuf,
) -> SlimResult<CompactionOutcome> {
    let archived = partition.archived.len();
    let retained = partition.retained.len();

    let archive_doc = shape.build(partition.archived);
    let archive_yaml = document::render(&archive_doc).map_err(|source| SlimError::Serialize {
        path: archive_path.clone(),
        source,
    })?;

    document::replace_records(&mut doc, shape, partition.retained);
    let source_yaml = document::render(&doc).map_err(|source| SlimError::Serialize {
        path: source_path.to_path_buf(),
        source,
    })?;

    store
        .create_new(&archive_path, &archive_yaml)
        .map_err(|source| SlimError::ArchiveWrite {
            path: archive_path.clone(),
            source,
        })?;

    store
        .overwrite(source_path, &source_yaml)
        .map_err(|source| SlimError::SourceRewrite {
            path: source_path.to_path_buf(),
            archive: archive_path.clone(),
            source,
        })?;

    Ok(CompactionOutcome::Archived {
        archived,
        retained,
        archive_path,
    })
}
