//! Slimming error types
//!
//! Missing files, empty documents and "nothing to archive" are not errors;
//! they surface as [`CompactionOutcome`](crate::compact::CompactionOutcome)
//! variants. Everything here makes the run exit non-zero.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for slimming operations
pub type SlimResult<T> = Result<T, SlimError>;

/// Errors that can occur while compacting a queue or inbox file
#[derive(Error, Debug)]
pub enum SlimError {
    /// Source file exists but could not be read
    #[error("Failed to read {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The list field exists but holds something other than a sequence
    #[error("{field} in {path} is not a list")]
    NotAList { path: PathBuf, field: String },

    /// Document could not be rendered back to YAML
    #[error("Failed to serialize {path}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// Archive file could not be created; the source was not touched
    #[error("Failed to write archive {path}")]
    ArchiveWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Source rewrite failed after the archive was already written
    #[error("Failed to update {path}, but archive was created at {archive}")]
    SourceRewrite {
        path: PathBuf,
        archive: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SlimError {
    /// Create a not-a-list error
    pub fn not_a_list(path: impl Into<PathBuf>, field: impl Into<String>) -> Self {
        Self::NotAList {
            path: path.into(),
            field: field.into(),
        }
    }

    /// Whether the archive file exists on disk after this error.
    ///
    /// Only a failed source rewrite leaves an archive behind that an
    /// operator has to reconcile against the live file.
    pub fn archive_created(&self) -> bool {
        matches!(self, Self::SourceRewrite { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_rewrite_message_names_archive() {
        let err = SlimError::SourceRewrite {
            path: PathBuf::from("queue/shogun_to_karo.yaml"),
            archive: PathBuf::from("queue/archive/shogun_to_karo_20260101000000.yaml"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        let msg = err.to_string();
        assert!(msg.contains("but archive was created"));
        assert!(msg.contains("shogun_to_karo_20260101000000.yaml"));
        assert!(err.archive_created());
    }

    #[test]
    fn test_error_chain_names_cause_once() {
        let err = SlimError::ArchiveWrite {
            path: PathBuf::from("queue/archive/inbox_karo_20260101000000.yaml"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        let chain = format!("{:#}", anyhow::Error::from(err));
        assert_eq!(chain.matches("denied").count(), 1);
        assert!(chain.ends_with(": denied"));
    }

    #[test]
    fn test_not_a_list_is_clean_failure() {
        let err = SlimError::not_a_list("queue/inbox/ashigaru1.yaml", "messages");
        assert_eq!(
            err.to_string(),
            "messages in queue/inbox/ashigaru1.yaml is not a list"
        );
        assert!(!err.archive_created());
    }
}
