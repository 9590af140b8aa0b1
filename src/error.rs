//! Error types for the panda-rs compilation-database scheduler.
//!
//! [`PandaError`] covers only the fatal-configuration class of errors
//! (unreadable CDB, invalid plugin descriptors, conflicting flags,
//! non-positive worker counts, unreadable file lists). Per-unit skips
//! and per-task subprocess failures are never represented as
//! `PandaError` values that propagate out of the scheduler — they are
//! logged with [`log::warn!`]/[`log::error!`] at the point they occur
//! and execution continues, matching the "errors are local to the
//! task" policy.
use thiserror::Error;

/// Represents all fatal-configuration failures panda-rs can report.
///
/// # Exit Codes
///
/// Each variant maps to a small positive exit code via
/// [`PandaError::exit_code`]; `0` is reserved for normal termination,
/// including runs where individual per-unit actions exited non-zero.
#[derive(Error, Debug)]
pub enum PandaError {
    /// I/O operation failed (reading the CDB, a plugin file, a file list, ...).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The compilation database could not be parsed as JSON.
    #[error("invalid compilation database {path}: {message}")]
    InvalidCdb {
        /// Path to the offending CDB file.
        path: String,
        /// Description of the parse failure.
        message: String,
    },

    /// A plugin descriptor failed structural validation.
    #[error("invalid plugin {path}: {message}")]
    InvalidPlugin {
        /// Path to the offending plugin file.
        path: String,
        /// Description of the structural error.
        message: String,
    },

    /// Two or more CLI flags were mutually exclusive.
    #[error("conflicting flags: {0}")]
    ConflictingFlags(String),

    /// `-j/--jobs` was not a positive integer.
    #[error("worker count must be >= 1, got {0}")]
    InvalidJobCount(usize),

    /// `--file-list` pointed at a file that could not be read.
    #[error("unable to read file list {path}: {message}")]
    UnreadableFileList {
        /// Path to the file list.
        path: String,
        /// Description of the read failure.
        message: String,
    },

    /// Generic configuration error with a free-form message.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Specialized `Result` type for panda-rs operations.
pub type PandaResult<T> = Result<T, PandaError>;

impl PandaError {
    /// Construct a generic configuration error.
    pub fn config<S: Into<String>>(message: S) -> Self {
        PandaError::Config(message.into())
    }

    /// Construct an [`PandaError::InvalidCdb`] error.
    pub fn invalid_cdb<P: Into<String>, M: Into<String>>(path: P, message: M) -> Self {
        PandaError::InvalidCdb {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Construct an [`PandaError::InvalidPlugin`] error.
    pub fn invalid_plugin<P: Into<String>, M: Into<String>>(path: P, message: M) -> Self {
        PandaError::InvalidPlugin {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Construct an [`PandaError::UnreadableFileList`] error.
    pub fn unreadable_file_list<P: Into<String>, M: Into<String>>(path: P, message: M) -> Self {
        PandaError::UnreadableFileList {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Return the process exit code that corresponds to this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            PandaError::Io(_) => 1,
            PandaError::InvalidCdb { .. } => 2,
            PandaError::InvalidPlugin { .. } => 3,
            PandaError::ConflictingFlags(_) => 4,
            PandaError::InvalidJobCount(_) => 5,
            PandaError::UnreadableFileList { .. } => 6,
            PandaError::Config(_) => 7,
        }
    }

    /// Render a one-line, user-facing diagnostic.
    pub fn user_friendly_message(&self) -> String {
        format!("panda-rs: {self}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_are_stable() {
        assert_eq!(PandaError::config("x").exit_code(), 7);
        assert_eq!(PandaError::invalid_cdb("a", "b").exit_code(), 2);
        assert_eq!(PandaError::invalid_plugin("a", "b").exit_code(), 3);
        assert_eq!(PandaError::ConflictingFlags("x".into()).exit_code(), 4);
        assert_eq!(PandaError::InvalidJobCount(0).exit_code(), 5);
        assert_eq!(PandaError::unreadable_file_list("a", "b").exit_code(), 6);
    }

    #[test]
    fn user_friendly_message_is_prefixed() {
        let err = PandaError::config("bad worker count");
        assert!(err.user_friendly_message().starts_with("panda-rs: "));
    }
}
