//! Error types for plan execution.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Why a single operation (or an undo) failed.
#[derive(Debug, Error)]
pub enum ExecuteError {
    #[error("Source does not exist: {}", path.display())]
    SourceMissing { path: PathBuf },

    #[error("Cannot create directory {}: {source}", path.display())]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Destination exists and conflict policy is skip: {}", path.display())]
    DestinationExists { path: PathBuf },

    #[error("Cannot overwrite {}: {reason}", path.display())]
    Overwrite { path: PathBuf, reason: String },

    #[error("Move failed {} -> {}: {source}", from.display(), to.display())]
    Move {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Integrity verification failed for {}: expected {expected}, found {actual}", path.display())]
    IntegrityMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("Cannot hash {} for verification: {source}", path.display())]
    Hash {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Cannot write operation log {}: {source}", path.display())]
    Log {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Undo is not available in dry-run mode")]
    UndoInDryRun,

    #[error("Cannot read operation log {}: {source}", path.display())]
    ReadLog {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid operation log {}: {source}", path.display())]
    InvalidLog {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl ExecuteError {
    /// Classify an I/O failure while moving `from` to `to`.
    pub fn io(from: impl Into<PathBuf>, to: impl Into<PathBuf>, source: io::Error) -> Self {
        let from = from.into();
        match source.kind() {
            io::ErrorKind::NotFound if !from.exists() => Self::SourceMissing { path: from },
            _ => Self::Move {
                from,
                to: to.into(),
                source,
            },
        }
    }
}

/// Failure persisting a checkpoint.
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("Cannot write checkpoint {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Cannot remove checkpoint {}: {source}", path.display())]
    Remove {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Cannot serialize checkpoint: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Failure writing a report.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Cannot serialize report: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Cannot write report {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
