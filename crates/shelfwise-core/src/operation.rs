//! Planned file and directory moves.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::config::ConflictPolicy;
use crate::file::FileInfo;

/// Why an operation was planned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MoveReason {
    /// Sorted into its category bucket.
    Classify,
    /// Non-primary copy moved to the duplicates bucket.
    Duplicate,
    /// Plain subdirectory moved into the folders bucket.
    OrganizeFolder,
}

/// A single planned file move.
///
/// Plan entries are not edited in place. Passes that change a destination
/// build a new operation with [`MoveOperation::with_destination`].
#[derive(Debug, Clone)]
pub struct MoveOperation {
    /// Current location.
    pub source: PathBuf,
    /// Target location.
    pub destination: PathBuf,
    /// Snapshot the operation was planned from.
    pub file: Arc<FileInfo>,
    /// Why the move was planned.
    pub reason: MoveReason,
    /// What to do if the destination is occupied.
    pub policy: ConflictPolicy,
}

impl MoveOperation {
    /// Create an operation moving `file` to `destination`.
    pub fn new(
        file: Arc<FileInfo>,
        destination: impl Into<PathBuf>,
        reason: MoveReason,
        policy: ConflictPolicy,
    ) -> Self {
        Self {
            source: file.path.clone(),
            destination: destination.into(),
            file,
            reason,
            policy,
        }
    }

    /// Same operation with a different destination.
    pub fn with_destination(&self, destination: impl Into<PathBuf>) -> Self {
        Self {
            destination: destination.into(),
            ..self.clone()
        }
    }

    /// Whether the move would leave the file where it is.
    pub fn is_noop(&self) -> bool {
        crate::paths::same_location(&self.source, &self.destination)
    }
}

impl std::fmt::Display for MoveOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} -> {} ({})",
            self.source.display(),
            self.destination.display(),
            self.reason
        )
    }
}

/// A planned move of a whole subdirectory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryMoveOperation {
    /// Directory to move.
    pub source: PathBuf,
    /// Target directory path (not its parent).
    pub destination: PathBuf,
    /// What to do if the destination is occupied.
    pub policy: ConflictPolicy,
}

impl DirectoryMoveOperation {
    /// Create a directory move.
    pub fn new(
        source: impl Into<PathBuf>,
        destination: impl Into<PathBuf>,
        policy: ConflictPolicy,
    ) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            policy,
        }
    }

    /// Same operation with a different destination.
    pub fn with_destination(&self, destination: impl Into<PathBuf>) -> Self {
        Self {
            destination: destination.into(),
            ..self.clone()
        }
    }
}

impl std::fmt::Display for DirectoryMoveOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/ -> {}/",
            self.source.display(),
            self.destination.display()
        )
    }
}
