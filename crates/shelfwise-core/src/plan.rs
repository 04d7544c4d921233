//! Organization plans and execution results.

use std::collections::BTreeSet;
use std::path::{Component, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Local};

use crate::duplicate::DuplicateSet;
use crate::operation::{DirectoryMoveOperation, MoveOperation};

/// Everything one run intends to do, in execution order.
#[derive(Debug, Clone)]
pub struct OrganizationPlan {
    /// Directory being organized.
    pub root: PathBuf,
    /// File moves, in execution order.
    pub operations: Vec<MoveOperation>,
    /// Directory moves, executed after all file moves.
    pub directory_operations: Vec<DirectoryMoveOperation>,
    /// Duplicate groups found during planning.
    pub duplicate_sets: Vec<DuplicateSet>,
    /// Files deliberately left alone.
    pub skipped: Vec<PathBuf>,
    /// Problems encountered while planning.
    pub errors: Vec<String>,
    /// When the plan was created.
    pub created: DateTime<Local>,
}

impl OrganizationPlan {
    /// Create an empty plan for `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            operations: Vec::new(),
            directory_operations: Vec::new(),
            duplicate_sets: Vec::new(),
            skipped: Vec::new(),
            errors: Vec::new(),
            created: Local::now(),
        }
    }

    /// Number of file operations.
    pub fn total_files(&self) -> usize {
        self.operations.len()
    }

    /// Total operations of both kinds.
    pub fn total_operations(&self) -> usize {
        self.operations.len() + self.directory_operations.len()
    }

    /// Number of non-primary duplicate files.
    pub fn total_duplicates(&self) -> usize {
        self.duplicate_sets.iter().map(|s| s.count() - 1).sum()
    }

    /// Bytes recoverable by removing every non-primary duplicate.
    pub fn space_recoverable(&self) -> u64 {
        self.duplicate_sets.iter().map(DuplicateSet::space_wasted).sum()
    }

    /// Sum of source sizes across file operations.
    pub fn total_bytes(&self) -> u64 {
        self.operations.iter().map(|op| op.file.size).sum()
    }

    /// Top-level directories under the root that operations write into.
    pub fn categories_used(&self) -> BTreeSet<String> {
        self.operations
            .iter()
            .map(|op| &op.destination)
            .chain(self.directory_operations.iter().map(|op| &op.destination))
            .filter_map(|dest| dest.strip_prefix(&self.root).ok())
            .filter_map(|rel| match rel.components().next() {
                Some(Component::Normal(name)) => Some(name.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect()
    }

    /// Whether there is nothing to do.
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty() && self.directory_operations.is_empty()
    }
}

/// A file move that did not complete.
#[derive(Debug, Clone)]
pub struct FailedOperation {
    /// The operation as it was attempted.
    pub operation: MoveOperation,
    /// What went wrong.
    pub error: String,
}

/// A directory move that did not complete.
#[derive(Debug, Clone)]
pub struct FailedDirectoryOperation {
    /// The operation as it was attempted.
    pub operation: DirectoryMoveOperation,
    /// What went wrong.
    pub error: String,
}

/// Outcome of executing (or simulating) a plan.
#[derive(Debug, Clone)]
pub struct OrganizationResult {
    /// The plan that was executed.
    pub plan: OrganizationPlan,
    /// File moves that completed, with their final destinations.
    pub succeeded: Vec<MoveOperation>,
    /// File moves that failed.
    pub failed: Vec<FailedOperation>,
    /// Directory moves that completed, with their final destinations.
    pub directories_moved: Vec<DirectoryMoveOperation>,
    /// Directory moves that failed.
    pub directories_failed: Vec<FailedDirectoryOperation>,
    /// Directories created while executing.
    pub directories_created: Vec<PathBuf>,
    /// Empty directories removed during cleanup.
    pub directories_removed: Vec<PathBuf>,
    /// Operation log written for this run, if any.
    pub log_file: Option<PathBuf>,
    /// When execution began.
    pub started: DateTime<Local>,
    /// When execution finished.
    pub completed: Option<DateTime<Local>>,
    /// Whether the filesystem was left untouched.
    pub dry_run: bool,
}

impl OrganizationResult {
    /// Start a result for `plan`.
    pub fn new(plan: OrganizationPlan, dry_run: bool) -> Self {
        Self {
            plan,
            succeeded: Vec::new(),
            failed: Vec::new(),
            directories_moved: Vec::new(),
            directories_failed: Vec::new(),
            directories_created: Vec::new(),
            directories_removed: Vec::new(),
            log_file: None,
            started: Local::now(),
            completed: None,
            dry_run,
        }
    }

    /// Record the completion time.
    pub fn mark_complete(&mut self) {
        self.completed = Some(Local::now());
    }

    /// Files moved successfully.
    pub fn files_moved(&self) -> usize {
        self.succeeded.len()
    }

    /// File operations that failed.
    pub fn files_failed(&self) -> usize {
        self.failed.len()
    }

    /// Operations attempted, files and directories.
    pub fn total_attempted(&self) -> usize {
        self.succeeded.len()
            + self.failed.len()
            + self.directories_moved.len()
            + self.directories_failed.len()
    }

    /// Operations that failed, files and directories.
    pub fn total_failed(&self) -> usize {
        self.failed.len() + self.directories_failed.len()
    }

    /// Percentage of attempted operations that succeeded.
    pub fn success_rate(&self) -> f64 {
        let total = self.total_attempted();
        if total == 0 {
            return 100.0;
        }
        (total - self.total_failed()) as f64 / total as f64 * 100.0
    }

    /// Wall-clock execution time, once complete.
    pub fn duration(&self) -> Option<Duration> {
        self.completed
            .and_then(|end| (end - self.started).to_std().ok())
    }

    /// Whether no operation of either kind failed.
    pub fn is_complete_success(&self) -> bool {
        self.total_failed() == 0
    }
}
