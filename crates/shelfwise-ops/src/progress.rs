//! Progress reporting types for plan execution.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use shelfwise_core::Fingerprint;

/// The kind of work currently being performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationType {
    MoveFile,
    MoveDirectory,
    Cleanup,
}

impl std::fmt::Display for OperationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MoveFile => write!(f, "Move file"),
            Self::MoveDirectory => write!(f, "Move directory"),
            Self::Cleanup => write!(f, "Cleanup"),
        }
    }
}

/// Progress information handed to the execution callback.
#[derive(Debug, Clone)]
pub struct ExecuteProgress {
    /// What is being done.
    pub operation_type: OperationType,
    /// Operations finished so far, successful or not.
    pub completed: usize,
    /// Total operations in the plan.
    pub total: usize,
    /// Bytes moved so far.
    pub bytes_processed: u64,
    /// Total bytes the plan moves.
    pub bytes_total: u64,
    /// The path currently being processed.
    pub current: Option<PathBuf>,
    /// Failures so far.
    pub failures: usize,
    /// Whether this is a simulation.
    pub dry_run: bool,
    /// Fingerprint of the file the latest operation moved, if it moved one.
    pub moved: Option<Fingerprint>,
}

impl ExecuteProgress {
    pub(crate) fn new(total: usize, bytes_total: u64, dry_run: bool) -> Self {
        Self {
            operation_type: OperationType::MoveFile,
            completed: 0,
            total,
            bytes_processed: 0,
            bytes_total,
            current: None,
            failures: 0,
            dry_run,
            moved: None,
        }
    }

    /// Get the progress as a percentage (0.0 to 100.0).
    pub fn percentage(&self) -> f64 {
        if self.total > 0 {
            (self.completed as f64 / self.total as f64) * 100.0
        } else {
            100.0
        }
    }

    pub(crate) fn start(&mut self, operation_type: OperationType, path: PathBuf) {
        self.operation_type = operation_type;
        self.current = Some(path);
        self.moved = None;
    }

    pub(crate) fn succeed(&mut self, bytes: u64, moved: Option<Fingerprint>) {
        self.completed += 1;
        self.bytes_processed += bytes;
        self.moved = moved;
    }

    pub(crate) fn fail(&mut self) {
        self.completed += 1;
        self.failures += 1;
    }
}
