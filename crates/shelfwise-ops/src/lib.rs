//! Plan execution for shelfwise.
//!
//! This crate carries out an [`OrganizationPlan`]: it moves files and
//! directories with conflict resolution, writes an operation log that
//! [`Executor::undo`] can replay backwards, optionally re-hashes moved
//! files, and removes directories left empty inside managed buckets.
//! It also persists checkpoints and renders JSON reports.
//!
//! [`OrganizationPlan`]: shelfwise_core::OrganizationPlan

mod checkpoint;
mod conflict;
mod error;
mod executor;
mod move_op;
mod oplog;
mod progress;
mod report;
mod undo;

pub use checkpoint::{CheckpointManager, CheckpointRecorder};
pub use conflict::{Conflict, ConflictChoice, ConflictKind, ConflictPrompt, FixedChoice};
pub use error::{CheckpointError, ExecuteError, ReportError};
pub use executor::{ExecuteOptions, Executor};
pub use oplog::{EntryKind, LOG_VERSION, LogEntry, OperationLog};
pub use progress::{ExecuteProgress, OperationType};
pub use report::{
    DirectoriesSection, DirectoryMove, DirectoryOperationsSection, DuplicateSetEntry,
    DuplicateSummary, ExecutionReport, FailedMove, OperationsSection, REPORT_VERSION, Summary,
    SuccessfulMove,
};
pub use undo::{UndoReport, undo_log};
