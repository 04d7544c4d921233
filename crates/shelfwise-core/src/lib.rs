//! Core types for shelfwise.
//!
//! This crate provides the data model shared by every stage of an
//! organize run: scanned file snapshots, duplicate sets, planned moves,
//! plans and results, checkpoints, and configuration.

mod checkpoint;
mod config;
mod duplicate;
mod error;
mod file;
mod operation;
pub mod paths;
mod plan;
mod rules;

pub use checkpoint::{CHECKPOINT_VERSION, Checkpoint, Phase};
pub use config::{
    CONFIG_FILE_NAME, ConflictPolicy, HashAlgorithm, OrganizeConfig, OrganizeConfigBuilder,
    Strategy,
};
pub use duplicate::DuplicateSet;
pub use error::{ConfigError, ModelError, ScanError, ScanWarning, WarningKind};
pub use file::{Classification, FileInfo, Fingerprint, extension_of};
pub use operation::{DirectoryMoveOperation, MoveOperation, MoveReason};
pub use plan::{FailedDirectoryOperation, FailedOperation, OrganizationPlan, OrganizationResult};
pub use rules::ClassificationRules;
