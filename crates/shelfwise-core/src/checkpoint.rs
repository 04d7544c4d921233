//! Resumable progress state.

use std::collections::BTreeSet;
use std::path::PathBuf;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::file::Fingerprint;

/// Format version written into checkpoint files.
pub const CHECKPOINT_VERSION: &str = "1.0";

/// Stage a long-running organize reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Phase {
    #[default]
    Analysis,
    Planning,
    Execution,
    Cleanup,
}

/// Snapshot of an interrupted run, persisted as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub version: String,
    pub timestamp: DateTime<Local>,
    pub root_dir: PathBuf,
    pub total_operations: usize,
    pub completed_operations: usize,
    pub failed_operations: usize,
    pub completed_hashes: BTreeSet<Fingerprint>,
    pub current_phase: Phase,
}

impl Checkpoint {
    /// Start a checkpoint for `root_dir`.
    pub fn new(root_dir: impl Into<PathBuf>, total_operations: usize) -> Self {
        Self {
            version: CHECKPOINT_VERSION.to_string(),
            timestamp: Local::now(),
            root_dir: root_dir.into(),
            total_operations,
            completed_operations: 0,
            failed_operations: 0,
            completed_hashes: BTreeSet::new(),
            current_phase: Phase::default(),
        }
    }

    /// Record a file as handled.
    pub fn mark_completed(&mut self, fingerprint: Fingerprint) {
        if self.completed_hashes.insert(fingerprint) {
            self.completed_operations += 1;
        }
    }

    /// Record a failed operation.
    pub fn mark_failed(&mut self) {
        self.failed_operations += 1;
    }

    /// Move to another phase.
    pub fn set_phase(&mut self, phase: Phase) {
        self.current_phase = phase;
    }

    /// Whether a file with this fingerprint was already handled.
    pub fn should_skip(&self, fingerprint: &Fingerprint) -> bool {
        self.completed_hashes.contains(fingerprint)
    }

    /// Completed share of the total, as a percentage.
    pub fn progress_percent(&self) -> f64 {
        if self.total_operations == 0 {
            return 0.0;
        }
        self.completed_operations as f64 / self.total_operations as f64 * 100.0
    }
}
