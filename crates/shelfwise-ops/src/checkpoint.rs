//! Persisting checkpoints next to the operation logs.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use shelfwise_core::{Checkpoint, OrganizationResult, Phase};

use crate::error::CheckpointError;
use crate::oplog::write_atomic;
use crate::progress::ExecuteProgress;

const CHECKPOINT_FILE_NAME: &str = "checkpoint.json";

/// Reads and writes `<root>/<log_directory>/checkpoint.json`.
#[derive(Debug, Clone)]
pub struct CheckpointManager {
    path: PathBuf,
}

impl CheckpointManager {
    pub fn new(root: &Path, log_directory: &str) -> Self {
        Self {
            path: root.join(log_directory).join(CHECKPOINT_FILE_NAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    pub fn save(&self, checkpoint: &Checkpoint) -> Result<(), CheckpointError> {
        let json = serde_json::to_string_pretty(checkpoint)?;
        let write = |path: &Path| -> io::Result<()> {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            write_atomic(path, json.as_bytes())
        };
        write(&self.path).map_err(|source| CheckpointError::Write {
            path: self.path.clone(),
            source,
        })?;
        debug!(
            path = %self.path.display(),
            completed = checkpoint.completed_operations,
            "checkpoint saved"
        );
        Ok(())
    }

    /// The saved checkpoint. A missing or unreadable file yields `None`.
    pub fn load(&self) -> Option<Checkpoint> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return None,
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "cannot read checkpoint");
                return None;
            }
        };
        match serde_json::from_str(&text) {
            Ok(checkpoint) => Some(checkpoint),
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "ignoring corrupt checkpoint");
                None
            }
        }
    }

    pub fn clear(&self) -> Result<(), CheckpointError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(CheckpointError::Remove {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

/// Keeps a checkpoint on disk current while a plan executes.
///
/// Feed it every [`ExecuteProgress`] update. Moved fingerprints are saved
/// every `save_every` updates, so an interrupted run leaves a checkpoint
/// that skips what it already handled.
#[derive(Debug)]
pub struct CheckpointRecorder {
    manager: CheckpointManager,
    checkpoint: Checkpoint,
    save_every: usize,
    unsaved: usize,
    failures_seen: usize,
}

impl CheckpointRecorder {
    /// Updates between saves when no interval is given.
    pub const DEFAULT_SAVE_EVERY: usize = 25;

    /// Enter the execution phase and save right away.
    pub fn start(manager: CheckpointManager, mut checkpoint: Checkpoint, save_every: usize) -> Self {
        checkpoint.set_phase(Phase::Execution);
        let mut recorder = Self {
            manager,
            failures_seen: checkpoint.failed_operations,
            checkpoint,
            save_every: save_every.max(1),
            unsaved: 0,
        };
        recorder.persist();
        recorder
    }

    pub fn checkpoint(&self) -> &Checkpoint {
        &self.checkpoint
    }

    pub fn observe(&mut self, progress: &ExecuteProgress) {
        if let Some(fingerprint) = &progress.moved {
            self.checkpoint.mark_completed(fingerprint.clone());
            self.unsaved += 1;
        }
        while self.failures_seen < progress.failures {
            self.checkpoint.mark_failed();
            self.failures_seen += 1;
            self.unsaved += 1;
        }
        if self.unsaved >= self.save_every {
            self.persist();
        }
    }

    /// Drop the checkpoint after a clean run, otherwise save it for resuming.
    pub fn finish(mut self, result: &OrganizationResult) {
        if result.is_complete_success() {
            if let Err(err) = self.manager.clear() {
                warn!(error = %err, "could not remove checkpoint");
            }
            return;
        }
        for op in &result.succeeded {
            self.checkpoint.mark_completed(op.file.fingerprint.clone());
        }
        self.checkpoint.set_phase(Phase::Cleanup);
        self.persist();
    }

    fn persist(&mut self) {
        self.unsaved = 0;
        if let Err(err) = self.manager.save(&self.checkpoint) {
            warn!(error = %err, "could not save checkpoint");
        }
    }
}
