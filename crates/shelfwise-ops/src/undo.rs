//! Replaying an operation log backwards.

use std::cmp::Reverse;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::ExecuteError;
use crate::move_op::{move_path, occupied};
use crate::oplog::{LogEntry, OperationLog};

/// Outcome of an undo.
#[derive(Debug, Clone, Default)]
pub struct UndoReport {
    /// Entries moved back to their source.
    pub restored: Vec<LogEntry>,
    /// Entries that could not be restored, with the reason.
    pub failed: Vec<(LogEntry, String)>,
    /// Run-created directories removed because they were empty.
    pub directories_removed: Vec<PathBuf>,
}

impl UndoReport {
    pub fn succeeded(&self) -> usize {
        self.restored.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    pub fn is_complete_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Move every logged item back, newest first.
///
/// An entry whose destination is gone, or whose source location is taken
/// again, counts as a failure and the replay continues. Entries that were
/// never committed are restored only if the move evidently happened.
pub fn undo_log(log_path: &Path) -> Result<UndoReport, ExecuteError> {
    let log = OperationLog::load(log_path)?;
    let mut report = UndoReport::default();

    for entry in log.operations.iter().rev() {
        if !entry.committed && !(occupied(&entry.destination) && !occupied(&entry.source)) {
            debug!(source = %entry.source.display(), "skipping move that never happened");
            continue;
        }

        match restore(entry) {
            Ok(()) => {
                debug!(
                    from = %entry.destination.display(),
                    to = %entry.source.display(),
                    "restored"
                );
                report.restored.push(entry.clone());
            }
            Err(reason) => {
                warn!(path = %entry.destination.display(), %reason, "undo failed");
                report.failed.push((entry.clone(), reason));
            }
        }
    }

    report.directories_removed = remove_empty_dirs(&log.directories_created);

    info!(
        restored = report.succeeded(),
        failed = report.failed_count(),
        log = %log_path.display(),
        "undo finished"
    );
    Ok(report)
}

fn restore(entry: &LogEntry) -> Result<(), String> {
    if !occupied(&entry.destination) {
        return Err(format!(
            "Destination no longer exists: {}",
            entry.destination.display()
        ));
    }
    if occupied(&entry.source) {
        return Err(format!(
            "Original location is occupied: {}",
            entry.source.display()
        ));
    }
    if let Some(parent) = entry.source.parent() {
        fs::create_dir_all(parent)
            .map_err(|err| format!("Cannot create {}: {err}", parent.display()))?;
    }
    move_path(&entry.destination, &entry.source).map_err(|err| err.to_string())
}

/// Remove the listed directories that are now empty, deepest first.
fn remove_empty_dirs(dirs: &[PathBuf]) -> Vec<PathBuf> {
    let mut dirs: Vec<&PathBuf> = dirs.iter().collect();
    dirs.sort_by_key(|d| (Reverse(d.components().count()), *d));
    dirs.dedup();

    dirs.into_iter()
        .filter(|dir| is_empty_dir(dir) && fs::remove_dir(dir).is_ok())
        .cloned()
        .collect()
}

pub(crate) fn is_empty_dir(path: &Path) -> bool {
    fs::read_dir(path)
        .map(|mut entries| entries.next().is_none())
        .unwrap_or(false)
}
