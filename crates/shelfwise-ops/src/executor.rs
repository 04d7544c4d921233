//! Carrying out an organization plan.

use std::cmp::Reverse;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use jwalk::WalkDir;
use tracing::{debug, info, warn};

use shelfwise_core::paths::unique_path;
use shelfwise_core::{
    ConflictPolicy, DirectoryMoveOperation, FailedDirectoryOperation, FailedOperation,
    MoveOperation, OrganizationPlan, OrganizationResult, OrganizeConfig,
};
use shelfwise_scan::ContentHasher;

use crate::conflict::{Conflict, ConflictChoice, ConflictKind, ConflictPrompt};
use crate::error::ExecuteError;
use crate::move_op::{move_path, occupied};
use crate::oplog::{EntryKind, LogWriter};
use crate::progress::{ExecuteProgress, OperationType};
use crate::undo::{UndoReport, is_empty_dir, undo_log};

/// Settings for one executor.
#[derive(Debug, Clone)]
pub struct ExecuteOptions {
    /// Decide everything, touch nothing.
    pub dry_run: bool,
    /// Re-hash each moved file and compare with its planned fingerprint.
    pub verify_integrity: bool,
    /// Write an operation log for undo.
    pub write_log: bool,
    /// Directory under the root holding logs.
    pub log_directory: String,
    /// Prefix marking managed top-level directories.
    pub directory_prefix: String,
    /// Full name of the folders bucket, left alone by cleanup.
    pub folders_dir: String,
}

impl ExecuteOptions {
    pub fn from_config(config: &OrganizeConfig, dry_run: bool) -> Self {
        Self {
            dry_run,
            verify_integrity: config.verify_integrity,
            write_log: true,
            log_directory: config.log_directory.clone(),
            directory_prefix: config.directory_prefix.clone(),
            folders_dir: config.folders_dir_name(),
        }
    }
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self::from_config(&OrganizeConfig::default(), false)
    }
}

/// Executes plans one operation at a time.
///
/// A failing operation is recorded in the result and the run continues.
/// Integrity checks must use the same hash algorithm the plan was built with.
pub struct Executor {
    options: ExecuteOptions,
    hasher: ContentHasher,
    prompt: Option<Arc<dyn ConflictPrompt>>,
}

impl std::fmt::Debug for Executor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor")
            .field("options", &self.options)
            .field("hasher", &self.hasher)
            .field("prompt", &self.prompt.is_some())
            .finish()
    }
}

impl Executor {
    pub fn new(options: ExecuteOptions, hasher: ContentHasher) -> Self {
        Self {
            options,
            hasher,
            prompt: None,
        }
    }

    pub fn from_config(config: &OrganizeConfig, dry_run: bool) -> Self {
        Self::new(
            ExecuteOptions::from_config(config, dry_run),
            ContentHasher::from_config(config),
        )
    }

    /// Answer `ask` conflicts with `prompt` instead of renaming.
    pub fn with_prompt(mut self, prompt: Arc<dyn ConflictPrompt>) -> Self {
        self.prompt = Some(prompt);
        self
    }

    pub fn options(&self) -> &ExecuteOptions {
        &self.options
    }

    pub fn is_dry_run(&self) -> bool {
        self.options.dry_run
    }

    pub fn execute(&self, plan: OrganizationPlan) -> OrganizationResult {
        self.execute_with_progress(plan, |_| {})
    }

    /// Run every file operation, then every directory operation, then
    /// remove empty directories inside managed buckets.
    pub fn execute_with_progress<F>(&self, plan: OrganizationPlan, mut progress: F) -> OrganizationResult
    where
        F: FnMut(&ExecuteProgress),
    {
        let dry_run = self.options.dry_run;
        let root = plan.root.clone();
        let operations = plan.operations.clone();
        let directory_operations = plan.directory_operations.clone();

        let mut tracker = ExecuteProgress::new(
            operations.len() + directory_operations.len(),
            plan.total_bytes(),
            dry_run,
        );
        let mut state = RunState {
            log: (!dry_run && self.options.write_log)
                .then(|| LogWriter::new(&root, &self.options.log_directory)),
            ..RunState::default()
        };
        let mut result = OrganizationResult::new(plan, dry_run);

        info!(
            root = %root.display(),
            files = operations.len(),
            directories = directory_operations.len(),
            dry_run,
            "executing plan"
        );

        for op in &operations {
            tracker.start(OperationType::MoveFile, op.source.clone());
            match self.move_file(op, &mut state, &mut result.directories_created) {
                Ok(destination) => {
                    tracker.succeed(op.file.size, Some(op.file.fingerprint.clone()));
                    result.succeeded.push(op.with_destination(destination));
                }
                Err(err) => {
                    warn!(source = %op.source.display(), error = %err, "file operation failed");
                    tracker.fail();
                    result.failed.push(FailedOperation {
                        operation: op.clone(),
                        error: err.to_string(),
                    });
                }
            }
            progress(&tracker);
        }

        for op in &directory_operations {
            tracker.start(OperationType::MoveDirectory, op.source.clone());
            match self.move_directory(op, &mut state, &mut result.directories_created) {
                Ok(destination) => {
                    tracker.succeed(0, None);
                    result.directories_moved.push(op.with_destination(destination));
                }
                Err(err) => {
                    warn!(source = %op.source.display(), error = %err, "directory operation failed");
                    tracker.fail();
                    result.directories_failed.push(FailedDirectoryOperation {
                        operation: op.clone(),
                        error: err.to_string(),
                    });
                }
            }
            progress(&tracker);
        }

        tracker.start(OperationType::Cleanup, root.clone());
        progress(&tracker);
        result.directories_removed = self.cleanup(&root, &state);

        if let Some(log) = state.log.take() {
            match log.finish() {
                Ok(path) => result.log_file = path,
                Err(err) => warn!(error = %err, "operation log could not be finalized"),
            }
        }

        result.mark_complete();
        info!(
            moved = result.files_moved(),
            failed = result.files_failed(),
            directories_moved = result.directories_moved.len(),
            directories_failed = result.directories_failed.len(),
            dry_run,
            "execution finished"
        );
        result
    }

    /// Replay an operation log backwards.
    pub fn undo(&self, log_path: &Path) -> Result<UndoReport, ExecuteError> {
        if self.options.dry_run {
            return Err(ExecuteError::UndoInDryRun);
        }
        undo_log(log_path)
    }

    fn move_file(
        &self,
        op: &MoveOperation,
        state: &mut RunState,
        created: &mut Vec<PathBuf>,
    ) -> Result<PathBuf, ExecuteError> {
        if !state.is_occupied(&op.source) {
            return Err(ExecuteError::SourceMissing {
                path: op.source.clone(),
            });
        }
        if let Some(parent) = op.destination.parent() {
            self.ensure_dir(parent, state, created)?;
        }
        let destination = self.resolve(&op.source, &op.destination, op.policy, false, state)?;

        if self.options.dry_run {
            info!(
                source = %op.source.display(),
                destination = %destination.display(),
                "dry run: would move file"
            );
            state.simulate_move(&op.source, &destination);
            return Ok(destination);
        }

        self.relocate(&op.source, &destination, EntryKind::File, state)?;
        if self.options.verify_integrity {
            self.verify(&destination, op)?;
        }
        debug!(
            source = %op.source.display(),
            destination = %destination.display(),
            "moved file"
        );
        Ok(destination)
    }

    fn move_directory(
        &self,
        op: &DirectoryMoveOperation,
        state: &mut RunState,
        created: &mut Vec<PathBuf>,
    ) -> Result<PathBuf, ExecuteError> {
        if !state.is_occupied(&op.source) {
            return Err(ExecuteError::SourceMissing {
                path: op.source.clone(),
            });
        }
        if let Some(parent) = op.destination.parent() {
            self.ensure_dir(parent, state, created)?;
        }
        let destination = self.resolve(&op.source, &op.destination, op.policy, true, state)?;

        if self.options.dry_run {
            info!(
                source = %op.source.display(),
                destination = %destination.display(),
                "dry run: would move directory"
            );
            state.simulate_move(&op.source, &destination);
            return Ok(destination);
        }

        self.relocate(&op.source, &destination, EntryKind::Directory, state)?;
        debug!(
            source = %op.source.display(),
            destination = %destination.display(),
            "moved directory"
        );
        Ok(destination)
    }

    /// Create `dir` and any missing ancestors, recording each one.
    fn ensure_dir(
        &self,
        dir: &Path,
        state: &mut RunState,
        created: &mut Vec<PathBuf>,
    ) -> Result<(), ExecuteError> {
        let missing: Vec<PathBuf> = dir
            .ancestors()
            .take_while(|p| !p.as_os_str().is_empty() && !state.is_occupied(p))
            .map(Path::to_path_buf)
            .collect();
        if missing.is_empty() {
            return Ok(());
        }

        if !self.options.dry_run {
            fs::create_dir_all(dir).map_err(|source| ExecuteError::CreateDirectory {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        for path in missing.into_iter().rev() {
            if self.options.dry_run {
                state.dirs_created.insert(path.clone());
            } else if let Some(log) = state.log.as_mut() {
                log.record_directory(&path);
            }
            debug!(path = %path.display(), "created directory");
            created.push(path);
        }
        Ok(())
    }

    /// Apply the conflict policy against the destination as it is now.
    fn resolve(
        &self,
        source: &Path,
        destination: &Path,
        policy: ConflictPolicy,
        is_dir: bool,
        state: &RunState,
    ) -> Result<PathBuf, ExecuteError> {
        if !state.is_occupied(destination) {
            return Ok(destination.to_path_buf());
        }

        let kind = if destination.is_dir() || state.dirs_created.contains(destination) {
            ConflictKind::DirectoryExists
        } else {
            ConflictKind::FileExists
        };
        let choice = match policy {
            ConflictPolicy::Rename => ConflictChoice::Rename,
            ConflictPolicy::Skip => ConflictChoice::Skip,
            ConflictPolicy::Overwrite => ConflictChoice::Overwrite,
            ConflictPolicy::Ask => match &self.prompt {
                Some(prompt) => prompt.choose(&Conflict::new(
                    source.to_path_buf(),
                    destination.to_path_buf(),
                    kind,
                )),
                None => ConflictChoice::Rename,
            },
        };

        match choice {
            ConflictChoice::Rename => {
                let renamed = unique_path(destination, |p| state.is_occupied(p));
                info!(
                    destination = %destination.display(),
                    renamed = %renamed.display(),
                    "{kind}, renaming"
                );
                Ok(renamed)
            }
            ConflictChoice::Skip => Err(ExecuteError::DestinationExists {
                path: destination.to_path_buf(),
            }),
            ConflictChoice::Overwrite => {
                self.replace(destination, kind, is_dir)?;
                Ok(destination.to_path_buf())
            }
        }
    }

    fn replace(&self, destination: &Path, kind: ConflictKind, is_dir: bool) -> Result<(), ExecuteError> {
        let overwrite_error = |reason: String| ExecuteError::Overwrite {
            path: destination.to_path_buf(),
            reason,
        };
        match (kind, is_dir) {
            (ConflictKind::DirectoryExists, false) => {
                return Err(overwrite_error("destination is a directory".into()));
            }
            (ConflictKind::FileExists, true) => {
                return Err(overwrite_error("destination is not a directory".into()));
            }
            _ => {}
        }

        if self.options.dry_run {
            info!(path = %destination.display(), "dry run: would overwrite");
            return Ok(());
        }
        let removed = if is_dir {
            fs::remove_dir_all(destination)
        } else {
            fs::remove_file(destination)
        };
        removed.map_err(|err| overwrite_error(err.to_string()))?;
        warn!(path = %destination.display(), "overwrote existing item");
        Ok(())
    }

    /// Log, move, then mark the log entry committed.
    fn relocate(
        &self,
        source: &Path,
        destination: &Path,
        kind: EntryKind,
        state: &mut RunState,
    ) -> Result<(), ExecuteError> {
        let entry = match state.log.as_mut() {
            Some(log) => Some(log.begin(source, destination, kind)?),
            None => None,
        };

        if let Err(err) = move_path(source, destination) {
            if let (Some(log), Some(index)) = (state.log.as_mut(), entry) {
                if let Err(log_err) = log.abort(index) {
                    warn!(error = %log_err, "could not drop failed move from the log");
                }
            }
            return Err(ExecuteError::io(source, destination, err));
        }

        if let (Some(log), Some(index)) = (state.log.as_mut(), entry) {
            if let Err(err) = log.commit(index) {
                warn!(error = %err, "could not mark move as committed");
            }
        }
        Ok(())
    }

    fn verify(&self, path: &Path, op: &MoveOperation) -> Result<(), ExecuteError> {
        let actual = self
            .hasher
            .try_hash_file(path)
            .map_err(|source| ExecuteError::Hash {
                path: path.to_path_buf(),
                source,
            })?;
        if actual != op.file.fingerprint {
            return Err(ExecuteError::IntegrityMismatch {
                path: path.to_path_buf(),
                expected: op.file.fingerprint.to_string(),
                actual: actual.to_string(),
            });
        }
        Ok(())
    }

    /// Remove empty directories inside managed buckets, deepest first.
    ///
    /// The root, unmanaged directories, hidden directories and the folders
    /// bucket's contents are never touched. A dry run reports the
    /// directories the simulated moves would leave empty.
    fn cleanup(&self, root: &Path, state: &RunState) -> Vec<PathBuf> {
        let Ok(entries) = fs::read_dir(root) else {
            return Vec::new();
        };

        let mut dirs = Vec::new();
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().into_owned();
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            if !is_dir || !name.starts_with(&self.options.directory_prefix) {
                continue;
            }
            if name == self.options.folders_dir {
                dirs.push(entry.path());
                continue;
            }
            dirs.extend(
                WalkDir::new(entry.path())
                    .skip_hidden(true)
                    .follow_links(false)
                    .into_iter()
                    .flatten()
                    .filter(|e| e.file_type().is_dir())
                    .map(|e| e.path()),
            );
        }
        dirs.sort_by_key(|d| Reverse(d.components().count()));

        if self.options.dry_run {
            let mut removed = HashSet::new();
            for dir in dirs {
                if state.would_be_empty(&dir, &removed) {
                    removed.insert(dir);
                }
            }
            let mut removed: Vec<PathBuf> = removed.into_iter().collect();
            removed.sort_by(|a, b| {
                Reverse(a.components().count())
                    .cmp(&Reverse(b.components().count()))
                    .then_with(|| a.cmp(b))
            });
            if !removed.is_empty() {
                info!(count = removed.len(), "dry run: would remove empty directories");
            }
            return removed;
        }

        let removed: Vec<PathBuf> = dirs
            .into_iter()
            .filter(|dir| is_empty_dir(dir) && fs::remove_dir(dir).is_ok())
            .collect();
        if !removed.is_empty() {
            info!(count = removed.len(), "removed empty directories");
        }
        removed
    }
}

/// Mutable state for one run.
#[derive(Debug, Default)]
struct RunState {
    log: Option<LogWriter>,
    // dry run: what simulated moves filled and emptied
    arrived: HashSet<PathBuf>,
    departed: HashSet<PathBuf>,
    dirs_created: HashSet<PathBuf>,
}

impl RunState {
    fn is_occupied(&self, path: &Path) -> bool {
        if self.arrived.contains(path) || self.dirs_created.contains(path) {
            return true;
        }
        if self.departed.contains(path) {
            return false;
        }
        occupied(path)
    }

    /// Whether `dir` holds nothing once the simulated moves and the
    /// removals in `removed` have happened.
    fn would_be_empty(&self, dir: &Path, removed: &HashSet<PathBuf>) -> bool {
        if self
            .arrived
            .iter()
            .chain(&self.dirs_created)
            .any(|p| p.parent() == Some(dir))
        {
            return false;
        }
        match fs::read_dir(dir) {
            Ok(entries) => entries.flatten().all(|entry| {
                let path = entry.path();
                self.departed.contains(&path) || removed.contains(&path)
            }),
            Err(_) => false,
        }
    }

    fn simulate_move(&mut self, from: &Path, to: &Path) {
        self.arrived.remove(from);
        self.departed.insert(from.to_path_buf());
        self.departed.remove(to);
        self.arrived.insert(to.to_path_buf());
    }
}
