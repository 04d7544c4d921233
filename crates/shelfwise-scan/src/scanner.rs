//! Root-level scanner with recursive descent into managed directories.

use std::fs;
use std::path::{Path, PathBuf};

use jwalk::WalkDir;
use tracing::{debug, warn};

use shelfwise_core::paths::is_hidden;
use shelfwise_core::{OrganizeConfig, ScanError, ScanWarning, WarningKind};

use crate::ignore::IgnoreRules;

/// What a scan found directly under (and inside managed directories of) a root.
#[derive(Debug, Clone, Default)]
pub struct ScanOutcome {
    /// Canonical root that was scanned.
    pub root: PathBuf,
    /// Files eligible for classification.
    pub files: Vec<PathBuf>,
    /// Files and directories skipped by ignore or symlink rules.
    pub ignored: Vec<PathBuf>,
    /// Top-level directories without the managed prefix.
    pub directories: Vec<PathBuf>,
    /// Per-path problems that did not stop the scan.
    pub errors: Vec<ScanWarning>,
}

/// Scanner for one organize run.
///
/// Only the immediate children of the root are listed, except for
/// directories carrying the managed prefix, which are walked in full.
/// The folders bucket is the one managed directory that is never entered.
pub struct Scanner {
    ignore: IgnoreRules,
    directory_prefix: String,
    folders_dir: String,
    log_directory: String,
    follow_symlinks: bool,
    ignore_hidden: bool,
}

impl Scanner {
    /// Create a scanner from organizer settings.
    pub fn new(config: &OrganizeConfig) -> Self {
        Self {
            ignore: IgnoreRules::new(&config.ignore_patterns, config.ignore_hidden),
            directory_prefix: config.directory_prefix.clone(),
            folders_dir: config.folders_dir_name(),
            log_directory: config.log_directory.clone(),
            follow_symlinks: config.follow_symlinks,
            ignore_hidden: config.ignore_hidden,
        }
    }

    /// Scan `root`.
    ///
    /// Fails only when the root itself is missing, not a directory, or not
    /// listable; everything else is recorded in [`ScanOutcome::errors`].
    pub fn scan(&self, root: &Path) -> Result<ScanOutcome, ScanError> {
        let root = root.canonicalize().map_err(|e| ScanError::io(root, e))?;
        if !root.is_dir() {
            return Err(ScanError::NotADirectory { path: root });
        }

        let mut entries: Vec<_> = fs::read_dir(&root)
            .map_err(|e| ScanError::io(&root, e))?
            .collect();
        entries.sort_by_key(|e| e.as_ref().map(|e| e.file_name()).ok());

        let mut outcome = ScanOutcome {
            root: root.clone(),
            ..Default::default()
        };

        for entry in entries {
            let entry = match entry {
                Ok(e) => e,
                Err(err) => {
                    outcome.errors.push(ScanWarning::read_error(&root, &err));
                    continue;
                }
            };
            self.visit_top_level(&root, &entry.path(), &mut outcome);
        }

        debug!(
            root = %root.display(),
            files = outcome.files.len(),
            ignored = outcome.ignored.len(),
            directories = outcome.directories.len(),
            errors = outcome.errors.len(),
            "scan complete"
        );
        Ok(outcome)
    }

    fn visit_top_level(&self, root: &Path, path: &Path, outcome: &mut ScanOutcome) {
        let link_meta = match fs::symlink_metadata(path) {
            Ok(m) => m,
            Err(err) => {
                outcome.errors.push(ScanWarning::metadata_error(path, &err));
                return;
            }
        };

        let is_symlink = link_meta.file_type().is_symlink();
        if is_symlink && !self.follow_symlinks {
            outcome.ignored.push(path.to_path_buf());
            return;
        }

        let metadata = if is_symlink {
            match fs::metadata(path) {
                Ok(m) => m,
                Err(_) => {
                    let target = fs::read_link(path)
                        .map(|t| t.display().to_string())
                        .unwrap_or_default();
                    outcome.errors.push(ScanWarning::new(
                        path,
                        format!("Broken symlink: {} -> {target}", path.display()),
                        WarningKind::BrokenSymlink,
                    ));
                    return;
                }
            }
        } else {
            link_meta
        };

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        if metadata.is_dir() {
            // relocated folders keep their contents intact
            if name == self.log_directory || name == self.folders_dir {
                return;
            }
            if self.ignore.is_ignored(path, root) {
                outcome.ignored.push(path.to_path_buf());
                return;
            }
            if name.starts_with(&self.directory_prefix) {
                self.walk_managed(root, path, outcome);
            } else {
                outcome.directories.push(path.to_path_buf());
            }
        } else if metadata.is_file() {
            if self.ignore.is_ignored(path, root) {
                outcome.ignored.push(path.to_path_buf());
            } else {
                outcome.files.push(path.to_path_buf());
            }
        } else {
            outcome.ignored.push(path.to_path_buf());
        }
    }

    /// Collect every file beneath a managed directory.
    ///
    /// Hidden directories are reported as ignored and not descended into.
    fn walk_managed(&self, root: &Path, dir: &Path, outcome: &mut ScanOutcome) {
        let mut walker = WalkDir::new(dir)
            .skip_hidden(false)
            .follow_links(self.follow_symlinks)
            .sort(true)
            .min_depth(1);
        if self.ignore_hidden {
            walker = walker.process_read_dir(|_depth, _path, _state, children| {
                for child in children.iter_mut().flatten() {
                    if child.file_type.is_dir() && child.file_name.to_string_lossy().starts_with('.') {
                        child.read_children_path = None;
                    }
                }
            });
        }

        for entry_result in walker {
            let entry = match entry_result {
                Ok(e) => e,
                Err(err) => {
                    let path = err.path().map(|p| p.to_path_buf()).unwrap_or_else(|| dir.to_path_buf());
                    warn!(path = %path.display(), "walk error: {err}");
                    outcome
                        .errors
                        .push(ScanWarning::new(path, err.to_string(), WarningKind::ReadError));
                    continue;
                }
            };

            let path = entry.path();
            let file_type = entry.file_type();

            if file_type.is_dir() {
                if self.ignore_hidden && is_hidden(&path) {
                    outcome.ignored.push(path);
                }
                continue;
            }
            if file_type.is_symlink() || (entry.path_is_symlink() && !self.follow_symlinks) {
                outcome.ignored.push(path);
                continue;
            }
            if !file_type.is_file() {
                outcome.ignored.push(path);
                continue;
            }

            if self.ignore.is_ignored(&path, root) {
                outcome.ignored.push(path);
            } else {
                outcome.files.push(path);
            }
        }
    }
}
