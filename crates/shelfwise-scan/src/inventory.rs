//! Turning scanned paths into fingerprinted file snapshots.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;

use shelfwise_core::{FileInfo, ScanWarning};

use crate::hasher::ContentHasher;

/// Fingerprinted files plus the paths that could not be read.
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    /// One snapshot per readable file, in scan order.
    pub files: Vec<Arc<FileInfo>>,
    /// Files dropped because they could not be stat'ed or hashed.
    pub errors: Vec<ScanWarning>,
}

impl Inventory {
    /// Total bytes across all snapshots.
    pub fn total_size(&self) -> u64 {
        self.files.iter().map(|f| f.size).sum()
    }
}

/// Stat and fingerprint every path.
///
/// `workers` enables parallel hashing; `progress` receives (hashed, total).
pub fn build_inventory<F>(
    paths: &[PathBuf],
    hasher: &ContentHasher,
    workers: Option<usize>,
    progress: F,
) -> Inventory
where
    F: Fn(usize, usize) + Sync,
{
    let mut inventory = Inventory::default();
    let mut stats = Vec::with_capacity(paths.len());

    for path in paths {
        let is_symlink = fs::symlink_metadata(path)
            .map(|m| m.file_type().is_symlink())
            .unwrap_or(false);
        match fs::metadata(path) {
            Ok(meta) => {
                let modified = meta.modified().unwrap_or(std::time::UNIX_EPOCH);
                stats.push((path.clone(), meta.len(), modified, is_symlink));
            }
            Err(err) => inventory.errors.push(ScanWarning::metadata_error(path, &err)),
        }
    }

    let to_hash: Vec<PathBuf> = stats.iter().map(|(p, ..)| p.clone()).collect();
    let fingerprints = hasher.hash_many(&to_hash, workers, progress);

    for ((path, size, modified, is_symlink), fingerprint) in stats.into_iter().zip(fingerprints) {
        match fingerprint {
            Some(fp) => inventory
                .files
                .push(Arc::new(FileInfo::new(path, size, fp, modified, is_symlink))),
            None => inventory.errors.push(ScanWarning::hash_error(path)),
        }
    }

    debug!(
        files = inventory.files.len(),
        errors = inventory.errors.len(),
        algorithm = %hasher.algorithm(),
        "inventory built"
    );
    inventory
}
