//! Groups of files sharing a fingerprint.

use std::cmp::Ordering;
use std::sync::Arc;

use crate::error::ModelError;
use crate::file::{FileInfo, Fingerprint};

/// Files with identical (or, for similarity sets, near-identical) content.
///
/// Exactly one member is the primary. It is chosen by shortest path string,
/// then earliest modification time, then lexical path order, so the choice
/// does not depend on the order files were supplied in. Members already
/// isolated by an earlier run rank after all others.
#[derive(Debug, Clone)]
pub struct DuplicateSet {
    fingerprint: Fingerprint,
    files: Vec<Arc<FileInfo>>,
    primary: usize,
}

impl DuplicateSet {
    /// Build a set and select its primary.
    pub fn new(fingerprint: Fingerprint, files: Vec<Arc<FileInfo>>) -> Result<Self, ModelError> {
        Self::with_isolated(fingerprint, files, |_| false)
    }

    /// Build a set where members matching `is_isolated` are only chosen as
    /// primary when no other member exists.
    pub fn with_isolated(
        fingerprint: Fingerprint,
        files: Vec<Arc<FileInfo>>,
        is_isolated: impl Fn(&FileInfo) -> bool,
    ) -> Result<Self, ModelError> {
        let primary = files
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                is_isolated(a)
                    .cmp(&is_isolated(b))
                    .then_with(|| primary_order(a, b))
            })
            .map(|(i, _)| i)
            .ok_or_else(|| ModelError::EmptyDuplicateSet {
                fingerprint: fingerprint.to_string(),
            })?;

        Ok(Self {
            fingerprint,
            files,
            primary,
        })
    }

    /// Fingerprint shared by the set.
    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    /// All members, in the order supplied.
    pub fn files(&self) -> &[Arc<FileInfo>] {
        &self.files
    }

    /// The member that is kept and classified normally.
    pub fn primary(&self) -> &Arc<FileInfo> {
        &self.files[self.primary]
    }

    /// Every member except the primary.
    pub fn extras(&self) -> impl Iterator<Item = &Arc<FileInfo>> {
        let primary = self.primary;
        self.files
            .iter()
            .enumerate()
            .filter(move |(i, _)| *i != primary)
            .map(|(_, f)| f)
    }

    /// Number of members.
    pub fn count(&self) -> usize {
        self.files.len()
    }

    /// Size of each member in bytes.
    pub fn size(&self) -> u64 {
        self.primary().size
    }

    /// Bytes recoverable by keeping only the primary.
    pub fn space_wasted(&self) -> u64 {
        self.size() * (self.count() as u64 - 1)
    }
}

fn primary_order(a: &FileInfo, b: &FileInfo) -> Ordering {
    let a_path = a.path.to_string_lossy();
    let b_path = b.path.to_string_lossy();
    a_path
        .len()
        .cmp(&b_path.len())
        .then_with(|| a.modified.cmp(&b.modified))
        .then_with(|| a_path.cmp(&b_path))
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, SystemTime};

    use super::*;

    fn file(path: &str, age_secs: u64) -> Arc<FileInfo> {
        let modified = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000 - age_secs);
        Arc::new(FileInfo::new(path, 100, "abc".into(), modified, false))
    }

    #[test]
    fn test_empty_set_is_error() {
        let err = DuplicateSet::new("abc".into(), Vec::new()).unwrap_err();
        assert!(matches!(err, ModelError::EmptyDuplicateSet { .. }));
    }

    #[test]
    fn test_single_file_has_no_extras() {
        let set = DuplicateSet::new("abc".into(), vec![file("/r/a.txt", 0)]).unwrap();
        assert_eq!(set.extras().count(), 0);
        assert_eq!(set.space_wasted(), 0);
    }

    #[test]
    fn test_primary_shortest_path_then_oldest() {
        let files = vec![
            file("/r/longer_name.txt", 500),
            file("/r/bb.txt", 10),
            file("/r/aa.txt", 20),
        ];
        let set = DuplicateSet::new("abc".into(), files.clone()).unwrap();
        assert_eq!(set.primary().path.to_str(), Some("/r/aa.txt"));
        assert_eq!(set.extras().count(), 2);

        let mut reversed = files;
        reversed.reverse();
        let set = DuplicateSet::new("abc".into(), reversed).unwrap();
        assert_eq!(set.primary().path.to_str(), Some("/r/aa.txt"));
    }

    #[test]
    fn test_isolated_members_rank_last() {
        let files = vec![
            file("/r/all_Pics/Photos/aa.jpg", 0),
            file("/r/all_Duplicates/b.jpg", 0),
        ];
        let set = DuplicateSet::with_isolated("abc".into(), files, |f| {
            f.path.starts_with("/r/all_Duplicates")
        })
        .unwrap();
        assert_eq!(set.primary().path.to_str(), Some("/r/all_Pics/Photos/aa.jpg"));
    }

    #[test]
    fn test_space_wasted() {
        let files = vec![file("/r/a", 0), file("/r/b", 0), file("/r/c", 0)];
        let set = DuplicateSet::new("abc".into(), files).unwrap();
        assert_eq!(set.space_wasted(), 200);
    }
}
