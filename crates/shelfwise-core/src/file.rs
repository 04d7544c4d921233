//! Scanned file snapshots and classification results.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use compact_str::CompactString;
use serde::{Deserialize, Serialize};

/// Content fingerprint, stored as a lower-case hex digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Wrap an already-formatted digest string.
    pub fn new(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    /// Build a fingerprint from raw digest bytes.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(bytes.iter().map(|b| format!("{b:02x}")).collect())
    }

    /// Get the digest as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Fingerprint {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Immutable snapshot of one file taken during a scan.
///
/// Two snapshots compare equal when their fingerprints match, regardless of
/// path. Use [`FileInfo::path`] when location matters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileInfo {
    /// Absolute path at scan time.
    pub path: PathBuf,
    /// Size in bytes.
    pub size: u64,
    /// Content fingerprint.
    pub fingerprint: Fingerprint,
    /// Last modification time.
    pub modified: SystemTime,
    /// Whether the path itself is a symbolic link.
    pub is_symlink: bool,
}

impl FileInfo {
    /// Create a new snapshot.
    pub fn new(
        path: impl Into<PathBuf>,
        size: u64,
        fingerprint: Fingerprint,
        modified: SystemTime,
        is_symlink: bool,
    ) -> Self {
        Self {
            path: path.into(),
            size,
            fingerprint,
            modified,
            is_symlink,
        }
    }

    /// File name component, lossily converted.
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Lower-cased extension with a leading dot, or an empty string.
    pub fn extension(&self) -> String {
        extension_of(&self.path)
    }

    /// Whether two snapshots refer to the same location.
    pub fn same_path(&self, other: &FileInfo) -> bool {
        self.path == other.path
    }
}

impl PartialEq for FileInfo {
    fn eq(&self, other: &Self) -> bool {
        self.fingerprint == other.fingerprint
    }
}

impl Eq for FileInfo {}

impl Hash for FileInfo {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.fingerprint.hash(state);
    }
}

/// Lower-cased extension of a path with a leading dot.
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
        .unwrap_or_default()
}

/// The (category, subcategory) pair a file is sorted into.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Classification {
    /// Top-level category, e.g. `Docs`.
    pub category: CompactString,
    /// Bucket inside the category, e.g. `PDFs`.
    pub subcategory: CompactString,
}

impl Classification {
    /// Create a classification.
    pub fn new(category: impl Into<CompactString>, subcategory: impl Into<CompactString>) -> Self {
        Self {
            category: category.into(),
            subcategory: subcategory.into(),
        }
    }

    /// Catch-all used when nothing else matches.
    pub fn unsorted() -> Self {
        Self::new("Misc", "Unsorted")
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.category, self.subcategory)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_from_bytes() {
        let fp = Fingerprint::from_bytes(&[0xab, 0x01]);
        assert_eq!(fp.as_str(), "ab01");
    }

    #[test]
    fn test_file_info_equality_by_fingerprint() {
        let now = SystemTime::now();
        let a = FileInfo::new("/a/one.txt", 5, "abc".into(), now, false);
        let b = FileInfo::new("/b/two.txt", 5, "abc".into(), now, false);
        let c = FileInfo::new("/a/one.txt", 5, "def".into(), now, false);

        assert_eq!(a, b);
        assert!(!a.same_path(&b));
        assert_ne!(a, c);
        assert!(a.same_path(&c));
    }

    #[test]
    fn test_extension_lowercased() {
        let now = SystemTime::now();
        let f = FileInfo::new("/x/Report.PDF", 1, "f".into(), now, false);
        assert_eq!(f.extension(), ".pdf");
        assert_eq!(f.name(), "Report.PDF");

        let bare = FileInfo::new("/x/Makefile", 1, "f".into(), now, false);
        assert_eq!(bare.extension(), "");
    }
}
