//! Fixed size-bucket strategy.

use shelfwise_core::{Classification, FileInfo};

use super::ClassifyStrategy;

const MIB: f64 = 1024.0 * 1024.0;

/// Sorts files into five size buckets.
#[derive(Debug, Clone, Copy, Default)]
pub struct SizeStrategy;

/// Bucket for a size in bytes.
///
/// Thresholds are in MiB: under 1, 1-10, 10-100, 100-1000, and above.
pub fn size_classification(bytes: u64) -> Classification {
    let mb = bytes as f64 / MIB;
    let (category, subcategory) = if mb < 1.0 {
        ("Small", "Under1MB")
    } else if mb < 10.0 {
        ("Small", "1-10MB")
    } else if mb < 100.0 {
        ("Medium", "10-100MB")
    } else if mb < 1000.0 {
        ("Medium", "100MB-1GB")
    } else {
        ("Large", "Over1GB")
    };
    Classification::new(category, subcategory)
}

impl ClassifyStrategy for SizeStrategy {
    fn classify(&self, file: &FileInfo) -> Classification {
        size_classification(file.size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MB: u64 = 1024 * 1024;

    #[test]
    fn test_buckets() {
        assert_eq!(size_classification(MB / 2), Classification::new("Small", "Under1MB"));
        assert_eq!(size_classification(5 * MB), Classification::new("Small", "1-10MB"));
        assert_eq!(size_classification(50 * MB), Classification::new("Medium", "10-100MB"));
        assert_eq!(size_classification(500 * MB), Classification::new("Medium", "100MB-1GB"));
        assert_eq!(size_classification(2000 * MB), Classification::new("Large", "Over1GB"));
    }

    #[test]
    fn test_boundaries() {
        assert_eq!(size_classification(0).subcategory, "Under1MB");
        assert_eq!(size_classification(MB - 1).subcategory, "Under1MB");
        assert_eq!(size_classification(MB).subcategory, "1-10MB");
        assert_eq!(size_classification(10 * MB).subcategory, "10-100MB");
        assert_eq!(size_classification(1000 * MB).subcategory, "Over1GB");
    }
}
