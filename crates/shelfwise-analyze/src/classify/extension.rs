//! Extension rule table strategy.

use dashmap::DashMap;

use shelfwise_core::{Classification, ClassificationRules, FileInfo};

use super::ClassifyStrategy;

/// Looks up the lower-cased extension in a rule table.
///
/// Results are memoized per extension.
#[derive(Debug, Default)]
pub struct ExtensionStrategy {
    rules: ClassificationRules,
    cache: DashMap<String, Classification>,
}

impl ExtensionStrategy {
    /// Create a strategy over `rules`.
    pub fn new(rules: ClassificationRules) -> Self {
        Self {
            rules,
            cache: DashMap::new(),
        }
    }

    /// Bucket for an extension such as `.txt`.
    pub fn classify_extension(&self, extension: &str) -> Classification {
        if let Some(hit) = self.cache.get(extension) {
            return hit.value().clone();
        }
        let bucket = self
            .rules
            .lookup(extension)
            .unwrap_or_else(Classification::unsorted);
        self.cache.insert(extension.to_string(), bucket.clone());
        bucket
    }

    /// Number of memoized extensions.
    pub fn cached_extensions(&self) -> usize {
        self.cache.len()
    }
}

impl ClassifyStrategy for ExtensionStrategy {
    fn classify(&self, file: &FileInfo) -> Classification {
        self.classify_extension(&file.extension())
    }
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use super::*;

    fn file(path: &str) -> FileInfo {
        FileInfo::new(path, 1, "fp".into(), SystemTime::now(), false)
    }

    #[test]
    fn test_known_and_unknown_extensions() {
        let strategy = ExtensionStrategy::default();
        assert_eq!(strategy.classify(&file("/r/a.TXT")), Classification::new("Docs", "Text"));
        assert_eq!(strategy.classify(&file("/r/song.flac")), Classification::new("Audio", "Music"));
        assert_eq!(strategy.classify(&file("/r/thing.qqq")), Classification::unsorted());
        assert_eq!(strategy.classify(&file("/r/README")), Classification::unsorted());
    }

    #[test]
    fn test_memoized_by_extension() {
        let strategy = ExtensionStrategy::default();
        strategy.classify(&file("/r/a.txt"));
        strategy.classify(&file("/r/b.txt"));
        strategy.classify(&file("/r/c.pdf"));
        assert_eq!(strategy.cached_extensions(), 2);
    }
}
