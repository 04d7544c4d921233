//! Extension category combined with modification year.

use chrono::{DateTime, Datelike, Local};

use shelfwise_core::{Classification, FileInfo};

use super::ClassifyStrategy;

/// Produces `<category>-<year>/<subcategory>` from an inner strategy.
pub struct HybridStrategy {
    inner: Box<dyn ClassifyStrategy>,
}

impl HybridStrategy {
    /// Wrap an extension-style strategy.
    pub fn new(inner: impl ClassifyStrategy + 'static) -> Self {
        Self {
            inner: Box::new(inner),
        }
    }
}

impl ClassifyStrategy for HybridStrategy {
    fn classify(&self, file: &FileInfo) -> Classification {
        let bucket = self.inner.classify(file);
        let modified: DateTime<Local> = file.modified.into();
        Classification::new(
            format!("{}-{}", bucket.category, modified.year()),
            bucket.subcategory,
        )
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::classify::ExtensionStrategy;

    #[test]
    fn test_category_gets_year_suffix() {
        let when = Local.with_ymd_and_hms(2021, 11, 3, 9, 30, 0).unwrap();
        let file = FileInfo::new("/r/report.pdf", 1, "fp".into(), when.into(), false);
        let strategy = HybridStrategy::new(ExtensionStrategy::default());
        assert_eq!(strategy.classify(&file), Classification::new("Docs-2021", "PDFs"));
    }
}
