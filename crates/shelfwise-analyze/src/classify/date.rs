//! Modification-date strategy.

use chrono::{DateTime, Datelike, Local, NaiveDate};

use shelfwise_core::{Classification, FileInfo};

use super::ClassifyStrategy;

/// Sorts files into `<year>/<MM-DD>` by modification time.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateStrategy;

/// Bucket for a calendar date.
pub fn date_classification(date: NaiveDate) -> Classification {
    Classification::new(date.year().to_string(), date.format("%m-%d").to_string())
}

impl ClassifyStrategy for DateStrategy {
    fn classify(&self, file: &FileInfo) -> Classification {
        let modified: DateTime<Local> = file.modified.into();
        date_classification(modified.date_naive())
    }
}
