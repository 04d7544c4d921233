//! Capture dates from embedded EXIF metadata.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use chrono::NaiveDate;
use tracing::trace;

use shelfwise_core::{Classification, FileInfo};

use super::{PreClassifier, date_classification};

/// Prefers `DateTimeOriginal`, then `DateTime`, over the modification time.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExifCaptureDate;

impl ExifCaptureDate {
    /// Read the capture date of an image, if it has one.
    pub fn capture_date(path: &Path) -> Option<NaiveDate> {
        let file = File::open(path).ok()?;
        let mut reader = BufReader::new(file);
        let meta = exif::Reader::new().read_from_container(&mut reader).ok()?;

        [exif::Tag::DateTimeOriginal, exif::Tag::DateTime]
            .into_iter()
            .filter_map(|tag| meta.get_field(tag, exif::In::PRIMARY))
            .find_map(|field| parse_exif_datetime(&field.display_value().to_string()))
    }
}

impl PreClassifier for ExifCaptureDate {
    fn name(&self) -> &'static str {
        "exif-date"
    }

    fn try_classify(&self, file: &FileInfo) -> Option<Classification> {
        let date = Self::capture_date(&file.path)?;
        trace!(path = %file.path.display(), %date, "capture date");
        Some(date_classification(date))
    }
}

/// Parse "2024:01:15 14:30:00" or "2024-01-15 14:30:00".
fn parse_exif_datetime(raw: &str) -> Option<NaiveDate> {
    let normalized = raw.trim_matches('"').replace(':', "-");
    let date_part = normalized.split_whitespace().next()?;
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}
