//! Classification and duplicate grouping for shelfwise.
//!
//! - **Classification** maps a [`FileInfo`] to a `(category, subcategory)`
//!   bucket using one of four strategies, optionally preceded by content
//!   sniffing or embedded capture dates.
//! - **Duplicate grouping** buckets an inventory by content fingerprint and
//!   picks a deterministic primary per set.
//!
//! ```rust,ignore
//! use shelfwise_analyze::{Capabilities, Classifier, DuplicateGrouper};
//! use shelfwise_core::{MoveReason, OrganizeConfig};
//!
//! let config = OrganizeConfig::default();
//! let caps = Capabilities::detect(&config);
//! let classifier = Classifier::from_config(&config, &caps);
//!
//! for set in DuplicateGrouper::new().group(&inventory.files) {
//!     println!("{} copies, {} bytes wasted", set.count(), set.space_wasted());
//! }
//! let dest = classifier.destination(&file, root, MoveReason::Classify);
//! ```

mod capabilities;
pub mod classify;
mod duplicates;

pub use capabilities::Capabilities;
pub use classify::{
    Classifier, ClassifyStrategy, DateStrategy, ExtensionStrategy, HybridStrategy, PreClassifier,
    SizeStrategy, date_classification, mime_classification, size_classification,
};
#[cfg(feature = "exif")]
pub use classify::ExifCaptureDate;
#[cfg(feature = "sniff")]
pub use classify::MimeSniffer;
pub use duplicates::{DuplicateGrouper, SimilarityHasher};

pub use shelfwise_core::{Classification, DuplicateSet, FileInfo};
