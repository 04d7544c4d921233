//! File classification.
//!
//! A [`Classifier`] runs an ordered chain of optional [`PreClassifier`]s and
//! falls back to one base [`ClassifyStrategy`]. The first pre-classifier to
//! return a result wins.

mod date;
mod extension;
mod hybrid;
mod mime;
mod size;

#[cfg(feature = "exif")]
mod exif_date;

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use shelfwise_core::{Classification, FileInfo, MoveReason, OrganizeConfig, Strategy};

use crate::capabilities::Capabilities;

pub use date::{DateStrategy, date_classification};
pub use extension::ExtensionStrategy;
pub use hybrid::HybridStrategy;
pub use mime::mime_classification;
pub use size::{SizeStrategy, size_classification};

#[cfg(feature = "exif")]
pub use exif_date::ExifCaptureDate;
#[cfg(feature = "sniff")]
pub use mime::MimeSniffer;

/// A base classification strategy. Always produces an answer.
pub trait ClassifyStrategy: Send + Sync {
    /// Map a file to its bucket.
    fn classify(&self, file: &FileInfo) -> Classification;
}

/// An optional step tried before the base strategy.
pub trait PreClassifier: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Return a bucket, or `None` to defer to the next step.
    fn try_classify(&self, file: &FileInfo) -> Option<Classification>;
}

/// Where managed output lives under a root.
#[derive(Debug, Clone)]
struct Layout {
    prefix: String,
    duplicates_dir: String,
    isolate_duplicates: bool,
}

/// Pre-classifier chain plus base strategy, and destination derivation.
pub struct Classifier {
    pre: Vec<Arc<dyn PreClassifier>>,
    base: Box<dyn ClassifyStrategy>,
    layout: Layout,
}

impl Classifier {
    /// Create a classifier with default layout around `base`.
    pub fn new(base: impl ClassifyStrategy + 'static) -> Self {
        Self::with_base(Box::new(base), &OrganizeConfig::default())
    }

    fn with_base(base: Box<dyn ClassifyStrategy>, config: &OrganizeConfig) -> Self {
        Self {
            pre: Vec::new(),
            base,
            layout: Layout {
                prefix: config.directory_prefix.clone(),
                duplicates_dir: config.duplicates_dir_name(),
                isolate_duplicates: config.isolate_duplicates,
            },
        }
    }

    /// Append a pre-classifier to the chain.
    pub fn with_pre_classifier(mut self, pre: Arc<dyn PreClassifier>) -> Self {
        self.pre.push(pre);
        self
    }

    /// Build the classifier a run's settings ask for.
    ///
    /// Content sniffing feeds extension-based strategies; capture dates feed
    /// the date strategy. Missing capabilities are simply left out.
    pub fn from_config(config: &OrganizeConfig, capabilities: &Capabilities) -> Self {
        let extension_chain = || {
            let mut chain = Self::with_base(
                Box::new(ExtensionStrategy::new(config.rules.clone())),
                config,
            );
            if let Some(sniffer) = &capabilities.sniffer {
                chain = chain.with_pre_classifier(Arc::clone(sniffer));
            }
            chain
        };

        match config.strategy {
            Strategy::ByExtension => extension_chain(),
            Strategy::ByDate => {
                let mut chain = Self::with_base(Box::new(DateStrategy), config);
                if let Some(dates) = &capabilities.capture_dates {
                    chain = chain.with_pre_classifier(Arc::clone(dates));
                }
                chain
            }
            Strategy::BySize => Self::with_base(Box::new(SizeStrategy), config),
            Strategy::Hybrid => {
                Self::with_base(Box::new(HybridStrategy::new(extension_chain())), config)
            }
        }
    }

    /// Map a file to its bucket.
    pub fn classify(&self, file: &FileInfo) -> Classification {
        self.pre
            .iter()
            .find_map(|pre| pre.try_classify(file))
            .unwrap_or_else(|| self.base.classify(file))
    }

    /// Where `file` should end up under `root` for the given reason.
    ///
    /// Isolated duplicates keep their path relative to the root under the
    /// duplicates bucket; a file already inside that bucket stays put.
    /// Everything else goes to `root/<prefix><category>/<subcategory>/<name>`.
    pub fn destination(&self, file: &FileInfo, root: &Path, reason: MoveReason) -> PathBuf {
        if reason == MoveReason::Duplicate && self.layout.isolate_duplicates {
            let relative = match file.path.strip_prefix(root) {
                Ok(rel) => rel.to_path_buf(),
                Err(_) => PathBuf::from(file.name()),
            };
            let already_isolated = matches!(
                relative.components().next(),
                Some(Component::Normal(first)) if first == self.layout.duplicates_dir.as_str()
            );
            if already_isolated {
                return file.path.clone();
            }
            return root.join(&self.layout.duplicates_dir).join(relative);
        }

        let bucket = self.classify(file);
        root.join(format!("{}{}", self.layout.prefix, bucket.category))
            .join(bucket.subcategory.as_str())
            .join(file.name())
    }
}

impl ClassifyStrategy for Classifier {
    fn classify(&self, file: &FileInfo) -> Classification {
        Classifier::classify(self, file)
    }
}
