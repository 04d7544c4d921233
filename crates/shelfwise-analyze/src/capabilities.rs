//! Optional collaborators resolved once at startup.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use shelfwise_core::OrganizeConfig;

use crate::classify::PreClassifier;
use crate::duplicates::SimilarityHasher;

/// Optional classifiers and hashers a run may use.
///
/// Built once by the caller and handed to the classifier and grouper, so
/// neither has to probe for optional support while processing files.
#[derive(Clone, Default)]
pub struct Capabilities {
    /// Magic-byte classifier tried before the extension table.
    pub sniffer: Option<Arc<dyn PreClassifier>>,
    /// Embedded capture-date source for date-based sorting.
    pub capture_dates: Option<Arc<dyn PreClassifier>>,
    /// Perceptual hasher for the similarity pass.
    pub similarity: Option<Arc<dyn SimilarityHasher>>,
}

impl Capabilities {
    /// No optional collaborators.
    pub fn none() -> Self {
        Self::default()
    }

    /// Resolve what `config` asks for against what this build supports.
    pub fn detect(config: &OrganizeConfig) -> Self {
        let mut caps = Self::none();

        if config.content_sniffing {
            caps.sniffer = sniffer();
        }

        if config.use_metadata {
            match config.metadata_strategy.as_str() {
                "auto" | "exif-date" => caps.capture_dates = capture_dates(),
                other => warn!(strategy = other, "unknown metadata strategy, ignoring"),
            }
        }

        if config.similarity_dedup {
            warn!("similarity grouping requested but no similarity hasher is registered");
        }

        debug!(?caps, "capabilities resolved");
        caps
    }

    /// Register a similarity hasher supplied by the embedding application.
    pub fn with_similarity(mut self, hasher: Arc<dyn SimilarityHasher>) -> Self {
        self.similarity = Some(hasher);
        self
    }
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capabilities")
            .field("sniffer", &self.sniffer.as_ref().map(|s| s.name()))
            .field("capture_dates", &self.capture_dates.as_ref().map(|s| s.name()))
            .field("similarity", &self.similarity.is_some())
            .finish()
    }
}

#[cfg(feature = "sniff")]
fn sniffer() -> Option<Arc<dyn PreClassifier>> {
    Some(Arc::new(crate::classify::MimeSniffer))
}

#[cfg(not(feature = "sniff"))]
fn sniffer() -> Option<Arc<dyn PreClassifier>> {
    warn!("content sniffing not compiled in, using extensions only");
    None
}

#[cfg(feature = "exif")]
fn capture_dates() -> Option<Arc<dyn PreClassifier>> {
    Some(Arc::new(crate::classify::ExifCaptureDate))
}

#[cfg(not(feature = "exif"))]
fn capture_dates() -> Option<Arc<dyn PreClassifier>> {
    warn!("metadata extraction not compiled in, using modification times");
    None
}
