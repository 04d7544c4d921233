//! Duplicate grouping by fingerprint, with an optional similarity pass.
//!
//! Exact grouping buckets files by content fingerprint. When a
//! [`SimilarityHasher`] is registered, files that are not exact duplicates
//! of anything are additionally clustered by Hamming distance between
//! perceptual hashes. Similarity sets are returned alongside the exact sets,
//! never merged into them.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use rayon::prelude::*;
use tracing::debug;

use shelfwise_core::{DuplicateSet, FileInfo, Fingerprint, OrganizeConfig};

use crate::capabilities::Capabilities;

/// Computes a 64-bit perceptual hash for approximately-equal content.
pub trait SimilarityHasher: Send + Sync {
    /// Whether this hasher understands the file at all.
    fn accepts(&self, file: &FileInfo) -> bool;

    /// Hash the file, or `None` if it cannot be decoded.
    fn similarity_hash(&self, path: &Path) -> Option<u64>;
}

/// Groups an inventory into duplicate sets.
#[derive(Clone, Default)]
pub struct DuplicateGrouper {
    similarity: Option<(Arc<dyn SimilarityHasher>, u32)>,
    isolation_dir: Option<PathBuf>,
}

impl DuplicateGrouper {
    /// Exact grouping only.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a similarity pass with a maximum Hamming distance.
    pub fn with_similarity(mut self, hasher: Arc<dyn SimilarityHasher>, threshold: u32) -> Self {
        self.similarity = Some((hasher, threshold));
        self
    }

    /// Never pick a primary from under `dir` while a copy exists elsewhere.
    ///
    /// Keeps re-runs stable once extras have been moved into the duplicates
    /// bucket.
    pub fn with_isolation_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.isolation_dir = Some(dir.into());
        self
    }

    /// Build the grouper a run's settings ask for.
    pub fn from_config(config: &OrganizeConfig, capabilities: &Capabilities) -> Self {
        match (&capabilities.similarity, config.similarity_dedup) {
            (Some(hasher), true) => {
                Self::new().with_similarity(Arc::clone(hasher), config.similarity_threshold)
            }
            _ => Self::new(),
        }
    }

    /// Group `files`; exact sets come first, in order of first appearance.
    pub fn group(&self, files: &[Arc<FileInfo>]) -> Vec<DuplicateSet> {
        let mut buckets: IndexMap<&Fingerprint, Vec<Arc<FileInfo>>> = IndexMap::new();
        for file in files {
            buckets.entry(&file.fingerprint).or_default().push(Arc::clone(file));
        }

        let mut sets: Vec<DuplicateSet> = buckets
            .into_iter()
            .filter(|(_, members)| members.len() > 1)
            .filter_map(|(fp, members)| self.make_set(fp.clone(), members))
            .collect();

        debug!(exact_sets = sets.len(), files = files.len(), "exact grouping done");

        if let Some((hasher, threshold)) = &self.similarity {
            let grouped: HashSet<&PathBuf> = sets
                .iter()
                .flat_map(|s| s.files().iter().map(|f| &f.path))
                .collect();
            let candidates: Vec<&Arc<FileInfo>> = files
                .iter()
                .filter(|f| !grouped.contains(&f.path) && hasher.accepts(f))
                .collect();
            let similar: Vec<DuplicateSet> =
                similarity_clusters(hasher.as_ref(), &candidates, *threshold)
                    .into_iter()
                    .filter_map(|(rep, members)| {
                        self.make_set(Fingerprint::new(format!("similar:{rep:016x}")), members)
                    })
                    .collect();
            debug!(similar_sets = similar.len(), "similarity grouping done");
            sets.extend(similar);
        }

        sets
    }

    fn make_set(&self, fingerprint: Fingerprint, members: Vec<Arc<FileInfo>>) -> Option<DuplicateSet> {
        let isolated = |f: &FileInfo| {
            self.isolation_dir
                .as_ref()
                .is_some_and(|dir| f.path.starts_with(dir))
        };
        DuplicateSet::with_isolated(fingerprint, members, isolated).ok()
    }
}

/// Greedy clusters of files within `threshold` of a representative hash.
fn similarity_clusters(
    hasher: &dyn SimilarityHasher,
    candidates: &[&Arc<FileInfo>],
    threshold: u32,
) -> Vec<(u64, Vec<Arc<FileInfo>>)> {
    let hashed: Vec<(Arc<FileInfo>, u64)> = candidates
        .par_iter()
        .filter_map(|f| hasher.similarity_hash(&f.path).map(|h| (Arc::clone(f), h)))
        .collect();

    let mut clusters: Vec<(u64, Vec<Arc<FileInfo>>)> = Vec::new();
    for (file, hash) in hashed {
        match clusters
            .iter_mut()
            .find(|(rep, _)| (rep ^ hash).count_ones() <= threshold)
        {
            Some((_, members)) => members.push(file),
            None => clusters.push((hash, vec![file])),
        }
    }

    clusters.retain(|(_, members)| members.len() > 1);
    clusters
}
