//! Streaming content fingerprints.
//!
//! One [`ContentHasher`] fronts every supported digest. The algorithm is
//! resolved when the hasher is built, so an algorithm that was compiled out
//! falls back to SHA-256 once instead of being checked per file.

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;
use sha2::{Digest as _, Sha256};
use tokio::io::AsyncReadExt;
use tracing::{debug, warn};

use shelfwise_core::{Fingerprint, HashAlgorithm, OrganizeConfig};

/// Default read size for streaming.
pub const DEFAULT_BLOCK_SIZE: usize = 64 * 1024;

/// Computes fingerprints with one resolved algorithm.
#[derive(Debug, Clone)]
pub struct ContentHasher {
    algorithm: HashAlgorithm,
    block_size: usize,
}

impl ContentHasher {
    /// Create a hasher, falling back to SHA-256 if `algorithm` is unavailable.
    pub fn new(algorithm: HashAlgorithm, block_size: usize) -> Self {
        Self {
            algorithm: resolve(algorithm),
            block_size: block_size.max(1),
        }
    }

    /// Create a hasher from organizer settings.
    pub fn from_config(config: &OrganizeConfig) -> Self {
        Self::new(config.hash_algorithm, config.hash_block_size)
    }

    /// The algorithm actually in use.
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// Read size used when streaming.
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Fingerprint a file, logging and returning `None` on read failure.
    pub fn hash_file(&self, path: &Path) -> Option<Fingerprint> {
        match self.try_hash_file(path) {
            Ok(fp) => Some(fp),
            Err(err) => {
                warn!(path = %path.display(), "failed to hash: {err}");
                None
            }
        }
    }

    /// Fingerprint a file, propagating I/O errors.
    pub fn try_hash_file(&self, path: &Path) -> io::Result<Fingerprint> {
        let file = File::open(path)?;
        self.hash_reader(file)
    }

    /// Fingerprint everything readable from `reader`.
    pub fn hash_reader(&self, mut reader: impl Read) -> io::Result<Fingerprint> {
        let mut digest = StreamDigest::new(self.algorithm);
        let mut buffer = vec![0u8; self.block_size];
        loop {
            let n = match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            digest.update(&buffer[..n]);
        }
        Ok(digest.finish())
    }

    /// Fingerprint in-memory bytes.
    pub fn hash_bytes(&self, bytes: &[u8]) -> Fingerprint {
        let mut digest = StreamDigest::new(self.algorithm);
        digest.update(bytes);
        digest.finish()
    }

    /// Async variant of [`ContentHasher::hash_file`] with identical output.
    pub async fn hash_file_async(&self, path: &Path) -> Option<Fingerprint> {
        match self.try_hash_file_async(path).await {
            Ok(fp) => Some(fp),
            Err(err) => {
                warn!(path = %path.display(), "failed to hash: {err}");
                None
            }
        }
    }

    async fn try_hash_file_async(&self, path: &Path) -> io::Result<Fingerprint> {
        let mut file = tokio::fs::File::open(path).await?;
        let mut digest = StreamDigest::new(self.algorithm);
        let mut buffer = vec![0u8; self.block_size];
        loop {
            let n = file.read(&mut buffer).await?;
            if n == 0 {
                break;
            }
            digest.update(&buffer[..n]);
        }
        Ok(digest.finish())
    }

    /// Fingerprint many files, keeping input order in the output.
    ///
    /// With `workers` set, files are hashed on a dedicated pool of that
    /// size; otherwise sequentially. `progress` receives (completed, total).
    pub fn hash_many<F>(
        &self,
        paths: &[PathBuf],
        workers: Option<usize>,
        progress: F,
    ) -> Vec<Option<Fingerprint>>
    where
        F: Fn(usize, usize) + Sync,
    {
        let total = paths.len();
        let done = AtomicUsize::new(0);
        let hash_one = |path: &PathBuf| {
            let fp = self.hash_file(path);
            progress(done.fetch_add(1, Ordering::Relaxed) + 1, total);
            fp
        };

        match workers.filter(|&n| n > 0) {
            Some(n) => match rayon::ThreadPoolBuilder::new().num_threads(n).build() {
                Ok(pool) => {
                    debug!(workers = n, files = total, "hashing in parallel");
                    pool.install(|| paths.par_iter().map(hash_one).collect())
                }
                Err(err) => {
                    warn!("could not start hash workers, hashing sequentially: {err}");
                    paths.iter().map(hash_one).collect()
                }
            },
            None => paths.iter().map(hash_one).collect(),
        }
    }
}

impl Default for ContentHasher {
    fn default() -> Self {
        Self::new(HashAlgorithm::default(), DEFAULT_BLOCK_SIZE)
    }
}

/// Map a requested algorithm onto one compiled into this build.
pub fn resolve(algorithm: HashAlgorithm) -> HashAlgorithm {
    match algorithm {
        #[cfg(not(feature = "xxhash"))]
        HashAlgorithm::Xxhash => {
            warn!("xxhash support not compiled in, using sha256");
            HashAlgorithm::Sha256
        }
        other => other,
    }
}

enum StreamDigest {
    Sha256(Sha256),
    Blake3(Box<blake3::Hasher>),
    #[cfg(feature = "xxhash")]
    Xxh3(Box<xxhash_rust::xxh3::Xxh3>),
}

impl StreamDigest {
    fn new(algorithm: HashAlgorithm) -> Self {
        match algorithm {
            HashAlgorithm::Blake3 => Self::Blake3(Box::new(blake3::Hasher::new())),
            #[cfg(feature = "xxhash")]
            HashAlgorithm::Xxhash => Self::Xxh3(Box::new(xxhash_rust::xxh3::Xxh3::new())),
            _ => Self::Sha256(Sha256::new()),
        }
    }

    fn update(&mut self, bytes: &[u8]) {
        match self {
            Self::Sha256(h) => h.update(bytes),
            Self::Blake3(h) => {
                h.update(bytes);
            }
            #[cfg(feature = "xxhash")]
            Self::Xxh3(h) => h.update(bytes),
        }
    }

    fn finish(self) -> Fingerprint {
        match self {
            Self::Sha256(h) => Fingerprint::from_bytes(&h.finalize()),
            Self::Blake3(h) => Fingerprint::new(h.finalize().to_hex().to_string()),
            #[cfg(feature = "xxhash")]
            Self::Xxh3(h) => Fingerprint::new(format!("{:016x}", h.digest())),
        }
    }
}
