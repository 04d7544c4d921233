//! Organizer configuration.

use std::path::{Path, PathBuf};

use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tracing::{debug, warn};

use crate::error::ConfigError;
use crate::rules::ClassificationRules;

/// How files are mapped to (category, subcategory).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Strategy {
    /// Extension rule table.
    #[default]
    ByExtension,
    /// Year and month-day of the modification (or capture) date.
    ByDate,
    /// Fixed size buckets.
    BySize,
    /// Extension category suffixed with the year.
    Hybrid,
}

/// What to do when a destination is already occupied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ConflictPolicy {
    /// Append `_N` to the file stem until the path is free.
    #[default]
    Rename,
    /// Leave the source where it is.
    Skip,
    /// Replace whatever is at the destination.
    Overwrite,
    /// Ask the user; behaves like `Rename` without an interactive prompt.
    Ask,
}

/// Content digest used for fingerprints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum HashAlgorithm {
    /// SHA-256.
    #[default]
    Sha256,
    /// BLAKE3.
    Blake3,
    /// XXH3 64-bit (not cryptographic).
    Xxhash,
}

impl HashAlgorithm {
    /// Whether collisions can be crafted cheaply.
    pub fn is_cryptographic(&self) -> bool {
        !matches!(self, Self::Xxhash)
    }
}

/// Settings consumed at the start of planning.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(default, setter(into), build_fn(validate = "Self::validate_builder"))]
#[serde(default)]
pub struct OrganizeConfig {
    /// Category rule table.
    pub rules: ClassificationRules,

    /// Classification strategy.
    pub strategy: Strategy,

    /// Conflict policy for every planned operation.
    pub conflict_policy: ConflictPolicy,

    /// Accept symlinked files and descend into symlinked directories.
    pub follow_symlinks: bool,

    /// Skip entries whose name starts with a dot.
    pub ignore_hidden: bool,

    /// Glob patterns for paths to leave alone.
    pub ignore_patterns: Vec<String>,

    /// Group files by fingerprint.
    pub detect_duplicates: bool,

    /// Move non-primary duplicates into the duplicates bucket.
    pub isolate_duplicates: bool,

    /// Digest used for fingerprints.
    pub hash_algorithm: HashAlgorithm,

    /// Read size when streaming file content.
    pub hash_block_size: usize,

    /// Hash files on a worker pool.
    pub parallel_hashing: bool,

    /// Worker pool size for parallel hashing.
    pub hash_workers: usize,

    /// Prefix marking directories this tool manages.
    pub directory_prefix: String,

    /// Bucket name for isolated duplicates (without prefix).
    pub duplicates_folder: String,

    /// Bucket name for relocated subdirectories (without prefix).
    pub folders_folder: String,

    /// Directory under the root holding operation logs and checkpoints.
    pub log_directory: String,

    /// Re-hash each file after moving it.
    pub verify_integrity: bool,

    /// Run the similarity grouping pass.
    pub similarity_dedup: bool,

    /// Maximum Hamming distance for two files to count as similar.
    pub similarity_threshold: u32,

    /// Try magic-byte detection before the extension table.
    pub content_sniffing: bool,

    /// Prefer embedded capture dates for date-based sorting.
    pub use_metadata: bool,

    /// Which metadata source to consult (`auto` or `exif-date`).
    pub metadata_strategy: String,
}

impl Default for OrganizeConfig {
    fn default() -> Self {
        Self {
            rules: ClassificationRules::default(),
            strategy: Strategy::default(),
            conflict_policy: ConflictPolicy::default(),
            follow_symlinks: false,
            ignore_hidden: true,
            ignore_patterns: vec![
                "**/.shelfwise/**".to_string(),
                "**/.git/**".to_string(),
                "**/node_modules/**".to_string(),
                "**/__pycache__/**".to_string(),
            ],
            detect_duplicates: true,
            isolate_duplicates: true,
            hash_algorithm: HashAlgorithm::default(),
            hash_block_size: 64 * 1024,
            parallel_hashing: false,
            hash_workers: 4,
            directory_prefix: "all_".to_string(),
            duplicates_folder: "Duplicates".to_string(),
            folders_folder: "Folders".to_string(),
            log_directory: ".shelfwise".to_string(),
            verify_integrity: false,
            similarity_dedup: false,
            similarity_threshold: 5,
            content_sniffing: false,
            use_metadata: false,
            metadata_strategy: "auto".to_string(),
        }
    }
}

impl OrganizeConfigBuilder {
    fn validate_builder(&self) -> Result<(), String> {
        if let Some(ref prefix) = self.directory_prefix {
            if prefix.is_empty() {
                return Err("Directory prefix cannot be empty".to_string());
            }
        }
        if self.hash_block_size == Some(0) {
            return Err("Hash block size must be positive".to_string());
        }
        Ok(())
    }
}

/// File name searched for in the working directory and home directory.
pub const CONFIG_FILE_NAME: &str = ".shelfwise.toml";

impl OrganizeConfig {
    /// Create a new config builder.
    pub fn builder() -> OrganizeConfigBuilder {
        OrganizeConfigBuilder::default()
    }

    /// Load a TOML config file, layering its rules over the built-in table.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?
        .validated()
    }

    /// Parse TOML text.
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        let mut config: Self = toml::from_str(text)?;
        let user_rules = std::mem::replace(&mut config.rules, ClassificationRules::empty());
        config.rules = ClassificationRules::default().merged(user_rules);
        Ok(config)
    }

    /// Write the config as TOML.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let text = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(path, text).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load the first config found in the standard locations.
    ///
    /// A file that fails to load is reported and skipped.
    pub fn discover() -> Self {
        for candidate in Self::search_paths() {
            if !candidate.is_file() {
                continue;
            }
            match Self::load(&candidate) {
                Ok(config) => {
                    debug!(path = %candidate.display(), "loaded config");
                    return config;
                }
                Err(err) => warn!("{err}; using defaults"),
            }
        }
        Self::default()
    }

    /// Locations checked by [`OrganizeConfig::discover`], in order.
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(CONFIG_FILE_NAME)];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("shelfwise").join("config.toml"));
        }
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(CONFIG_FILE_NAME));
        }
        paths
    }

    /// Check cross-field consistency.
    pub fn validated(self) -> Result<Self, ConfigError> {
        let invalid = |message: &str| {
            Err(ConfigError::Invalid {
                message: message.to_string(),
            })
        };
        if self.directory_prefix.is_empty() {
            return invalid("directory_prefix cannot be empty");
        }
        if self.hash_block_size == 0 {
            return invalid("hash_block_size must be positive");
        }
        if self.parallel_hashing && self.hash_workers == 0 {
            return invalid("hash_workers must be positive when parallel_hashing is on");
        }
        if self.duplicates_folder.is_empty() || self.folders_folder.is_empty() {
            return invalid("bucket names cannot be empty");
        }
        if self.log_directory.is_empty() {
            return invalid("log_directory cannot be empty");
        }
        Ok(self)
    }

    /// Prefixed name of a managed top-level directory.
    pub fn managed_name(&self, name: &str) -> String {
        format!("{}{}", self.directory_prefix, name)
    }

    /// Whether a directory name carries the managed prefix.
    pub fn is_managed_name(&self, name: &str) -> bool {
        name.starts_with(&self.directory_prefix)
    }

    /// Prefixed duplicates bucket name, e.g. `all_Duplicates`.
    pub fn duplicates_dir_name(&self) -> String {
        self.managed_name(&self.duplicates_folder)
    }

    /// Prefixed folders bucket name, e.g. `all_Folders`.
    pub fn folders_dir_name(&self) -> String {
        self.managed_name(&self.folders_folder)
    }
}
