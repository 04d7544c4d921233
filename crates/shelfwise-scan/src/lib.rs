//! File system scanning and fingerprinting for shelfwise.
//!
//! # Overview
//!
//! `shelfwise-scan` finds the files an organize run may touch and gives
//! each one a content fingerprint:
//!
//! - **Selective recursion**: only the root's immediate children are
//!   listed, except managed (prefixed) directories, which are walked in
//!   full via jwalk
//! - **Ignore rules**: hidden names and glob patterns
//! - **Pluggable digests**: SHA-256, BLAKE3 and XXH3 behind one hasher
//! - **Parallel hashing** on a bounded rayon pool
//!
//! # Example
//!
//! ```rust,no_run
//! use shelfwise_core::OrganizeConfig;
//! use shelfwise_scan::{ContentHasher, Scanner, build_inventory};
//!
//! let config = OrganizeConfig::default();
//! let outcome = Scanner::new(&config).scan("/path/to/tidy".as_ref()).unwrap();
//! let hasher = ContentHasher::from_config(&config);
//! let inventory = build_inventory(&outcome.files, &hasher, None, |_, _| {});
//!
//! println!("{} files fingerprinted", inventory.files.len());
//! ```

mod hasher;
mod ignore;
mod inventory;
mod scanner;

pub use hasher::{ContentHasher, DEFAULT_BLOCK_SIZE, resolve as resolve_algorithm};
pub use ignore::IgnoreRules;
pub use inventory::{Inventory, build_inventory};
pub use scanner::{ScanOutcome, Scanner};

// Re-export core types for convenience
pub use shelfwise_core::{FileInfo, Fingerprint, HashAlgorithm, ScanError, ScanWarning, WarningKind};
