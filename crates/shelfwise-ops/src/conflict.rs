//! Conflict detection and resolution at execution time.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// An occupied destination found while executing.
#[derive(Debug, Clone)]
pub struct Conflict {
    /// The path being moved.
    pub source: PathBuf,
    /// The occupied destination.
    pub destination: PathBuf,
    /// What occupies it.
    pub kind: ConflictKind,
}

impl Conflict {
    /// Create a new conflict.
    pub fn new(source: PathBuf, destination: PathBuf, kind: ConflictKind) -> Self {
        Self {
            source,
            destination,
            kind,
        }
    }
}

/// What is in the way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConflictKind {
    /// A file already exists at the destination.
    FileExists,
    /// A directory already exists at the destination.
    DirectoryExists,
}

impl std::fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FileExists => write!(f, "File already exists"),
            Self::DirectoryExists => write!(f, "Directory already exists"),
        }
    }
}

/// Answer to an interactive conflict prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConflictChoice {
    /// Move to the next free `_N` name.
    Rename,
    /// Leave the source in place; the operation fails.
    Skip,
    /// Replace what is at the destination.
    Overwrite,
}

/// Decides `ask` conflicts. Without one, `ask` behaves like `rename`.
pub trait ConflictPrompt: Send + Sync {
    fn choose(&self, conflict: &Conflict) -> ConflictChoice;
}

/// A prompt that always gives the same answer.
#[derive(Debug, Clone, Copy)]
pub struct FixedChoice(pub ConflictChoice);

impl ConflictPrompt for FixedChoice {
    fn choose(&self, _conflict: &Conflict) -> ConflictChoice {
        self.0
    }
}
