//! Ignore rules: hidden-name suppression plus glob patterns.

use std::path::Path;

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use tracing::warn;

use shelfwise_core::paths::is_hidden;

/// Compiled ignore rules for one scan.
///
/// Each pattern is tried against the full path, the path relative to the
/// scan root, and the bare file name. Patterns that fail to compile are
/// kept as literal file names.
#[derive(Debug, Clone)]
pub struct IgnoreRules {
    globs: GlobSet,
    literals: Vec<String>,
    ignore_hidden: bool,
}

impl IgnoreRules {
    /// Compile `patterns`.
    pub fn new(patterns: &[String], ignore_hidden: bool) -> Self {
        let mut builder = GlobSetBuilder::new();
        let mut literals = Vec::new();

        for pattern in patterns {
            match GlobBuilder::new(pattern).literal_separator(true).build() {
                Ok(glob) => {
                    builder.add(glob);
                }
                Err(err) => {
                    warn!(%pattern, "invalid ignore pattern, matching by name: {err}");
                    literals.push(pattern.clone());
                }
            }
        }

        let globs = builder.build().unwrap_or_else(|err| {
            warn!("failed to build ignore set, matching patterns by name: {err}");
            literals = patterns.to_vec();
            GlobSet::empty()
        });

        Self {
            globs,
            literals,
            ignore_hidden,
        }
    }

    /// Whether `path` (somewhere under `root`) should be left alone.
    pub fn is_ignored(&self, path: &Path, root: &Path) -> bool {
        if self.ignore_hidden && is_hidden(path) {
            return true;
        }
        self.matches_pattern(path, root)
    }

    /// Whether `path` matches a pattern, ignoring the hidden-name rule.
    pub fn matches_pattern(&self, path: &Path, root: &Path) -> bool {
        let name = path.file_name().map(|n| n.to_string_lossy());

        if let Some(name) = &name {
            if self.literals.iter().any(|l| l == name.as_ref()) {
                return true;
            }
        }

        if self.globs.is_empty() {
            return false;
        }
        if self.globs.is_match(path) {
            return true;
        }
        if let Ok(relative) = path.strip_prefix(root) {
            if self.globs.is_match(relative) {
                return true;
            }
        }
        name.map(|n| self.globs.is_match(n.as_ref())).unwrap_or(false)
    }
}
