//! Path helpers shared by the planner, validator and executor.

use std::path::{Path, PathBuf};

/// Resolve a path that may not exist yet.
///
/// The longest existing ancestor is canonicalized and the missing tail is
/// appended unchanged.
pub fn resolve_lossy(path: &Path) -> PathBuf {
    if let Ok(resolved) = path.canonicalize() {
        return resolved;
    }

    let mut tail = Vec::new();
    let mut current = path;
    while let Some(parent) = current.parent() {
        if let Some(name) = current.file_name() {
            tail.push(name.to_os_string());
        }
        if let Ok(base) = parent.canonicalize() {
            let mut resolved = base;
            for part in tail.iter().rev() {
                resolved.push(part);
            }
            return resolved;
        }
        current = parent;
    }

    path.to_path_buf()
}

/// Whether two paths point at the same location once resolved.
pub fn same_location(a: &Path, b: &Path) -> bool {
    a == b || resolve_lossy(a) == resolve_lossy(b)
}

/// Whether a file name marks a hidden entry.
pub fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .map(|n| n.to_string_lossy().starts_with('.'))
        .unwrap_or(false)
}

/// Find a free variant of `path` by appending `_N` to the stem.
///
/// For "notes.txt", tries "notes_1.txt", "notes_2.txt", etc. `is_taken`
/// decides what counts as occupied, so callers can include paths claimed
/// earlier in the same plan.
pub fn unique_path(path: &Path, is_taken: impl Fn(&Path) -> bool) -> PathBuf {
    let parent = path.parent().unwrap_or(Path::new(""));
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = path.extension().map(|e| e.to_string_lossy().into_owned());

    let candidate = |suffix: &str| match &extension {
        Some(ext) => parent.join(format!("{stem}_{suffix}.{ext}")),
        None => parent.join(format!("{stem}_{suffix}")),
    };

    for i in 1..10_000 {
        let new_path = candidate(&i.to_string());
        if !is_taken(&new_path) {
            return new_path;
        }
    }

    // Fallback: use timestamp
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    candidate(&timestamp.to_string())
}
