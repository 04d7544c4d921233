//! Moving a single file or directory.

use std::fs;
use std::io;
use std::path::Path;

use tracing::debug;

/// Move `source` to `dest`, which must not exist.
///
/// Tries a rename first. When that fails (typically across filesystems)
/// the item is copied and the source removed.
pub(crate) fn move_path(source: &Path, dest: &Path) -> io::Result<()> {
    if let Err(err) = fs::rename(source, dest) {
        if !source.exists() {
            return Err(err);
        }
        debug!(source = %source.display(), error = %err, "rename failed, copying instead");
        copy_then_remove(source, dest)?;
    }
    Ok(())
}

fn copy_then_remove(source: &Path, dest: &Path) -> io::Result<()> {
    let is_dir = fs::symlink_metadata(source)?.is_dir();
    let result = if is_dir {
        let mut options = fs_extra::dir::CopyOptions::new();
        options.copy_inside = true;
        fs_extra::dir::move_dir(source, dest, &options)
    } else {
        fs_extra::file::move_file(source, dest, &fs_extra::file::CopyOptions::new())
    };
    result.map(|_| ()).map_err(io::Error::other)
}

/// Whether anything, including a dangling symlink, occupies `path`.
pub(crate) fn occupied(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_move_file() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("a.txt");
        fs::write(&src, "content").unwrap();
        let dest = dir.path().join("b.txt");

        move_path(&src, &dest).unwrap();
        assert!(!src.exists());
        assert_eq!(fs::read_to_string(&dest).unwrap(), "content");
    }

    #[test]
    fn test_move_directory_keeps_contents() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("project");
        fs::create_dir_all(src.join("nested")).unwrap();
        fs::write(src.join("nested/file.txt"), "x").unwrap();
        let dest = dir.path().join("moved");

        move_path(&src, &dest).unwrap();
        assert!(!src.exists());
        assert!(dest.join("nested/file.txt").exists());
    }

    #[test]
    fn test_missing_source_is_error() {
        let dir = TempDir::new().unwrap();
        let err = move_path(&dir.path().join("nope"), &dir.path().join("dest")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
