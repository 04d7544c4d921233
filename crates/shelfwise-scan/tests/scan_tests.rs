use shelfwise_core::OrganizeConfig;
use shelfwise_scan::{ContentHasher, HashAlgorithm, Scanner, build_inventory};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

fn names(paths: &[PathBuf], root: &Path) -> Vec<String> {
    let mut out: Vec<String> = paths
        .iter()
        .map(|p| p.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
        .collect();
    out.sort();
    out
}

fn build_tree() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    fs::write(root.join("a.txt"), "hello").unwrap();
    fs::write(root.join("c.pdf"), "%PDF-1.4").unwrap();
    fs::write(root.join(".hidden"), "secret").unwrap();
    fs::create_dir_all(root.join("projects/src")).unwrap();
    fs::write(root.join("projects/src/main.rs"), "fn main() {}").unwrap();
    fs::create_dir_all(root.join("all_Docs/Text/deeper")).unwrap();
    fs::write(root.join("all_Docs/Text/deeper/old.txt"), "old").unwrap();
    fs::create_dir_all(root.join("all_Code/node_modules/pkg")).unwrap();
    fs::write(root.join("all_Code/node_modules/pkg/index.js"), "x").unwrap();
    dir
}

#[test]
fn test_selective_recursion() {
    let dir = build_tree();
    let config = OrganizeConfig::default();
    let outcome = Scanner::new(&config).scan(dir.path()).unwrap();
    let root = &outcome.root;

    assert_eq!(
        names(&outcome.files, root),
        vec!["a.txt", "all_Docs/Text/deeper/old.txt", "c.pdf"]
    );
    assert_eq!(names(&outcome.directories, root), vec!["projects"]);
    assert!(names(&outcome.ignored, root).contains(&".hidden".to_string()));
    assert!(
        names(&outcome.ignored, root).contains(&"all_Code/node_modules/pkg/index.js".to_string())
    );
    assert!(outcome.errors.is_empty());
}

#[test]
fn test_folders_bucket_is_not_entered() {
    let dir = build_tree();
    let root = dir.path();
    fs::create_dir_all(root.join("all_Folders/old_project")).unwrap();
    fs::write(root.join("all_Folders/old_project/notes.txt"), "keep").unwrap();

    let outcome = Scanner::new(&OrganizeConfig::default()).scan(root).unwrap();
    let files = names(&outcome.files, &outcome.root);
    assert!(!files.iter().any(|f| f.starts_with("all_Folders")));
    assert_eq!(names(&outcome.directories, &outcome.root), vec!["projects"]);
}

#[test]
fn test_hidden_files_accepted_when_allowed() {
    let dir = build_tree();
    let mut config = OrganizeConfig::default();
    config.ignore_hidden = false;
    let outcome = Scanner::new(&config).scan(dir.path()).unwrap();
    assert!(names(&outcome.files, &outcome.root).contains(&".hidden".to_string()));
}

#[test]
fn test_custom_prefix() {
    let dir = build_tree();
    let mut config = OrganizeConfig::default();
    config.directory_prefix = "sorted_".to_string();
    let outcome = Scanner::new(&config).scan(dir.path()).unwrap();

    // all_* directories are now plain subdirectories
    assert_eq!(
        names(&outcome.directories, &outcome.root),
        vec!["all_Code", "all_Docs", "projects"]
    );
}

#[cfg(unix)]
#[test]
fn test_symlink_policy() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    fs::write(root.join("real.txt"), "data").unwrap();
    std::os::unix::fs::symlink(root.join("real.txt"), root.join("link.txt")).unwrap();
    std::os::unix::fs::symlink(root.join("gone.txt"), root.join("broken.txt")).unwrap();

    let config = OrganizeConfig::default();
    let outcome = Scanner::new(&config).scan(root).unwrap();
    assert_eq!(names(&outcome.files, &outcome.root), vec!["real.txt"]);
    assert_eq!(
        names(&outcome.ignored, &outcome.root),
        vec!["broken.txt", "link.txt"]
    );

    let mut config = OrganizeConfig::default();
    config.follow_symlinks = true;
    let outcome = Scanner::new(&config).scan(root).unwrap();
    assert_eq!(names(&outcome.files, &outcome.root), vec!["link.txt", "real.txt"]);
    assert_eq!(outcome.errors.len(), 1);

    let hasher = ContentHasher::default();
    let inventory = build_inventory(&outcome.files, &hasher, None, |_, _| {});
    let link = inventory
        .files
        .iter()
        .find(|f| f.path.ends_with("link.txt"))
        .unwrap();
    assert!(link.is_symlink);
}

#[test]
fn test_inventory_groups_identical_content() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    fs::write(root.join("a.txt"), "hello").unwrap();
    fs::write(root.join("b.txt"), "hello").unwrap();
    fs::write(root.join("c.txt"), "world!").unwrap();

    let config = OrganizeConfig::default();
    let outcome = Scanner::new(&config).scan(root).unwrap();
    let mut paths = outcome.files.clone();
    paths.push(root.join("vanished.txt"));

    let calls = AtomicUsize::new(0);
    let hasher = ContentHasher::new(HashAlgorithm::Xxhash, 2);
    let inventory = build_inventory(&paths, &hasher, Some(2), |done, total| {
        assert!(done <= total);
        calls.fetch_add(1, Ordering::Relaxed);
    });

    assert_eq!(inventory.files.len(), 3);
    assert_eq!(inventory.errors.len(), 1);
    assert_eq!(calls.load(Ordering::Relaxed), 3);
    assert_eq!(inventory.files[0].fingerprint, inventory.files[1].fingerprint);
    assert_ne!(inventory.files[0].fingerprint, inventory.files[2].fingerprint);
    assert_eq!(inventory.files[2].size, 6);
    assert_eq!(inventory.total_size(), 16);
}
