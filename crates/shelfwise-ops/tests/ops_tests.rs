use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use shelfwise_analyze::Capabilities;
use shelfwise_core::{
    Checkpoint, ConflictPolicy, DirectoryMoveOperation, FileInfo, MoveOperation, MoveReason,
    OrganizationPlan, OrganizeConfig, Phase,
};
use shelfwise_ops::{
    CheckpointManager, CheckpointRecorder, ExecuteError, ExecuteOptions, ExecutionReport,
    Executor, OperationLog,
};
use shelfwise_plan::{Planner, optimize_plan};
use shelfwise_scan::ContentHasher;
use tempfile::TempDir;

fn hello_tree() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("a.txt"), "hello").unwrap();
    fs::write(dir.path().join("b.txt"), "hello").unwrap();
    fs::write(dir.path().join("c.pdf"), "%PDF-1.4 body").unwrap();
    fs::create_dir(dir.path().join("project")).unwrap();
    fs::write(dir.path().join("project/readme.md"), "# hi").unwrap();
    dir
}

fn plan_for(root: &Path, config: &OrganizeConfig) -> OrganizationPlan {
    let planner = Planner::new(config.clone(), &Capabilities::none());
    optimize_plan(planner.create_plan(root).unwrap())
}

/// Every path under `root`, relative and sorted.
fn snapshot(root: &Path) -> Vec<PathBuf> {
    fn walk(dir: &Path, root: &Path, out: &mut Vec<PathBuf>) {
        for entry in fs::read_dir(dir).unwrap().flatten() {
            let path = entry.path();
            out.push(path.strip_prefix(root).unwrap().to_path_buf());
            if path.is_dir() {
                walk(&path, root, out);
            }
        }
    }
    let mut out = Vec::new();
    walk(root, root, &mut out);
    out.sort();
    out
}

/// A hand-built operation for a file already on disk.
fn manual_op(root: &Path, name: &str, dest: &str, policy: ConflictPolicy) -> MoveOperation {
    let path = root.join(name);
    let fingerprint = ContentHasher::default().hash_file(&path).unwrap();
    let size = fs::metadata(&path).unwrap().len();
    let file = Arc::new(FileInfo::new(path, size, fingerprint, SystemTime::now(), false));
    MoveOperation::new(file, root.join(dest), MoveReason::Classify, policy)
}

#[test]
fn test_organize_then_undo_restores_layout() {
    let dir = hello_tree();
    let before = snapshot(dir.path());
    let config = OrganizeConfig::default();
    let plan = plan_for(dir.path(), &config);
    let root = plan.root.clone();

    let result = Executor::from_config(&config, false).execute(plan);
    assert!(result.is_complete_success(), "{:?}", result.failed);
    assert_eq!(result.files_moved(), 3);
    assert_eq!(result.directories_moved.len(), 1);
    assert!(root.join("all_Duplicates/b.txt").exists());
    assert!(root.join("all_Docs/Text/a.txt").exists());
    assert!(root.join("all_Docs/PDFs/c.pdf").exists());
    assert!(root.join("all_Folders/project/readme.md").exists());
    assert!(!root.join("a.txt").exists());

    let log_path = result.log_file.clone().unwrap();
    assert_eq!(OperationLog::latest(&root, &config.log_directory), Some(log_path.clone()));
    let log = OperationLog::load(&log_path).unwrap();
    assert_eq!(log.committed().count(), 4);
    assert!(log.directories_created.contains(&root.join("all_Docs/Text")));

    let report = Executor::from_config(&config, false).undo(&log_path).unwrap();
    assert_eq!(report.succeeded(), 4);
    assert!(report.is_complete_success());

    // only the log directory remains as a trace of the run
    let after: Vec<_> = snapshot(&root)
        .into_iter()
        .filter(|p| !p.starts_with(&config.log_directory))
        .collect();
    assert_eq!(after, before);
}

#[test]
fn test_undo_counts_vanished_destinations() {
    let dir = hello_tree();
    let config = OrganizeConfig::default();
    let plan = plan_for(dir.path(), &config);
    let root = plan.root.clone();

    let result = Executor::from_config(&config, false).execute(plan);
    fs::remove_file(root.join("all_Docs/PDFs/c.pdf")).unwrap();

    let report = shelfwise_ops::undo_log(&result.log_file.unwrap()).unwrap();
    assert_eq!(report.failed_count(), 1);
    assert_eq!(report.succeeded(), 3);
    assert!(report.failed[0].1.contains("no longer exists"));
    assert!(root.join("a.txt").exists());
}

#[test]
fn test_undo_in_dry_run_is_rejected() {
    let dir = TempDir::new().unwrap();
    let executor = Executor::from_config(&OrganizeConfig::default(), true);
    assert!(matches!(
        executor.undo(&dir.path().join("operations_x.json")),
        Err(ExecuteError::UndoInDryRun)
    ));
}

#[test]
fn test_dry_run_leaves_tree_untouched() {
    let dir = hello_tree();
    let before = snapshot(dir.path());
    let config = OrganizeConfig::default();
    let plan = plan_for(dir.path(), &config);

    let mut updates = 0;
    let result = Executor::from_config(&config, true).execute_with_progress(plan, |_| updates += 1);

    assert!(result.dry_run);
    assert_eq!(result.files_moved(), 3);
    assert_eq!(result.directories_moved.len(), 1);
    // three files, one directory, then cleanup
    assert_eq!(updates, 5);
    assert!(!result.directories_created.is_empty());
    assert!(result.directories_removed.is_empty());
    assert!(result.log_file.is_none());
    assert_eq!(snapshot(dir.path()), before);
}

#[test]
fn test_rename_chain_at_execution() {
    let dir = TempDir::new().unwrap();
    let text = dir.path().join("all_Docs/Text");
    fs::create_dir_all(&text).unwrap();
    fs::write(text.join("notes.txt"), "first").unwrap();
    fs::write(dir.path().join("notes.txt"), "second").unwrap();

    let config = OrganizeConfig::default();
    let executor = Executor::from_config(&config, false);

    let result = executor.execute(plan_for(dir.path(), &config));
    assert_eq!(result.files_moved(), 1);
    assert!(result.succeeded[0].destination.ends_with("all_Docs/Text/notes_1.txt"));

    fs::write(dir.path().join("notes.txt"), "third").unwrap();
    let result = executor.execute(plan_for(dir.path(), &config));
    assert!(result.succeeded[0].destination.ends_with("all_Docs/Text/notes_2.txt"));

    assert_eq!(fs::read_to_string(text.join("notes.txt")).unwrap(), "first");
    assert_eq!(fs::read_to_string(text.join("notes_1.txt")).unwrap(), "second");
    assert_eq!(fs::read_to_string(text.join("notes_2.txt")).unwrap(), "third");
}

#[test]
fn test_planned_destinations_match_execution_around_resident_file() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    fs::create_dir_all(root.join("all_Docs/Text")).unwrap();
    fs::write(root.join("all_Docs/Text/notes.txt"), "resident").unwrap();
    fs::write(root.join("notes.txt"), "loose").unwrap();
    fs::create_dir_all(root.join("all_Misc")).unwrap();
    fs::write(root.join("all_Misc/notes.txt"), "misfiled").unwrap();

    let config = OrganizeConfig::default();
    let plan = plan_for(root, &config);
    let resident = plan.root.join("all_Docs/Text/notes.txt");
    let planned: Vec<_> = plan.operations.iter().map(|op| op.destination.clone()).collect();
    assert_eq!(planned.len(), 2);
    assert!(!planned.contains(&resident));

    let result = Executor::from_config(&config, false).execute(plan);
    assert!(result.is_complete_success(), "{:?}", result.failed);
    let executed: Vec<_> = result.succeeded.iter().map(|op| op.destination.clone()).collect();
    assert_eq!(executed, planned);
    assert_eq!(fs::read_to_string(&resident).unwrap(), "resident");
}

#[test]
fn test_skip_policy_fails_the_operation() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    fs::write(root.join("a.txt"), "mine").unwrap();
    fs::create_dir_all(root.join("all_Docs/Text")).unwrap();
    fs::write(root.join("all_Docs/Text/a.txt"), "theirs").unwrap();

    let mut plan = OrganizationPlan::new(root);
    plan.operations
        .push(manual_op(root, "a.txt", "all_Docs/Text/a.txt", ConflictPolicy::Skip));

    let result = Executor::from_config(&OrganizeConfig::default(), false).execute(plan);
    assert_eq!(result.files_failed(), 1);
    assert!(result.failed[0].error.contains("skip"));
    assert_eq!(fs::read_to_string(root.join("a.txt")).unwrap(), "mine");
    assert_eq!(fs::read_to_string(root.join("all_Docs/Text/a.txt")).unwrap(), "theirs");
    assert!(result.log_file.is_none());
}

#[test]
fn test_integrity_mismatch_is_reported_not_rolled_back() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    fs::write(root.join("a.txt"), "actual").unwrap();

    let mut op = manual_op(root, "a.txt", "all_Docs/Text/a.txt", ConflictPolicy::Rename);
    let mut file = (*op.file).clone();
    file.fingerprint = ContentHasher::default().hash_bytes(b"expected");
    op.file = Arc::new(file);

    let mut plan = OrganizationPlan::new(root);
    plan.operations.push(op);

    let options = ExecuteOptions {
        verify_integrity: true,
        ..ExecuteOptions::default()
    };
    let result = Executor::new(options, ContentHasher::default()).execute(plan);
    assert_eq!(result.files_failed(), 1);
    assert!(result.failed[0].error.contains("Integrity"));
    assert!(root.join("all_Docs/Text/a.txt").exists());
}

#[test]
fn test_integrity_check_passes_for_intact_files() {
    let dir = hello_tree();
    let mut config = OrganizeConfig::default();
    config.verify_integrity = true;
    let plan = plan_for(dir.path(), &config);

    let result = Executor::from_config(&config, false).execute(plan);
    assert!(result.is_complete_success(), "{:?}", result.failed);
}

#[test]
fn test_directory_failures_are_recorded() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();

    let mut plan = OrganizationPlan::new(root);
    plan.directory_operations.push(DirectoryMoveOperation::new(
        root.join("vanished"),
        root.join("all_Folders/vanished"),
        ConflictPolicy::Rename,
    ));

    let result = Executor::from_config(&OrganizeConfig::default(), false).execute(plan);
    assert_eq!(result.directories_failed.len(), 1);
    assert!(result.directories_failed[0].error.contains("does not exist"));
    assert!(!result.is_complete_success());
    assert_eq!(result.total_failed(), 1);
}

#[test]
fn test_cleanup_stays_inside_managed_directories() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    fs::write(root.join("a.txt"), "a").unwrap();
    fs::create_dir(root.join("plain")).unwrap();
    fs::create_dir_all(root.join("all_Old/Empty/Nested")).unwrap();
    fs::create_dir_all(root.join("all_Old/.keep")).unwrap();
    fs::create_dir_all(root.join("all_Stale/Gone")).unwrap();
    fs::create_dir_all(root.join("all_Folders/emptyproj")).unwrap();

    let mut plan = OrganizationPlan::new(root);
    plan.operations
        .push(manual_op(root, "a.txt", "all_Docs/Text/a.txt", ConflictPolicy::Rename));

    let result = Executor::from_config(&OrganizeConfig::default(), false).execute(plan);
    assert!(result.is_complete_success());

    assert!(root.exists());
    assert!(root.join("plain").exists());
    assert!(root.join("all_Folders/emptyproj").exists());
    assert!(!root.join("all_Old/Empty").exists());
    // hidden subdirectory keeps its parent alive
    assert!(root.join("all_Old/.keep").exists());
    assert!(!root.join("all_Stale").exists());

    let nested = result
        .directories_removed
        .iter()
        .position(|p| p == &root.join("all_Old/Empty/Nested"))
        .unwrap();
    let parent = result
        .directories_removed
        .iter()
        .position(|p| p == &root.join("all_Old/Empty"))
        .unwrap();
    assert!(nested < parent);
}

#[test]
fn test_report_reflects_execution() {
    let dir = hello_tree();
    let config = OrganizeConfig::default();
    let plan = plan_for(dir.path(), &config);
    let result = Executor::from_config(&config, true).execute(plan);

    let out = TempDir::new().unwrap();
    let path = out.path().join("report.json");
    ExecutionReport::from_result(&result).write_json(&path).unwrap();

    let value: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(value["dry_run"], true);
    assert_eq!(value["summary"]["total_operations"], 4);
    assert_eq!(value["summary"]["failed_operations"], 0);
    assert_eq!(value["duplicates"]["sets_found"], 1);
    assert_eq!(value["duplicates"]["space_recoverable_bytes"], 5);
    assert_eq!(value["operations"]["successful"][0]["reason"], "duplicate");
    assert_eq!(value["directory_operations"]["successful"].as_array().unwrap().len(), 1);
}

#[test]
fn test_checkpoint_tracks_moves_during_the_run() {
    let dir = TempDir::new().unwrap();
    for (name, body) in [("a.txt", "one"), ("b.md", "two"), ("c.pdf", "%PDF three")] {
        fs::write(dir.path().join(name), body).unwrap();
    }
    let config = OrganizeConfig::default();
    let plan = plan_for(dir.path(), &config);
    let root = plan.root.clone();
    assert_eq!(plan.operations.len(), 3);

    let manager = CheckpointManager::new(&root, &config.log_directory);
    let mut recorder = CheckpointRecorder::start(
        manager.clone(),
        Checkpoint::new(&root, plan.total_operations()),
        1,
    );
    assert_eq!(manager.load().unwrap().current_phase, Phase::Execution);

    let mut on_disk = Vec::new();
    let result = Executor::from_config(&config, false).execute_with_progress(plan, |progress| {
        recorder.observe(progress);
        // what an interrupted run would leave behind at this point
        on_disk.push(manager.load().unwrap().completed_hashes.len());
    });
    assert_eq!(on_disk, vec![1, 2, 3, 3]);
    assert_eq!(recorder.checkpoint().completed_operations, 3);

    recorder.finish(&result);
    assert!(!manager.exists());
}

#[test]
fn test_checkpoint_kept_after_partial_failure() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    fs::write(root.join("a.txt"), "a").unwrap();

    let mut plan = OrganizationPlan::new(root);
    plan.operations
        .push(manual_op(root, "a.txt", "all_Docs/Text/a.txt", ConflictPolicy::Rename));
    plan.directory_operations.push(DirectoryMoveOperation::new(
        root.join("vanished"),
        root.join("all_Folders/vanished"),
        ConflictPolicy::Rename,
    ));
    let moved = plan.operations[0].file.fingerprint.clone();

    let manager = CheckpointManager::new(root, ".shelfwise");
    let mut recorder = CheckpointRecorder::start(
        manager.clone(),
        Checkpoint::new(root, plan.total_operations()),
        CheckpointRecorder::DEFAULT_SAVE_EVERY,
    );
    let result = Executor::from_config(&OrganizeConfig::default(), false)
        .execute_with_progress(plan, |progress| recorder.observe(progress));
    recorder.finish(&result);

    let saved = manager.load().unwrap();
    assert_eq!(saved.current_phase, Phase::Cleanup);
    assert_eq!(saved.failed_operations, 1);
    assert!(saved.should_skip(&moved));
}
