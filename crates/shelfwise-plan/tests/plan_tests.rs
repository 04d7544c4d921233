use shelfwise_analyze::Capabilities;
use shelfwise_core::{ConflictPolicy, MoveReason, OrganizationPlan, OrganizeConfig};
use shelfwise_plan::{Planner, Validator, optimize_plan};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn planner(config: OrganizeConfig) -> Planner {
    Planner::new(config, &Capabilities::none())
}

/// Carry out a plan with plain renames.
fn apply(plan: &OrganizationPlan) {
    for op in &plan.operations {
        fs::create_dir_all(op.destination.parent().unwrap()).unwrap();
        fs::rename(&op.source, &op.destination).unwrap();
    }
    for op in &plan.directory_operations {
        fs::create_dir_all(op.destination.parent().unwrap()).unwrap();
        fs::rename(&op.source, &op.destination).unwrap();
    }
}

fn hello_tree() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("a.txt"), "hello").unwrap();
    fs::write(dir.path().join("b.txt"), "hello").unwrap();
    fs::write(dir.path().join("c.pdf"), "%PDF-1.4 body").unwrap();
    dir
}

#[test]
fn test_duplicate_scenario() {
    let dir = hello_tree();
    let plan = planner(OrganizeConfig::default()).create_plan(dir.path()).unwrap();
    let root = plan.root.clone();

    assert_eq!(plan.duplicate_sets.len(), 1);
    assert_eq!(plan.duplicate_sets[0].count(), 2);
    assert_eq!(plan.total_duplicates(), 1);
    assert_eq!(plan.space_recoverable(), 5);
    assert_eq!(plan.total_files(), 3);

    let dup = &plan.operations[0];
    assert_eq!(dup.reason, MoveReason::Duplicate);
    assert_eq!(dup.source, root.join("b.txt"));
    assert_eq!(dup.destination, root.join("all_Duplicates/b.txt"));

    let primary = &plan.operations[1];
    assert_eq!(primary.reason, MoveReason::Classify);
    assert_eq!(primary.source, root.join("a.txt"));
    assert_eq!(primary.destination, root.join("all_Docs/Text/a.txt"));

    let pdf = &plan.operations[2];
    assert_eq!(pdf.destination, root.join("all_Docs/PDFs/c.pdf"));

    let categories: Vec<_> = plan.categories_used().into_iter().collect();
    assert_eq!(categories, vec!["all_Docs", "all_Duplicates"]);
    assert!(plan.errors.is_empty());
}

#[test]
fn test_second_run_is_empty() {
    let dir = hello_tree();
    fs::create_dir(dir.path().join("project")).unwrap();
    fs::write(dir.path().join("project/readme.md"), "# hi").unwrap();

    let planner = planner(OrganizeConfig::default());
    let first = optimize_plan(planner.create_plan(dir.path()).unwrap());
    assert_eq!(first.directory_operations.len(), 1);
    apply(&first);

    let second = optimize_plan(planner.create_plan(dir.path()).unwrap());
    assert!(second.is_empty(), "unexpected operations: {:?}", second.operations);
    assert!(dir.path().join("all_Folders/project/readme.md").exists());
}

#[test]
fn test_isolated_copy_stays_isolated_on_rerun() {
    let dir = TempDir::new().unwrap();
    // in-bucket path is shorter than the classified path
    fs::write(dir.path().join("aa.jpg"), "pixels").unwrap();
    fs::write(dir.path().join("bb.jpg"), "pixels").unwrap();

    let planner = planner(OrganizeConfig::default());
    apply(&optimize_plan(planner.create_plan(dir.path()).unwrap()));
    assert!(dir.path().join("all_Pics/Photos/aa.jpg").exists());
    assert!(dir.path().join("all_Duplicates/bb.jpg").exists());

    let again = planner.create_plan(dir.path()).unwrap();
    assert_eq!(again.duplicate_sets.len(), 1);
    assert!(again.duplicate_sets[0].primary().path.ends_with("all_Pics/Photos/aa.jpg"));
    assert!(again.is_empty());
}

#[test]
fn test_detection_disabled_classifies_everything() {
    let dir = hello_tree();
    let mut config = OrganizeConfig::default();
    config.detect_duplicates = false;
    let plan = planner(config).create_plan(dir.path()).unwrap();

    assert!(plan.duplicate_sets.is_empty());
    assert_eq!(plan.operations.len(), 3);
    assert!(plan.operations.iter().all(|op| op.reason == MoveReason::Classify));
}

#[test]
fn test_isolation_disabled_leaves_extras() {
    let dir = hello_tree();
    let mut config = OrganizeConfig::default();
    config.isolate_duplicates = false;
    let plan = planner(config).create_plan(dir.path()).unwrap();

    assert_eq!(plan.duplicate_sets.len(), 1);
    assert_eq!(plan.operations.len(), 2);
    assert_eq!(plan.skipped, vec![plan.root.join("b.txt")]);
}

/// Three different files that all classify to `all_Docs/Text/notes.txt`.
fn colliding_tree() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    fs::write(root.join("notes.txt"), "one").unwrap();
    fs::create_dir_all(root.join("all_Misc/Old")).unwrap();
    fs::write(root.join("all_Misc/Old/notes.txt"), "two").unwrap();
    fs::create_dir_all(root.join("all_Archive")).unwrap();
    fs::write(root.join("all_Archive/notes.txt"), "three").unwrap();
    dir
}

fn with_policy(policy: ConflictPolicy) -> OrganizeConfig {
    let mut config = OrganizeConfig::default();
    config.conflict_policy = policy;
    config
}

#[test]
fn test_rename_collisions_get_distinct_destinations() {
    let dir = colliding_tree();
    // pre-existing file takes the first suffix
    fs::create_dir_all(dir.path().join("all_Docs/Text")).unwrap();
    fs::write(dir.path().join("all_Docs/Text/notes_1.txt"), "resident").unwrap();

    let plan = planner(with_policy(ConflictPolicy::Rename))
        .create_plan(dir.path())
        .unwrap();
    let text = plan.root.join("all_Docs/Text");
    let plan = optimize_plan(plan);

    let mut dests: Vec<_> = plan
        .operations
        .iter()
        .filter(|op| op.destination.parent() == Some(text.as_path()))
        .map(|op| op.destination.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    dests.sort();
    // notes_1.txt is resident and already in place, so it gets no operation
    assert_eq!(dests, vec!["notes.txt", "notes_2.txt", "notes_3.txt"]);

    let report = Validator::new().validate(&plan);
    assert!(report.is_valid(), "{report}");
}

#[test]
fn test_skip_collisions_keep_one_operation() {
    let dir = colliding_tree();
    let plan = planner(with_policy(ConflictPolicy::Skip))
        .create_plan(dir.path())
        .unwrap();
    let target = plan.root.join("all_Docs/Text/notes.txt");
    let plan = optimize_plan(plan);

    let to_target = plan
        .operations
        .iter()
        .filter(|op| op.destination == target)
        .count();
    assert_eq!(to_target, 1);
    assert_eq!(plan.skipped.len(), 2);
}

#[test]
fn test_validator_flags_problems() {
    let dir = hello_tree();
    let plan = planner(OrganizeConfig::default()).create_plan(dir.path()).unwrap();

    // an existing destination is a warning
    fs::create_dir_all(plan.root.join("all_Docs/PDFs")).unwrap();
    fs::write(plan.root.join("all_Docs/PDFs/c.pdf"), "other").unwrap();
    let report = Validator::new().with_available_space(u64::MAX).validate(&plan);
    assert!(report.is_valid(), "{report}");
    assert!(report.warnings.iter().any(|w| w.contains("c.pdf")));

    // a vanished source is an error
    fs::remove_file(plan.root.join("a.txt")).unwrap();
    let report = Validator::new().with_available_space(u64::MAX).validate(&plan);
    assert!(!report.is_valid());
    assert!(report.errors.iter().any(|e| e.contains("does not exist")));
}

#[test]
fn test_validator_space_and_collisions() {
    let dir = hello_tree();
    let mut plan = planner(OrganizeConfig::default()).create_plan(dir.path()).unwrap();

    // 10% of 23 bytes rounds down to 2
    let report = Validator::new().with_available_space(1).validate(&plan);
    assert!(report.errors.iter().any(|e| e.contains("Insufficient disk space")));

    let report = Validator::new().with_available_space(2).validate(&plan);
    assert!(report.is_valid());
    assert!(report.warnings.iter().any(|w| w.contains("tight")));

    let clash = plan.operations[2].with_destination(plan.operations[1].destination.clone());
    plan.operations.push(clash);
    let report = Validator::new().with_available_space(u64::MAX).validate(&plan);
    assert!(report.errors.iter().any(|e| e.contains("Multiple operations")));
}

#[test]
fn test_validator_rejects_move_into_itself() {
    let dir = TempDir::new().unwrap();
    fs::create_dir(dir.path().join("photos")).unwrap();
    let root = dir.path().canonicalize().unwrap();

    let mut plan = OrganizationPlan::new(&root);
    plan.directory_operations.push(shelfwise_core::DirectoryMoveOperation::new(
        root.join("photos"),
        root.join("photos/inner"),
        ConflictPolicy::Rename,
    ));
    let report = Validator::new().validate(&plan);
    assert!(report.errors.iter().any(|e| e.contains("into itself")));
}

#[test]
fn test_missing_root_is_precondition_error() {
    let result = planner(OrganizeConfig::default()).create_plan(Path::new("/no/such/dir/here"));
    assert!(result.is_err());
}
