//! Turning a directory into an [`OrganizationPlan`].

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use shelfwise_analyze::{Capabilities, Classifier, DuplicateGrouper};
use shelfwise_core::{
    DirectoryMoveOperation, FileInfo, Fingerprint, MoveOperation, MoveReason, OrganizationPlan,
    OrganizeConfig, ScanError, paths::resolve_lossy,
};
use shelfwise_scan::{ContentHasher, Scanner, build_inventory};

/// Builds organization plans for one configuration.
pub struct Planner {
    config: OrganizeConfig,
    scanner: Scanner,
    hasher: ContentHasher,
    classifier: Classifier,
    grouper: DuplicateGrouper,
    completed: HashSet<Fingerprint>,
}

impl Planner {
    /// Create a planner from settings and resolved capabilities.
    pub fn new(config: OrganizeConfig, capabilities: &Capabilities) -> Self {
        Self {
            scanner: Scanner::new(&config),
            hasher: ContentHasher::from_config(&config),
            classifier: Classifier::from_config(&config, capabilities),
            grouper: DuplicateGrouper::from_config(&config, capabilities),
            completed: HashSet::new(),
            config,
        }
    }

    /// Leave files with these fingerprints alone, e.g. when resuming from
    /// a checkpoint.
    pub fn with_completed(mut self, fingerprints: impl IntoIterator<Item = Fingerprint>) -> Self {
        self.completed.extend(fingerprints);
        self
    }

    /// Settings this planner was built from.
    pub fn config(&self) -> &OrganizeConfig {
        &self.config
    }

    /// The hasher used for fingerprints.
    pub fn hasher(&self) -> &ContentHasher {
        &self.hasher
    }

    /// Plan the organization of `root`.
    pub fn create_plan(&self, root: &Path) -> Result<OrganizationPlan, ScanError> {
        self.create_plan_with_progress(root, |_, _| {})
    }

    /// Plan the organization of `root`, reporting hashing progress.
    ///
    /// Only an unusable root is an error. Problems with individual files end
    /// up in [`OrganizationPlan::errors`].
    pub fn create_plan_with_progress<F>(
        &self,
        root: &Path,
        progress: F,
    ) -> Result<OrganizationPlan, ScanError>
    where
        F: Fn(usize, usize) + Sync,
    {
        info!(root = %root.display(), "creating organization plan");

        let scan = self.scanner.scan(root)?;
        let mut plan = OrganizationPlan::new(&scan.root);
        plan.errors
            .extend(scan.errors.iter().map(ToString::to_string));

        let workers = self
            .config
            .parallel_hashing
            .then_some(self.config.hash_workers);
        let inventory = build_inventory(&scan.files, &self.hasher, workers, progress);
        plan.errors
            .extend(inventory.errors.iter().map(ToString::to_string));

        let (files, resumed): (Vec<_>, Vec<_>) = inventory
            .files
            .into_iter()
            .partition(|f| !self.completed.contains(&f.fingerprint));
        plan.skipped.extend(resumed.iter().map(|f| f.path.clone()));

        if self.config.detect_duplicates {
            let grouper = self
                .grouper
                .clone()
                .with_isolation_dir(plan.root.join(self.config.duplicates_dir_name()));
            plan.duplicate_sets = grouper.group(&files);
        }

        let extras: HashSet<&Path> = plan
            .duplicate_sets
            .iter()
            .flat_map(|set| set.extras().map(|f| f.path.as_path()))
            .collect();

        let mut operations = Vec::with_capacity(files.len());
        if self.config.isolate_duplicates {
            for set in &plan.duplicate_sets {
                for file in set.extras() {
                    self.push_operation(&mut operations, &plan.root, file, MoveReason::Duplicate);
                }
            }
        } else {
            plan.skipped.extend(extras.iter().map(|p| p.to_path_buf()));
        }

        for file in files.iter().filter(|f| !extras.contains(f.path.as_path())) {
            self.push_operation(&mut operations, &plan.root, file, MoveReason::Classify);
        }
        plan.operations = operations;

        plan.directory_operations = self.directory_operations(&plan.root, &scan.directories);

        info!(
            operations = plan.operations.len(),
            directory_operations = plan.directory_operations.len(),
            duplicates = plan.total_duplicates(),
            "plan created"
        );
        Ok(plan)
    }

    /// Plan a single file that appeared under `root`.
    ///
    /// The file is classified without duplicate grouping.
    pub fn plan_file(&self, root: &Path, path: &Path) -> Result<OrganizationPlan, ScanError> {
        let root = root.canonicalize().map_err(|e| ScanError::io(root, e))?;
        let mut plan = OrganizationPlan::new(&root);

        let path = resolve_lossy(path);
        let inventory = build_inventory(&[path], &self.hasher, None, |_, _| {});
        plan.errors
            .extend(inventory.errors.iter().map(ToString::to_string));

        let mut operations = Vec::new();
        for file in &inventory.files {
            if self.completed.contains(&file.fingerprint) {
                plan.skipped.push(file.path.clone());
                continue;
            }
            self.push_operation(&mut operations, &root, file, MoveReason::Classify);
        }
        plan.operations = operations;
        Ok(plan)
    }

    fn push_operation(
        &self,
        operations: &mut Vec<MoveOperation>,
        root: &Path,
        file: &Arc<FileInfo>,
        reason: MoveReason,
    ) {
        let destination = self.classifier.destination(file, root, reason);
        let operation = MoveOperation::new(
            Arc::clone(file),
            destination,
            reason,
            self.config.conflict_policy,
        );
        if operation.is_noop() {
            debug!(path = %file.path.display(), %reason, "already in place");
            return;
        }
        operations.push(operation);
    }

    fn directory_operations(&self, root: &Path, directories: &[PathBuf]) -> Vec<DirectoryMoveOperation> {
        let folders_dir = root.join(self.config.folders_dir_name());

        directories
            .iter()
            .filter(|dir| dir.parent() != Some(folders_dir.as_path()))
            .filter_map(|dir| {
                let name = dir.file_name()?;
                if self.config.is_managed_name(&name.to_string_lossy())
                    || name == self.config.log_directory.as_str()
                {
                    return None;
                }
                Some(DirectoryMoveOperation::new(
                    dir,
                    folders_dir.join(name),
                    self.config.conflict_policy,
                ))
            })
            .collect()
    }
}
