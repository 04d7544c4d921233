//! In-plan collision resolution.
//!
//! Runs between planning and validation so the validator sees the same
//! destinations the executor will use.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use shelfwise_core::paths::{resolve_lossy, same_location, unique_path};
use shelfwise_core::{ConflictPolicy, OrganizationPlan};

/// Drop no-op moves and give every operation a distinct destination.
///
/// A destination is taken when an earlier operation claimed it, or when
/// something already sits there on disk that no earlier operation moves
/// away. Taken destinations are renamed to the next free `_N` variant, or
/// dropped and recorded as skipped under [`ConflictPolicy::Skip`]. Overwrite
/// keeps an occupied disk destination, which the executor then replaces,
/// but is planned like rename against earlier operations since that would
/// lose a file moved in the same run. Ask is always planned like rename.
pub fn optimize_plan(mut plan: OrganizationPlan) -> OrganizationPlan {
    let before = plan.total_operations();
    let mut claims = Claims::default();

    let mut operations = Vec::with_capacity(plan.operations.len());
    for op in plan.operations.drain(..) {
        if op.is_noop() {
            debug!(path = %op.source.display(), "removing no-op operation");
            continue;
        }
        match claims.claim(&op.source, &op.destination, op.policy) {
            Claim::Free => operations.push(op),
            Claim::Renamed(destination) => {
                info!(source = %op.source.display(), destination = %destination.display(), "renamed conflicting file");
                operations.push(op.with_destination(destination));
            }
            Claim::Skipped => {
                info!(source = %op.source.display(), "skipped conflicting file");
                plan.skipped.push(op.source);
            }
        }
    }
    plan.operations = operations;

    let mut directory_operations = Vec::with_capacity(plan.directory_operations.len());
    for op in plan.directory_operations.drain(..) {
        match claims.claim(&op.source, &op.destination, op.policy) {
            Claim::Free => directory_operations.push(op),
            Claim::Renamed(destination) => directory_operations.push(op.with_destination(destination)),
            Claim::Skipped => plan.skipped.push(op.source),
        }
    }
    plan.directory_operations = directory_operations;

    info!(
        before,
        after = plan.total_operations(),
        skipped = plan.skipped.len(),
        "plan optimized"
    );
    plan
}

enum Claim {
    Free,
    Renamed(PathBuf),
    Skipped,
}

/// Destinations claimed so far, and sources the plan has already moved away.
#[derive(Default)]
struct Claims {
    taken: HashSet<PathBuf>,
    vacated: HashSet<PathBuf>,
}

impl Claims {
    fn on_disk(&self, path: &Path, resolved: &Path) -> bool {
        path.symlink_metadata().is_ok() && !self.vacated.contains(resolved)
    }

    fn is_taken(&self, path: &Path) -> bool {
        let resolved = resolve_lossy(path);
        self.taken.contains(&resolved) || self.on_disk(path, &resolved)
    }

    fn accept(&mut self, source: &Path, destination: &Path) {
        self.taken.insert(resolve_lossy(destination));
        self.vacated.insert(resolve_lossy(source));
    }

    fn claim(&mut self, source: &Path, destination: &Path, policy: ConflictPolicy) -> Claim {
        let resolved = resolve_lossy(destination);
        let in_plan = self.taken.contains(&resolved);
        let on_disk = !in_plan && self.on_disk(destination, &resolved) && !same_location(source, destination);

        if !in_plan && !on_disk {
            self.accept(source, destination);
            return Claim::Free;
        }

        if in_plan {
            warn!(destination = %destination.display(), %policy, "multiple operations target the same destination");
        } else {
            debug!(destination = %destination.display(), %policy, "destination already exists");
        }
        match policy {
            ConflictPolicy::Skip => Claim::Skipped,
            ConflictPolicy::Overwrite if on_disk => {
                self.accept(source, destination);
                Claim::Free
            }
            ConflictPolicy::Rename | ConflictPolicy::Overwrite | ConflictPolicy::Ask => {
                let renamed = unique_path(destination, |candidate| self.is_taken(candidate));
                self.accept(source, &renamed);
                Claim::Renamed(renamed)
            }
        }
    }
}
