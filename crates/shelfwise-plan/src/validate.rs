//! Read-only safety checks on a finalized plan.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use humansize::{BINARY, format_size};
use itertools::Itertools;
use sysinfo::Disks;
use tracing::debug;

use shelfwise_core::OrganizationPlan;
use shelfwise_core::paths::resolve_lossy;

const PROBE_FILE_NAME: &str = ".shelfwise_write_probe";

/// Fraction of moved bytes reserved for cross-filesystem moves.
const SPACE_BUFFER: f64 = 0.1;

/// Utilization above which free space is reported as tight.
const TIGHT_SPACE_RATIO: f64 = 0.9;

/// Errors block execution; warnings are advisory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    /// No blocking problems were found.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Errors: {}", self.errors.len())?;
        for error in &self.errors {
            writeln!(f, "  error: {error}")?;
        }
        writeln!(f, "Warnings: {}", self.warnings.len())?;
        for warning in &self.warnings {
            writeln!(f, "  warning: {warning}")?;
        }
        Ok(())
    }
}

/// Checks a plan without changing it.
///
/// The only filesystem writes are short-lived probe files used to test
/// write permission.
#[derive(Debug, Clone, Default)]
pub struct Validator {
    available_space: Option<u64>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a fixed free-space figure instead of asking the OS.
    pub fn with_available_space(mut self, bytes: u64) -> Self {
        self.available_space = Some(bytes);
        self
    }

    /// Run every check over `plan`.
    pub fn validate(&self, plan: &OrganizationPlan) -> ValidationReport {
        let mut report = ValidationReport::default();

        check_root(plan, &mut report);
        self.check_space(plan, &mut report);
        check_permissions(plan, &mut report);
        check_containment(plan, &mut report);
        check_destinations(plan, &mut report);
        check_sources(plan, &mut report);

        debug!(
            errors = report.errors.len(),
            warnings = report.warnings.len(),
            "plan validated"
        );
        report
    }

    fn check_space(&self, plan: &OrganizationPlan, report: &mut ValidationReport) {
        if plan.operations.is_empty() {
            return;
        }

        let available = match self.available_space.or_else(|| available_space(&plan.root)) {
            Some(bytes) => bytes,
            None => {
                report.warn(format!(
                    "Could not determine free space for {}",
                    plan.root.display()
                ));
                return;
            }
        };
        let required = (plan.total_bytes() as f64 * SPACE_BUFFER) as u64;

        if required > available {
            report.error(format!(
                "Insufficient disk space: required {}, available {}",
                format_size(required, BINARY),
                format_size(available, BINARY)
            ));
        } else if required as f64 > available as f64 * TIGHT_SPACE_RATIO {
            report.warn(format!(
                "Disk space is tight: operation will use {:.1}% of available space",
                required as f64 / available as f64 * 100.0
            ));
        }
    }
}

/// Free space on the filesystem holding `path`.
///
/// Picks the disk with the longest mount point that prefixes the path.
pub fn available_space(path: &Path) -> Option<u64> {
    let path = resolve_lossy(path);
    let disks = Disks::new_with_refreshed_list();
    disks
        .list()
        .iter()
        .filter(|disk| path.starts_with(disk.mount_point()))
        .max_by_key(|disk| disk.mount_point().as_os_str().len())
        .map(|disk| disk.available_space())
}

fn check_root(plan: &OrganizationPlan, report: &mut ValidationReport) {
    let root = &plan.root;
    if !root.exists() {
        report.error(format!("Root directory does not exist: {}", root.display()));
    } else if !root.is_dir() {
        report.error(format!("Root path is not a directory: {}", root.display()));
    } else if let Err(err) = fs::read_dir(root) {
        report.error(format!("Cannot list root directory {}: {err}", root.display()));
    }
}

fn check_permissions(plan: &OrganizationPlan, report: &mut ValidationReport) {
    let parents = plan
        .operations
        .iter()
        .map(|op| &op.destination)
        .chain(plan.directory_operations.iter().map(|op| &op.destination))
        .filter_map(|dest| dest.parent())
        .unique();

    let mut probed: HashMap<PathBuf, bool> = HashMap::new();
    for parent in parents {
        let Some(existing) = parent.ancestors().find(|p| p.is_dir()) else {
            continue;
        };
        let writable = *probed
            .entry(existing.to_path_buf())
            .or_insert_with(|| is_writable(existing));
        if writable {
            continue;
        }
        if existing == parent {
            report.error(format!("No write permission for directory: {}", parent.display()));
        } else {
            report.error(format!("No permission to create directory: {}", parent.display()));
        }
    }
}

fn is_writable(dir: &Path) -> bool {
    let probe = dir.join(PROBE_FILE_NAME);
    fs::File::create(&probe)
        .and_then(|_| fs::remove_file(&probe))
        .is_ok()
}

fn check_containment(plan: &OrganizationPlan, report: &mut ValidationReport) {
    let file_moves = plan.operations.iter().map(|op| (&op.source, &op.destination));
    let dir_moves = plan
        .directory_operations
        .iter()
        .map(|op| (&op.source, &op.destination));

    for (source, destination) in file_moves.chain(dir_moves) {
        let source = resolve_lossy(source);
        let target = resolve_lossy(destination);
        if target != source && target.starts_with(&source) {
            report.error(format!(
                "Cannot move {} into itself ({})",
                source.display(),
                destination.display()
            ));
        }
    }

    for op in plan.operations.iter().filter(|op| op.file.is_symlink) {
        if op.source.canonicalize().is_err() {
            report.warn(format!("Symlink cannot be resolved: {}", op.source.display()));
        }
    }
}

fn check_destinations(plan: &OrganizationPlan, report: &mut ValidationReport) {
    let moves = plan
        .operations
        .iter()
        .map(|op| (&op.source, &op.destination, op.policy))
        .chain(
            plan.directory_operations
                .iter()
                .map(|op| (&op.source, &op.destination, op.policy)),
        );

    let mut targets: HashMap<PathBuf, &PathBuf> = HashMap::new();
    for (source, destination, policy) in moves {
        let resolved = resolve_lossy(destination);

        if destination.exists() && resolved != resolve_lossy(source) {
            report.warn(format!(
                "Destination already exists and will be resolved by {policy}: {}",
                destination.display()
            ));
        }

        match targets.get(&resolved) {
            Some(previous) => report.error(format!(
                "Multiple operations target {}: {} and {}",
                resolved.display(),
                previous.display(),
                source.display()
            )),
            None => {
                targets.insert(resolved, source);
            }
        }
    }
}

fn check_sources(plan: &OrganizationPlan, report: &mut ValidationReport) {
    let mut seen: HashSet<&Path> = HashSet::new();
    for op in &plan.operations {
        if !seen.insert(op.source.as_path()) {
            continue;
        }
        if !op.source.exists() {
            report.error(format!("Source file does not exist: {}", op.source.display()));
        } else if !op.source.is_file() {
            report.error(format!("Source is not a file: {}", op.source.display()));
        }
    }
    for op in &plan.directory_operations {
        if !op.source.is_dir() {
            report.error(format!("Source is not a directory: {}", op.source.display()));
        }
    }
}
