//! Machine-readable run reports.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::Serialize;
use tracing::info;

use shelfwise_core::{MoveReason, OrganizationResult};

use crate::error::ReportError;

/// Format version written into reports.
pub const REPORT_VERSION: &str = "1.0";

#[derive(Debug, Clone, Serialize)]
pub struct ExecutionReport {
    pub version: String,
    pub generated_at: DateTime<Local>,
    pub dry_run: bool,
    pub summary: Summary,
    pub duplicates: DuplicateSummary,
    pub operations: OperationsSection,
    pub directory_operations: DirectoryOperationsSection,
    pub directories: DirectoriesSection,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub root_directory: PathBuf,
    pub total_operations: usize,
    pub successful_operations: usize,
    pub failed_operations: usize,
    pub success_rate: f64,
    pub duration_seconds: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DuplicateSummary {
    pub sets_found: usize,
    pub total_duplicates: usize,
    pub space_recoverable_bytes: u64,
    pub duplicate_sets: Vec<DuplicateSetEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DuplicateSetEntry {
    pub fingerprint: String,
    pub count: usize,
    pub size_bytes: u64,
    pub primary: PathBuf,
    pub extras: Vec<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OperationsSection {
    pub successful: Vec<SuccessfulMove>,
    pub failed: Vec<FailedMove>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SuccessfulMove {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub reason: MoveReason,
    pub size_bytes: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedMove {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DirectoryOperationsSection {
    pub successful: Vec<DirectoryMove>,
    pub failed: Vec<FailedMove>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DirectoryMove {
    pub source: PathBuf,
    pub destination: PathBuf,
}

#[derive(Debug, Clone, Serialize)]
pub struct DirectoriesSection {
    pub created: Vec<PathBuf>,
    pub removed: Vec<PathBuf>,
}

impl ExecutionReport {
    pub fn from_result(result: &OrganizationResult) -> Self {
        let plan = &result.plan;

        let duplicate_sets = plan
            .duplicate_sets
            .iter()
            .map(|set| DuplicateSetEntry {
                fingerprint: set.fingerprint().to_string(),
                count: set.count(),
                size_bytes: set.size(),
                primary: set.primary().path.clone(),
                extras: set.extras().map(|f| f.path.clone()).collect(),
            })
            .collect();

        Self {
            version: REPORT_VERSION.to_string(),
            generated_at: Local::now(),
            dry_run: result.dry_run,
            summary: Summary {
                root_directory: plan.root.clone(),
                total_operations: result.total_attempted(),
                successful_operations: result.total_attempted() - result.total_failed(),
                failed_operations: result.total_failed(),
                success_rate: result.success_rate(),
                duration_seconds: result.duration().map(|d| d.as_secs_f64()),
            },
            duplicates: DuplicateSummary {
                sets_found: plan.duplicate_sets.len(),
                total_duplicates: plan.total_duplicates(),
                space_recoverable_bytes: plan.space_recoverable(),
                duplicate_sets,
            },
            operations: OperationsSection {
                successful: result
                    .succeeded
                    .iter()
                    .map(|op| SuccessfulMove {
                        source: op.source.clone(),
                        destination: op.destination.clone(),
                        reason: op.reason,
                        size_bytes: op.file.size,
                    })
                    .collect(),
                failed: result
                    .failed
                    .iter()
                    .map(|f| FailedMove {
                        source: f.operation.source.clone(),
                        destination: f.operation.destination.clone(),
                        error: f.error.clone(),
                    })
                    .collect(),
            },
            directory_operations: DirectoryOperationsSection {
                successful: result
                    .directories_moved
                    .iter()
                    .map(|op| DirectoryMove {
                        source: op.source.clone(),
                        destination: op.destination.clone(),
                    })
                    .collect(),
                failed: result
                    .directories_failed
                    .iter()
                    .map(|f| FailedMove {
                        source: f.operation.source.clone(),
                        destination: f.operation.destination.clone(),
                        error: f.error.clone(),
                    })
                    .collect(),
            },
            directories: DirectoriesSection {
                created: result.directories_created.clone(),
                removed: result.directories_removed.clone(),
            },
            errors: plan.errors.clone(),
        }
    }

    pub fn to_json(&self) -> Result<String, ReportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write_json(&self, path: &Path) -> Result<(), ReportError> {
        let json = self.to_json()?;
        fs::write(path, json).map_err(|source| ReportError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), "report written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shelfwise_core::OrganizationPlan;

    #[test]
    fn test_empty_result_report() {
        let mut result = OrganizationResult::new(OrganizationPlan::new("/r"), true);
        result.mark_complete();
        let report = ExecutionReport::from_result(&result);

        assert!(report.dry_run);
        assert_eq!(report.summary.total_operations, 0);
        assert_eq!(report.summary.success_rate, 100.0);

        let value: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(value["version"], "1.0");
        assert_eq!(value["duplicates"]["sets_found"], 0);
        assert!(value["operations"]["successful"].as_array().unwrap().is_empty());
        assert!(value["directory_operations"]["failed"].as_array().unwrap().is_empty());
    }
}
