//! Run report and status artifacts
//!
//! Each run leaves one timestamped report that is never overwritten, and
//! replaces the single status file that describes the latest run.

use crate::config::PipelineConfig;
use crate::error::{Error, Result};
use crate::pipeline::{PipelineIssue, RunSummary, StageCounters};
use crate::stage::Stage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// Success rate above which a migration counts as complete
pub const COMPLETION_THRESHOLD: f64 = 80.0;

/// `(attempted - errors) / attempted * 100`, or 0 when nothing was attempted
pub fn success_rate(processed_total: usize, error_total: usize) -> f64 {
    if processed_total == 0 {
        return 0.0;
    }
    let succeeded = processed_total.saturating_sub(error_total);
    succeeded as f64 / processed_total as f64 * 100.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageReport {
    pub stage: Stage,
    pub number: u8,
    #[serde(flatten)]
    pub counters: StageCounters,
}

/// Historical record of one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationReport {
    pub timestamp: DateTime<Utc>,
    pub total_files: usize,
    pub stages: Vec<StageReport>,
    pub errors: Vec<PipelineIssue>,
    pub warnings: Vec<PipelineIssue>,
    pub success_rate: f64,
}

impl MigrationReport {
    pub fn from_summary(summary: &RunSummary, timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            total_files: summary.total_files,
            stages: summary
                .stages
                .iter()
                .map(|s| StageReport {
                    stage: s.stage,
                    number: s.stage.number(),
                    counters: s.counters,
                })
                .collect(),
            errors: summary.errors.clone(),
            warnings: summary.warnings.clone(),
            success_rate: success_rate(summary.processed_total(), summary.error_total()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageStatus {
    pub stage: Stage,
    pub processed: usize,
    pub errors: usize,
    /// Every discovered file was accounted for by this stage
    pub completed: bool,
}

/// Latest-run summary, overwritten every run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineStatus {
    pub updated_at: DateTime<Utc>,
    pub stages: Vec<StageStatus>,
    pub success_rate: f64,
    pub migration_complete: bool,
}

impl PipelineStatus {
    pub fn from_report(report: &MigrationReport) -> Self {
        Self {
            updated_at: report.timestamp,
            stages: report
                .stages
                .iter()
                .map(|s| StageStatus {
                    stage: s.stage,
                    processed: s.counters.processed,
                    errors: s.counters.errors,
                    completed: s.counters.processed + s.counters.skipped + s.counters.errors
                        == report.total_files,
                })
                .collect(),
            success_rate: report.success_rate,
            migration_complete: report.success_rate > COMPLETION_THRESHOLD,
        }
    }
}

/// Writes report and status artifacts below the configured log directory
pub struct Reporter<'a> {
    config: &'a PipelineConfig,
}

impl<'a> Reporter<'a> {
    pub fn new(config: &'a PipelineConfig) -> Self {
        Self { config }
    }

    /// Write a new `migration-report-YYYYMMDD_HHMMSS.json`
    ///
    /// A numeric suffix is added when a report with the same second already
    /// exists.
    pub fn write_report(&self, report: &MigrationReport) -> Result<PathBuf> {
        let dir = self.config.reports_dir();
        fs::create_dir_all(&dir)?;

        let stem = format!(
            "migration-report-{}",
            report.timestamp.format("%Y%m%d_%H%M%S")
        );
        let mut attempt = 0u32;
        let (path, file) = loop {
            let name = if attempt == 0 {
                format!("{stem}.json")
            } else {
                format!("{stem}-{attempt}.json")
            };
            let path = dir.join(name);
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => break (path, file),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => attempt += 1,
                Err(e) => {
                    return Err(Error::Report(format!(
                        "Failed to create report {}: {}",
                        path.display(),
                        e
                    )));
                }
            }
        };

        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, report)?;
        writer.flush()?;

        info!(report = %path.display(), success_rate = report.success_rate, "Saved migration report");
        Ok(path)
    }

    /// Replace the status file via a temp file and rename
    pub fn write_status(&self, status: &PipelineStatus) -> Result<PathBuf> {
        let path = self.config.status_file();
        write_json_atomic(&path, status)?;
        info!(
            status = %path.display(),
            migration_complete = status.migration_complete,
            "Updated migration status"
        );
        Ok(path)
    }
}

fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let content = serde_json::to_string_pretty(value)?;
    let temp_path = path.with_extension("tmp");
    fs::write(&temp_path, content)
        .map_err(|e| Error::Report(format!("Failed to write {}: {}", temp_path.display(), e)))?;
    fs::rename(&temp_path, path)
        .map_err(|e| Error::Report(format!("Failed to rename status file: {}", e)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::StageSummary;
    use chrono::TimeZone;
    use tempfile::tempdir;

    fn summary(processed: usize, errors: usize) -> RunSummary {
        RunSummary {
            total_files: processed + errors,
            stages: Stage::ALL
                .iter()
                .map(|&stage| StageSummary {
                    stage,
                    counters: StageCounters {
                        processed,
                        skipped: 0,
                        errors,
                    },
                })
                .collect(),
            errors: Vec::new(),
            warnings: Vec::new(),
            integrated: Vec::new(),
        }
    }

    fn timestamp() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap()
    }

    #[test]
    fn test_success_rate_arithmetic() {
        assert_eq!(success_rate(0, 0), 0.0);
        assert_eq!(success_rate(20, 0), 100.0);
        assert_eq!(success_rate(10, 5), 50.0);

        let report = MigrationReport::from_summary(&summary(5, 0), timestamp());
        assert_eq!(report.success_rate, 100.0);
        assert_eq!(report.total_files, 5);

        let report = MigrationReport::from_summary(&summary(0, 0), timestamp());
        assert_eq!(report.success_rate, 0.0);
    }

    #[test]
    fn test_migration_complete_threshold() {
        // 4 of 5 attempts succeed in every stage: exactly 80%, not above
        let report = MigrationReport::from_summary(&summary(4, 1), timestamp());
        let status = PipelineStatus::from_report(&report);
        assert_eq!(status.success_rate, 80.0);
        assert!(!status.migration_complete);
        assert!(status.stages.iter().all(|s| s.completed));

        let report = MigrationReport::from_summary(&summary(9, 1), timestamp());
        assert!(PipelineStatus::from_report(&report).migration_complete);
    }

    #[test]
    fn test_reports_are_never_overwritten() {
        let dir = tempdir().unwrap();
        let config = PipelineConfig {
            log_dir: Some(dir.path().to_path_buf()),
            ..PipelineConfig::default()
        };
        let reporter = Reporter::new(&config);
        let report = MigrationReport::from_summary(&summary(3, 0), timestamp());

        let first = reporter.write_report(&report).unwrap();
        let second = reporter.write_report(&report).unwrap();

        assert_eq!(
            first.file_name().unwrap(),
            "migration-report-20260314_092653.json"
        );
        assert_eq!(
            second.file_name().unwrap(),
            "migration-report-20260314_092653-1.json"
        );
        let saved: MigrationReport =
            serde_json::from_str(&fs::read_to_string(&first).unwrap()).unwrap();
        assert_eq!(saved, report);
    }

    #[test]
    fn test_status_is_replaced() {
        let dir = tempdir().unwrap();
        let config = PipelineConfig {
            log_dir: Some(dir.path().to_path_buf()),
            ..PipelineConfig::default()
        };
        let reporter = Reporter::new(&config);

        let failing = MigrationReport::from_summary(&summary(1, 4), timestamp());
        reporter.write_status(&PipelineStatus::from_report(&failing)).unwrap();
        let passing = MigrationReport::from_summary(&summary(5, 0), timestamp());
        let path = reporter.write_status(&PipelineStatus::from_report(&passing)).unwrap();

        let saved: PipelineStatus = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert!(saved.migration_complete);
        assert!(!path.with_extension("tmp").exists());
    }
}
