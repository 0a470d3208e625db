//! Pipeline orchestration
//!
//! Discovers the source set once, then runs each stage over the complete
//! set before the next stage starts. Per-file failures are recorded and the
//! stage moves on; failing to create a stage's output root aborts the run.

use crate::config::PipelineConfig;
use crate::discovery::{Discovery, SourceFile};
use crate::error::{Error, Result};
use crate::stage::convention::ConventionRewriter;
use crate::stage::integrate::Integrator;
use crate::stage::mock::MockStripper;
use crate::stage::validate::ValidationGate;
use crate::stage::{FileResult, FileStatus, Stage};
use serde::{Deserialize, Serialize};
use std::fs;
use tracing::{Level, debug, error, info, span, warn};

/// Per-stage tallies
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageCounters {
    /// Files the stage wrote output for, warnings included
    pub processed: usize,
    /// Files left alone (existing output kept, or no input)
    pub skipped: usize,
    /// Files that failed in this stage
    pub errors: usize,
}

impl StageCounters {
    /// Files the stage actually attempted
    pub fn attempted(&self) -> usize {
        self.processed + self.errors
    }

    fn record(&mut self, status: FileStatus) {
        match status {
            FileStatus::Processed | FileStatus::Warned => self.processed += 1,
            FileStatus::Skipped => self.skipped += 1,
            FileStatus::Failed => self.errors += 1,
        }
    }
}

/// One entry in the run's error or warning list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineIssue {
    pub stage: Stage,
    pub path: String,
    pub message: String,
}

/// Counters of one stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageSummary {
    pub stage: Stage,
    pub counters: StageCounters,
}

/// Everything a run produced, handed to the reporter
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub total_files: usize,
    /// One entry per stage, in execution order
    pub stages: Vec<StageSummary>,
    pub errors: Vec<PipelineIssue>,
    pub warnings: Vec<PipelineIssue>,
    /// Stage 4 results, one per discovered file
    pub integrated: Vec<FileResult>,
}

impl RunSummary {
    fn new(total_files: usize) -> Self {
        Self {
            total_files,
            stages: Stage::ALL
                .iter()
                .map(|&stage| StageSummary {
                    stage,
                    counters: StageCounters::default(),
                })
                .collect(),
            errors: Vec::new(),
            warnings: Vec::new(),
            integrated: Vec::new(),
        }
    }

    /// Counters of `stage`
    pub fn counters(&self, stage: Stage) -> StageCounters {
        self.stages
            .iter()
            .find(|s| s.stage == stage)
            .map(|s| s.counters)
            .unwrap_or_default()
    }

    /// Attempted files summed over all stages
    pub fn processed_total(&self) -> usize {
        self.stages.iter().map(|s| s.counters.attempted()).sum()
    }

    pub fn error_total(&self) -> usize {
        self.stages.iter().map(|s| s.counters.errors).sum()
    }

    fn record(&mut self, stage: Stage, result: &FileResult) {
        if let Some(summary) = self.stages.iter_mut().find(|s| s.stage == stage) {
            summary.counters.record(result.status);
        }

        let issue = |message: &str| PipelineIssue {
            stage,
            path: result.relative_path.clone(),
            message: message.to_string(),
        };
        match (result.status, result.message.as_deref()) {
            (FileStatus::Failed, Some(message)) => self.errors.push(issue(message)),
            (FileStatus::Failed, None) => self.errors.push(issue("unknown error")),
            (FileStatus::Warned | FileStatus::Skipped, Some(message)) => {
                self.warnings.push(issue(message))
            }
            _ => {}
        }
    }
}

/// Runs the four stages over a discovered source set
pub struct Pipeline {
    config: PipelineConfig,
    files: Option<Vec<SourceFile>>,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            files: None,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Discover and classify the source set; cached for the rest of the run
    pub fn discover(&mut self) -> Result<&[SourceFile]> {
        if self.files.is_none() {
            let files = Discovery::new(&self.config)?.run()?;
            self.files = Some(files);
        }
        Ok(self.files.as_deref().unwrap_or_default())
    }

    /// Run stages 1 → 4
    ///
    /// The configuration is validated first, so a hand-built config with
    /// e.g. `batch_size = 0` is rejected instead of reaching the stage loop.
    pub fn run(&mut self) -> Result<RunSummary> {
        let _span = span!(Level::INFO, "pipeline_run").entered();

        self.config
            .validate()
            .map_err(|e| Error::Config(e.to_string()))?;

        if let Some(stage) = self.config.skip_stage {
            warn!(stage, "--skip-stage is not supported, running every stage");
        }

        self.discover()?;
        let files = self.files.as_deref().unwrap_or_default();
        let config = &self.config;
        let mut summary = RunSummary::new(files.len());

        if files.is_empty() {
            info!("No files to migrate");
            return Ok(summary);
        }
        info!(count = files.len(), "Starting migration");

        let stripper = MockStripper::new(config.scan_mode())?;
        let rewriter = ConventionRewriter::new()?;
        let gate = ValidationGate::new(&config.validator);

        for stage in Stage::ALL {
            let _stage_span = span!(Level::INFO, "stage", number = stage.number()).entered();
            let root = config.stage_dir(stage);
            fs::create_dir_all(&root).map_err(|source| Error::StageRoot {
                stage,
                path: root.clone(),
                source,
            })?;
            info!(%stage, root = %root.display(), "Stage started");

            let batches = files.len().div_ceil(config.batch_size);
            for (index, batch) in files.chunks(config.batch_size).enumerate() {
                for file in batch {
                    let outcome = match stage {
                        Stage::MockRemoval => stripper.process(file, config),
                        Stage::Conventions => rewriter.process(file, config),
                        Stage::Validation => gate.process(file, config),
                        Stage::Integrate => Integrator.process(file, config),
                    };
                    let result = outcome.unwrap_or_else(|e| {
                        error!(file = %file.relative_path, error = %e, "File failed");
                        FileResult::failed(&file.relative_path, e.to_string())
                    });
                    summary.record(stage, &result);
                    if stage == Stage::Integrate {
                        summary.integrated.push(result);
                    }
                }
                debug!(batch = index + 1, batches, "Batch complete");
            }

            let counters = summary.counters(stage);
            info!(
                %stage,
                processed = counters.processed,
                skipped = counters.skipped,
                errors = counters.errors,
                "Stage finished"
            );
        }

        Ok(summary)
    }
}
