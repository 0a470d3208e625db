//! CLI argument parsing with clap

use crate::config::{LogLevel, PipelineConfig};
use clap::Parser;
use std::path::PathBuf;

/// Route Migrator - staged migration of a React source tree to route-loader
/// conventions
///
/// Runs four stages over every discovered file: mock data removal, loader
/// and error-boundary rewriting, external validation, and integration into
/// a `routes/` + `components/` destination tree.
#[derive(Parser, Debug)]
#[command(name = "route-migrator")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to configuration file (TOML format)
    ///
    /// Settings from the file are used as defaults; CLI arguments override
    /// them.
    #[arg(short = 'C', long)]
    pub config: Option<PathBuf>,

    /// Source tree to migrate
    #[arg(short, long)]
    pub source: Option<PathBuf>,

    /// Directory for the intermediate stage trees
    #[arg(short, long)]
    pub work_dir: Option<PathBuf>,

    /// Destination tree
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Directory for the log file, reports and status
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// Files per progress batch
    #[arg(short, long)]
    pub batch_size: Option<usize>,

    /// Log verbosity
    #[arg(short, long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Skip a stage (accepted, not honoured)
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=4))]
    pub skip_stage: Option<u8>,

    /// Discover and print the migration plan without running any stage
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Reprocess files whose stage output already exists
    #[arg(long)]
    pub no_skip_existing: bool,

    /// Do not keep `.bak` copies of replaced outputs
    #[arg(long)]
    pub no_backups: bool,

    /// JSON manifest of files known to contain mock data
    #[arg(long)]
    pub mock_analysis: Option<PathBuf>,

    /// Count delimiters inside string literals and comments too
    #[arg(long)]
    pub blind_spans: bool,

    /// Validator program (default: npx)
    #[arg(long)]
    pub validator: Option<String>,

    /// Print the result of every file after the run
    #[arg(short, long)]
    pub verbose: bool,

    /// Print a sample configuration file and exit
    #[arg(long)]
    pub print_config: bool,
}

impl Cli {
    /// Merge CLI arguments with config from file
    /// CLI arguments take precedence over config file settings
    pub fn merge_with_config(&self, mut config: PipelineConfig) -> PipelineConfig {
        if let Some(ref source) = self.source {
            config.source_dir = source.clone();
        }
        if let Some(ref work_dir) = self.work_dir {
            config.work_dir = work_dir.clone();
        }
        if let Some(ref output) = self.output {
            config.output_dir = output.clone();
        }
        if let Some(ref log_dir) = self.log_dir {
            config.log_dir = Some(log_dir.clone());
        }
        if let Some(batch_size) = self.batch_size {
            config.batch_size = batch_size;
        }
        if let Some(log_level) = self.log_level {
            config.log_level = log_level;
        }
        if let Some(stage) = self.skip_stage {
            config.skip_stage = Some(stage);
        }
        if self.dry_run {
            config.dry_run = true;
        }
        if self.no_skip_existing {
            config.skip_existing = false;
        }
        if self.no_backups {
            config.create_backups = false;
        }
        if let Some(ref manifest) = self.mock_analysis {
            config.mock_analysis = Some(manifest.clone());
        }
        if self.blind_spans {
            config.literal_aware_spans = false;
        }
        if let Some(ref program) = self.validator {
            config.validator.program = program.clone();
        }

        config
    }

    /// Convert CLI arguments to a config (when no config file is used)
    pub fn to_config(&self) -> PipelineConfig {
        self.merge_with_config(PipelineConfig::default())
    }
}
