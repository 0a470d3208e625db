//! Route Migrator - staged source migration to route-loader conventions
//!
//! Moves a React code base whose pages fetch data in component state onto a
//! loader-based routing layout, in four inspectable stages:
//! - Mock declaration removal with balanced-delimiter span matching
//! - Loader, typed props and error-boundary injection for pages
//! - Advisory validation through an external linter
//! - Integration into `routes/` and `components/`
//!
//! Each stage writes its own tree, so every intermediate result can be
//! inspected. A JSON report and a status file summarise every run.

pub mod cli;
pub mod config;
pub mod discovery;
pub mod error;
pub mod hash;
pub mod pipeline;
pub mod report;
pub mod span;
pub mod stage;

pub use cli::Cli;
pub use config::{ConfigError, LogLevel, PipelineConfig, ValidatorConfig};
pub use discovery::{Category, Discovery, MockAnalysis, SourceFile};
pub use error::{Error, Result};
pub use pipeline::{Pipeline, PipelineIssue, RunSummary, StageCounters};
pub use report::{MigrationReport, PipelineStatus, Reporter};
pub use stage::{FileResult, FileStatus, Stage};
