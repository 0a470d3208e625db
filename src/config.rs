//! Configuration types for the route migrator

use crate::span::ScanMode;
use crate::stage::Stage;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::Level;

/// Log verbosity accepted by `--log-level`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    #[value(name = "DEBUG", alias = "debug")]
    Debug,
    #[default]
    #[value(name = "INFO", alias = "info")]
    Info,
    #[value(name = "WARN", alias = "warn")]
    Warn,
    #[value(name = "ERROR", alias = "error")]
    Error,
}

impl LogLevel {
    /// Matching `tracing` level
    pub fn as_tracing_level(&self) -> Level {
        match self {
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

/// External validator invocation: `<program> <args..> <fix_flag> <file>`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    pub program: String,
    pub args: Vec<String>,
    /// Flag that asks the validator to auto-fix in place
    pub fix_flag: String,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            program: "npx".into(),
            args: vec!["eslint".into()],
            fix_flag: "--fix".into(),
        }
    }
}

/// Configuration for a pipeline run
///
/// Built once from defaults, an optional TOML file and CLI overrides, then
/// passed by reference to every stage. Nothing mutates it afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Root of the source tree to migrate
    pub source_dir: PathBuf,

    /// Parent directory of the three intermediate stage trees
    pub work_dir: PathBuf,

    /// Final destination tree (`routes/` and `components/`)
    pub output_dir: PathBuf,

    /// Log, report and status directory (defaults to `<work_dir>/logs`)
    pub log_dir: Option<PathBuf>,

    /// Files per progress batch
    pub batch_size: usize,

    pub log_level: LogLevel,

    /// Leave existing stage 1 and stage 4 outputs untouched
    pub skip_existing: bool,

    /// Keep a `.bak` copy of a stage output before replacing it
    pub create_backups: bool,

    /// Skip string literals and comments while matching delimiters
    pub literal_aware_spans: bool,

    /// Optional manifest of files known to contain mock declarations
    pub mock_analysis: Option<PathBuf>,

    /// File extensions (lowercase, no dot) to migrate
    pub extensions: Vec<String>,

    /// Folder names excluded from discovery
    pub exclude_dirs: Vec<String>,

    pub validator: ValidatorConfig,

    /// Accepted for compatibility, not consulted by the pipeline
    pub skip_stage: Option<u8>,

    /// Discover and report the plan without running any stage
    pub dry_run: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("src"),
            work_dir: PathBuf::from("migration"),
            output_dir: PathBuf::from("app"),
            log_dir: None,
            batch_size: 10,
            log_level: LogLevel::default(),
            skip_existing: true,
            create_backups: true,
            literal_aware_spans: true,
            mock_analysis: None,
            extensions: vec!["ts".into(), "tsx".into(), "js".into(), "jsx".into()],
            exclude_dirs: vec![
                "node_modules".into(),
                "dist".into(),
                "build".into(),
                "coverage".into(),
                "__tests__".into(),
            ],
            validator: ValidatorConfig::default(),
            skip_stage: None,
            dry_run: false,
        }
    }
}

impl PipelineConfig {
    /// Output tree of an intermediate stage, or the destination for stage 4
    pub fn stage_dir(&self, stage: Stage) -> PathBuf {
        match stage {
            Stage::Integrate => self.output_dir.clone(),
            _ => self.work_dir.join(stage.dir_name()),
        }
    }

    /// Directory holding the log file, reports and status
    pub fn log_dir(&self) -> PathBuf {
        self.log_dir
            .clone()
            .unwrap_or_else(|| self.work_dir.join("logs"))
    }

    /// Append-only JSON-lines log file
    pub fn log_file(&self) -> PathBuf {
        self.log_dir().join("migration.log")
    }

    /// Directory of timestamped run reports
    pub fn reports_dir(&self) -> PathBuf {
        self.log_dir().join("reports")
    }

    /// The single, overwritten status artifact
    pub fn status_file(&self) -> PathBuf {
        self.log_dir().join("migration-status.json")
    }

    /// Span scanning mode selected by `literal_aware_spans`
    pub fn scan_mode(&self) -> ScanMode {
        if self.literal_aware_spans {
            ScanMode::LiteralAware
        } else {
            ScanMode::Blind
        }
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::InvalidOption {
                option: "batch_size".into(),
                reason: "must be at least 1".into(),
            });
        }

        if let Some(stage) = self.skip_stage
            && !(1..=4).contains(&stage)
        {
            return Err(ConfigError::InvalidOption {
                option: "skip_stage".into(),
                reason: format!("{stage} is not a stage number (1-4)"),
            });
        }

        if self.validator.program.trim().is_empty() {
            return Err(ConfigError::InvalidOption {
                option: "validator.program".into(),
                reason: "must not be empty".into(),
            });
        }

        let source_dir = normalize_path(&self.source_dir);
        for (option, dir) in [("output_dir", &self.output_dir), ("work_dir", &self.work_dir)] {
            if normalize_path(dir).starts_with(&source_dir) {
                return Err(ConfigError::InvalidOption {
                    option: option.into(),
                    reason: format!(
                        "{} is inside the source directory {}",
                        dir.display(),
                        self.source_dir.display()
                    ),
                });
            }
        }

        Ok(())
    }

    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: PipelineConfig =
            toml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.to_path_buf(),
                source: e,
            })?;

        Ok(config)
    }

    /// Generate a sample configuration file content
    pub fn sample_config() -> String {
        r#"# Route Migrator Configuration File
# This file uses TOML format (https://toml.io)

# Source tree to migrate (components/, pages/, contexts/, services/, hooks/, types/, utils/)
source_dir = "src"

# Intermediate stage trees are created below this directory:
#   stage1-mock-removal/, stage2-conventions/, stage3-validated/
work_dir = "migration"

# Final destination: pages land in routes/, everything else in components/
output_dir = "app"

# Logs, reports and status (default: <work_dir>/logs)
# log_dir = "migration/logs"

# Files per progress batch
batch_size = 10

# DEBUG, INFO, WARN or ERROR
log_level = "INFO"

# Leave existing stage outputs untouched on re-runs
skip_existing = true

# Keep <file>.bak before replacing a stage output with different content
create_backups = true

# Ignore delimiters inside string literals and comments when removing mocks
literal_aware_spans = true

# Optional JSON manifest: { "files": ["pages/home.tsx"] }
# mock_analysis = "mock-analysis.json"

extensions = ["ts", "tsx", "js", "jsx"]
exclude_dirs = ["node_modules", "dist", "build", "coverage", "__tests__"]

[validator]
program = "npx"
args = ["eslint"]
fix_flag = "--fix"
"#
        .to_string()
    }
}

/// Absolute, lexically cleaned form of `path` (`.` dropped, `..` applied)
///
/// Does not touch the filesystem, so paths that do not exist yet compare the
/// same way as existing ones.
fn normalize_path(path: &Path) -> PathBuf {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other),
        }
    }
    normalized
}

/// Errors that can occur when loading or validating configuration
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read configuration file
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to parse configuration file
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },
    /// A setting has a value the pipeline cannot use
    InvalidOption { option: String, reason: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError { path, source } => {
                write!(f, "Failed to read config file '{}': {}", path.display(), source)
            }
            ConfigError::ParseError { path, source } => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), source)
            }
            ConfigError::InvalidOption { option, reason } => {
                write!(f, "Invalid configuration option '{}': {}", option, reason)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::ReadError { source, .. } => Some(source),
            ConfigError::ParseError { source, .. } => Some(source),
            ConfigError::InvalidOption { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_layout() {
        let config = PipelineConfig::default();
        assert_eq!(
            config.stage_dir(Stage::MockRemoval),
            PathBuf::from("migration/stage1-mock-removal")
        );
        assert_eq!(config.stage_dir(Stage::Integrate), PathBuf::from("app"));
        assert_eq!(config.log_file(), PathBuf::from("migration/logs/migration.log"));
        assert_eq!(
            config.status_file(),
            PathBuf::from("migration/logs/migration-status.json")
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_sample_config_parses() {
        let config: PipelineConfig = toml::from_str(&PipelineConfig::sample_config()).unwrap();
        assert_eq!(config.batch_size, 10);
        assert_eq!(config.log_level, LogLevel::Info);
        assert_eq!(config.validator, ValidatorConfig::default());
        assert_eq!(config.scan_mode(), ScanMode::LiteralAware);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("migrate.toml");
        fs::write(&path, "batch_size = 3\nlog_level = \"DEBUG\"\n").unwrap();

        let config = PipelineConfig::load_from_file(&path).unwrap();
        assert_eq!(config.batch_size, 3);
        assert_eq!(config.log_level, LogLevel::Debug);
        assert!(config.skip_existing);
        assert_eq!(config.extensions.len(), 4);
    }

    #[test]
    fn test_load_errors_carry_path() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        let err = PipelineConfig::load_from_file(&missing).unwrap_err();
        assert!(err.to_string().contains("missing.toml"));

        let broken = dir.path().join("broken.toml");
        fs::write(&broken, "batch_size = [").unwrap();
        assert!(matches!(
            PipelineConfig::load_from_file(&broken),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = PipelineConfig {
            batch_size: 0,
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_err());

        let config = PipelineConfig {
            skip_stage: Some(7),
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_err());

        let config = PipelineConfig {
            output_dir: PathBuf::from("src/out"),
            ..PipelineConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("output_dir"));
    }

    #[test]
    fn test_validate_compares_normalized_paths() {
        let config = PipelineConfig {
            source_dir: PathBuf::from("."),
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_err());

        let config = PipelineConfig {
            work_dir: PathBuf::from("./src/migration"),
            ..PipelineConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("work_dir"));

        let config = PipelineConfig {
            output_dir: PathBuf::from("src/../app"),
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path(Path::new("/a/./b/../c")), PathBuf::from("/a/c"));
        assert!(normalize_path(Path::new("rel")).is_absolute());
    }

    #[test]
    fn test_log_level_mapping() {
        assert_eq!(LogLevel::Warn.as_tracing_level(), Level::WARN);
        assert_eq!(LogLevel::Debug.as_tracing_level(), Level::DEBUG);
    }
}
