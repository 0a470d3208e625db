//! Route Migrator - staged migration of a React source tree to route-loader
//! conventions
//!
//! Command-line entry point: builds the configuration, sets up logging, runs
//! the pipeline and writes the report and status artifacts.

use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use route_migrator::stage::integrate;
use route_migrator::{
    Category, Cli, FileStatus, MigrationReport, Pipeline, PipelineConfig, PipelineStatus,
    Reporter, RunSummary, SourceFile, Stage,
};
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

// CLI Output Module
mod cli_output {
    //! Colour and layout helpers for terminal output

    use crossterm::{
        ExecutableCommand,
        style::{Color, Print, Stylize, style},
    };
    use std::io::stdout;

    pub struct CliTheme;

    impl CliTheme {
        pub const SUCCESS: Color = Color::Green;
        pub const WARNING: Color = Color::Yellow;
        pub const ERROR: Color = Color::Red;
        pub const HINT: Color = Color::DarkGrey;
        pub const ACCENT: Color = Color::Cyan;
    }

    pub fn print_separator() {
        let _ = stdout().execute(Print(format!("{}\n", "─".repeat(60))));
    }

    /// Title centred in a 60-column line
    pub fn print_title(title: &str) {
        let padding = 60usize.saturating_sub(title.len()) / 2;
        let _ = stdout().execute(Print(" ".repeat(padding)));
        let _ = stdout().execute(Print(style(title).bold()));
        let _ = stdout().execute(Print("\n"));
    }

    pub fn print_warning(msg: &str) {
        let _ = stdout().execute(Print(style("⚠ ").with(CliTheme::WARNING).bold()));
        let _ = stdout().execute(Print(format!("{}\n", msg)));
    }

    pub fn print_error(msg: &str) {
        let _ = stdout().execute(Print(style("✗ ").with(CliTheme::ERROR).bold()));
        let _ = stdout().execute(Print(format!("{}\n", msg)));
    }

    pub fn print_hint(msg: &str) {
        let _ = stdout().execute(Print(style("→ ").with(CliTheme::HINT)));
        let _ = stdout().execute(Print(format!("{}\n", msg)));
    }

    pub fn print_key_value(key: &str, value: &str, value_color: Option<Color>) {
        let key_styled = style(key).with(CliTheme::HINT);
        let value_styled = match value_color {
            Some(color) => style(value).with(color),
            None => style(value).bold(),
        };
        let _ = stdout().execute(Print("  "));
        let _ = stdout().execute(Print(key_styled));
        let _ = stdout().execute(Print(": "));
        let _ = stdout().execute(Print(value_styled));
        let _ = stdout().execute(Print("\n"));
    }

    pub fn print_stat(key: &str, value: &str, color: Color) {
        print_key_value(key, value, Some(color));
    }

    pub fn print_result(status_icon: &str, status_color: Color, source: &str, dest_or_msg: &str) {
        let _ = stdout().execute(Print("  "));
        let _ = stdout().execute(Print(style(status_icon).with(status_color).bold()));
        let _ = stdout().execute(Print(" "));
        let _ = stdout().execute(Print(style(source).italic()));
        let _ = stdout().execute(Print(" "));
        let _ = stdout().execute(Print(style(dest_or_msg).with(CliTheme::HINT)));
        let _ = stdout().execute(Print("\n"));
    }

    pub fn print_path(label: &str, path: &str) {
        let _ = stdout().execute(Print(style("  📁 ").with(CliTheme::ACCENT)));
        let _ = stdout().execute(Print(style(format!("{label}: ")).with(CliTheme::HINT)));
        let _ = stdout().execute(Print(format!("{}\n", path)));
    }

    pub fn print_blank() {
        let _ = stdout().execute(Print("\n"));
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.print_config {
        print!("{}", PipelineConfig::sample_config());
        return Ok(());
    }

    let config = load_config(&cli)?;
    config.validate()?;

    let _guard = setup_logging(&config)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        source = %config.source_dir.display(),
        output = %config.output_dir.display(),
        "Route Migrator starting"
    );
    info!(log_file = %config.log_file().display(), "Log file location");

    let mut pipeline = Pipeline::new(config);

    if pipeline.config().dry_run {
        let output = pipeline.config().stage_dir(Stage::Integrate);
        return match pipeline.discover() {
            Ok(files) => {
                print_plan(&output, files);
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Discovery failed");
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        };
    }

    match pipeline.run() {
        Ok(summary) => {
            let config = pipeline.config();
            let report = MigrationReport::from_summary(&summary, Utc::now());
            let status = PipelineStatus::from_report(&report);
            let reporter = Reporter::new(config);
            let report_path = reporter.write_report(&report)?;
            reporter.write_status(&status)?;

            print_summary(&cli, config, &summary, &report, &report_path);

            info!(
                success_rate = report.success_rate,
                migration_complete = status.migration_complete,
                "Migration run complete"
            );
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Migration failed");
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Accept `migrate` for `migrate.toml`
fn resolve_config_path(config_path: &Path) -> PathBuf {
    if config_path.exists() || config_path.extension().is_some() {
        return config_path.to_path_buf();
    }
    let with_extension = config_path.with_extension("toml");
    if with_extension.exists() {
        with_extension
    } else {
        config_path.to_path_buf()
    }
}

/// Load configuration from file or CLI arguments
fn load_config(cli: &Cli) -> Result<PipelineConfig> {
    let config = if let Some(ref config_path) = cli.config {
        let resolved_path = resolve_config_path(config_path);
        let file_config = PipelineConfig::load_from_file(&resolved_path)?;
        cli.merge_with_config(file_config)
    } else {
        cli.to_config()
    };

    if !config.source_dir.exists() {
        eprintln!(
            "Warning: source directory {} does not exist",
            config.source_dir.display()
        );
    }

    Ok(config)
}

/// Console on stderr plus JSON lines appended to `<log_dir>/migration.log`
fn setup_logging(config: &PipelineConfig) -> Result<WorkerGuard> {
    let env_filter = EnvFilter::builder()
        .with_default_directive(config.log_level.as_tracing_level().into())
        .from_env_lossy();

    let log_path = config.log_file();
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .json()
                .flatten_event(true)
                .with_ansi(false)
                .with_writer(non_blocking),
        )
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    Ok(guard)
}

fn print_plan(output: &Path, files: &[SourceFile]) {
    use cli_output::*;

    print_separator();
    print_title("Migration Plan (dry run)");
    print_separator();
    print_blank();

    for category in Category::ALL {
        let count = files.iter().filter(|f| f.category == category).count();
        if count > 0 {
            print_stat(category.label(), &count.to_string(), CliTheme::ACCENT);
        }
    }
    print_stat("total", &files.len().to_string(), CliTheme::SUCCESS);
    print_blank();

    for file in files {
        let dest = integrate::destination(output, file);
        print_result(
            "~",
            CliTheme::ACCENT,
            &file.relative_path,
            &format!("→ {}", dest.display()),
        );
    }

    print_separator();
    print_warning("Dry run: no stage was executed");
}

fn print_summary(
    cli: &Cli,
    config: &PipelineConfig,
    summary: &RunSummary,
    report: &MigrationReport,
    report_path: &Path,
) {
    use cli_output::*;

    print_separator();
    print_title("Migration Complete");
    print_separator();
    print_blank();

    print_stat("Files", &summary.total_files.to_string(), CliTheme::ACCENT);
    for stage_summary in &summary.stages {
        let counters = stage_summary.counters;
        let color = if counters.errors > 0 {
            CliTheme::ERROR
        } else {
            CliTheme::SUCCESS
        };
        print_stat(
            &stage_summary.stage.to_string(),
            &format!(
                "{} processed, {} skipped, {} errors",
                counters.processed, counters.skipped, counters.errors
            ),
            color,
        );
    }
    let rate_color = if report.success_rate > route_migrator::report::COMPLETION_THRESHOLD {
        CliTheme::SUCCESS
    } else {
        CliTheme::WARNING
    };
    print_stat(
        "Success rate",
        &format!("{:.1}%", report.success_rate),
        rate_color,
    );
    print_blank();

    if cli.verbose {
        print_separator();
        print_hint("Integrated files");
        print_blank();
        for result in &summary.integrated {
            let dest = result
                .destination
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default();
            match result.status {
                FileStatus::Processed | FileStatus::Warned => print_result(
                    "✓",
                    CliTheme::SUCCESS,
                    &result.relative_path,
                    &format!("→ {}", dest),
                ),
                FileStatus::Skipped => print_result(
                    "⊘",
                    CliTheme::WARNING,
                    &result.relative_path,
                    result.message.as_deref().unwrap_or("already integrated"),
                ),
                FileStatus::Failed => print_result(
                    "✗",
                    CliTheme::ERROR,
                    &result.relative_path,
                    result.message.as_deref().unwrap_or("unknown error"),
                ),
            }
        }
    }

    if !summary.warnings.is_empty() {
        print_separator();
        print_warning(&format!("{} warnings", summary.warnings.len()));
        if cli.verbose {
            for warning in &summary.warnings {
                print_key_value(
                    &format!("[{}] {}", warning.stage.number(), warning.path),
                    &warning.message,
                    Some(CliTheme::WARNING),
                );
            }
        }
    }

    if !summary.errors.is_empty() {
        print_separator();
        print_error(&format!("{} files failed", summary.errors.len()));
        print_blank();
        for issue in &summary.errors {
            print_key_value(
                &format!("[{}] {}", issue.stage.number(), issue.path),
                &issue.message,
                Some(CliTheme::ERROR),
            );
        }
    }

    print_separator();
    print_path("Report", &report_path.display().to_string());
    print_path("Status", &config.status_file().display().to_string());
    print_path("Log", &config.log_file().display().to_string());
}
