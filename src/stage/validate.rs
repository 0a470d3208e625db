//! Stage 3: advisory external validation
//!
//! The stage 2 output is copied into the stage 3 tree and the configured
//! validator runs on that copy with its fix flag. The validator's verdict
//! never blocks a file; failures become warnings.

use crate::config::{PipelineConfig, ValidatorConfig};
use crate::discovery::SourceFile;
use crate::error::{Error, Result};
use crate::stage::{FileResult, Stage, copy_output, join_relative};
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::{debug, warn};

/// What the validator reported for one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Clean,
    /// Exited with a non-zero code (`None` when killed by a signal)
    Rejected(Option<i32>),
}

/// Stage 3 runner
pub struct ValidationGate<'a> {
    validator: &'a ValidatorConfig,
}

impl<'a> ValidationGate<'a> {
    pub fn new(validator: &'a ValidatorConfig) -> Self {
        Self { validator }
    }

    /// Run the validator on `path`, blocking until it exits
    ///
    /// Output is discarded; only the exit status is read.
    pub fn check(&self, path: &Path) -> Result<Verdict> {
        let status = Command::new(&self.validator.program)
            .args(&self.validator.args)
            .arg(&self.validator.fix_flag)
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|e| Error::Validator {
                program: self.validator.program.clone(),
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        if status.success() {
            Ok(Verdict::Clean)
        } else {
            Ok(Verdict::Rejected(status.code()))
        }
    }

    /// Run stage 3 for one file: stage 2 tree → stage 3 tree
    pub fn process(&self, file: &SourceFile, config: &PipelineConfig) -> Result<FileResult> {
        let input = join_relative(&config.stage_dir(Stage::Conventions), &file.relative_path);
        let dest = join_relative(&config.stage_dir(Stage::Validation), &file.relative_path);

        if !input.is_file() {
            return Ok(FileResult::skipped(
                &file.relative_path,
                None,
                Some("no stage 2 output to validate".into()),
            ));
        }

        copy_output(&input, &dest, config.create_backups)?;

        match self.check(&dest) {
            Ok(Verdict::Clean) => {
                debug!(file = %file.relative_path, "Validator passed");
                Ok(FileResult::processed(&file.relative_path, dest))
            }
            Ok(Verdict::Rejected(code)) => {
                let message = match code {
                    Some(code) => format!("validator exited with status {code}"),
                    None => "validator terminated by signal".to_string(),
                };
                warn!(file = %file.relative_path, %message, "Validation reported problems");
                Ok(FileResult::warned(&file.relative_path, dest, message))
            }
            Err(e) => {
                warn!(file = %file.relative_path, error = %e, "Validator could not run");
                Ok(FileResult::warned(&file.relative_path, dest, e.to_string()))
            }
        }
    }
}
