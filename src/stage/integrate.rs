//! Stage 4: promotion into the destination tree

use crate::config::PipelineConfig;
use crate::discovery::{Category, SourceFile};
use crate::error::Result;
use crate::stage::{FileResult, Stage, WriteOutcome, copy_output, join_relative};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Folder below the output root that receives pages
pub const ROUTES_DIR: &str = "routes";
/// Folder below the output root that receives everything else
pub const COMPONENTS_DIR: &str = "components";

/// Where a file lands in the destination tree
///
/// Pages and components drop their category folder. Other categories keep
/// their full relative path below `components/` so that e.g.
/// `hooks/index.ts` and `utils/index.ts` cannot collide.
pub fn destination(output_dir: &Path, file: &SourceFile) -> PathBuf {
    match file.category {
        Category::Page => join_relative(&output_dir.join(ROUTES_DIR), file.path_below_category()),
        Category::Component => {
            join_relative(&output_dir.join(COMPONENTS_DIR), file.path_below_category())
        }
        _ => join_relative(&output_dir.join(COMPONENTS_DIR), &file.relative_path),
    }
}

/// Stage 4 runner
pub struct Integrator;

impl Integrator {
    /// Run stage 4 for one file: stage 3 tree → destination tree
    pub fn process(&self, file: &SourceFile, config: &PipelineConfig) -> Result<FileResult> {
        let input = join_relative(&config.stage_dir(Stage::Validation), &file.relative_path);
        let dest = destination(&config.stage_dir(Stage::Integrate), file);

        if !input.is_file() {
            return Ok(FileResult::skipped(
                &file.relative_path,
                None,
                Some("no stage 3 output to integrate".into()),
            ));
        }

        if config.skip_existing && dest.exists() {
            debug!(file = %file.relative_path, ?dest, "Destination exists, skipping");
            return Ok(FileResult::skipped(&file.relative_path, Some(dest), None));
        }

        let outcome = copy_output(&input, &dest, config.create_backups)?;
        debug!(
            file = %file.relative_path,
            ?dest,
            unchanged = outcome == WriteOutcome::Unchanged,
            "Integrated file"
        );
        Ok(FileResult::processed(&file.relative_path, dest))
    }
}
