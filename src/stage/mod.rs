//! The four migration stages
//!
//! Every stage reads its predecessor's tree (stage 1 reads the source tree),
//! writes only its own, and reports one [`FileResult`] per discovered file:
//! - [`mock`]: mock-declaration removal and media URL canonicalization
//! - [`convention`]: route-loader convention rewriting for pages
//! - [`validate`]: advisory external validation
//! - [`integrate`]: promotion into the destination tree

pub mod convention;
pub mod integrate;
pub mod mock;
pub mod validate;

use crate::error::Result;
use crate::hash::matches_content;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// One of the four sequential transformation phases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    MockRemoval,
    Conventions,
    Validation,
    Integrate,
}

impl Stage {
    /// Stages in execution order
    pub const ALL: [Stage; 4] = [
        Stage::MockRemoval,
        Stage::Conventions,
        Stage::Validation,
        Stage::Integrate,
    ];

    /// 1-based stage number
    pub fn number(&self) -> u8 {
        match self {
            Stage::MockRemoval => 1,
            Stage::Conventions => 2,
            Stage::Validation => 3,
            Stage::Integrate => 4,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Stage::MockRemoval => "mock removal",
            Stage::Conventions => "convention rewriting",
            Stage::Validation => "validation",
            Stage::Integrate => "integration",
        }
    }

    /// Folder name of the stage's tree below the work directory
    pub fn dir_name(&self) -> &'static str {
        match self {
            Stage::MockRemoval => "stage1-mock-removal",
            Stage::Conventions => "stage2-conventions",
            Stage::Validation => "stage3-validated",
            Stage::Integrate => "stage4-integrated",
        }
    }

    /// The stage whose output this stage reads, if any
    pub fn previous(&self) -> Option<Stage> {
        match self {
            Stage::MockRemoval => None,
            Stage::Conventions => Some(Stage::MockRemoval),
            Stage::Validation => Some(Stage::Conventions),
            Stage::Integrate => Some(Stage::Validation),
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "stage {} ({})", self.number(), self.name())
    }
}

/// Outcome of one file in one stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    /// Output written (or already identical)
    Processed,
    /// Output written, with an advisory warning attached
    Warned,
    /// Not processed: existing output kept, or no input to read
    Skipped,
    /// Per-file error; the stage moved on
    Failed,
}

/// Result of processing a single file in a stage
#[derive(Debug, Clone)]
pub struct FileResult {
    /// Source-relative path of the file
    pub relative_path: String,
    /// Where the stage wrote (or would have written) its output
    pub destination: Option<PathBuf>,
    pub status: FileStatus,
    /// Warning, skip reason or error text
    pub message: Option<String>,
}

impl FileResult {
    pub fn processed(relative_path: &str, destination: PathBuf) -> Self {
        Self {
            relative_path: relative_path.to_string(),
            destination: Some(destination),
            status: FileStatus::Processed,
            message: None,
        }
    }

    pub fn warned(relative_path: &str, destination: PathBuf, message: impl Into<String>) -> Self {
        Self {
            relative_path: relative_path.to_string(),
            destination: Some(destination),
            status: FileStatus::Warned,
            message: Some(message.into()),
        }
    }

    pub fn skipped(
        relative_path: &str,
        destination: Option<PathBuf>,
        reason: Option<String>,
    ) -> Self {
        Self {
            relative_path: relative_path.to_string(),
            destination,
            status: FileStatus::Skipped,
            message: reason,
        }
    }

    pub fn failed(relative_path: &str, message: impl Into<String>) -> Self {
        Self {
            relative_path: relative_path.to_string(),
            destination: None,
            status: FileStatus::Failed,
            message: Some(message.into()),
        }
    }
}

/// What [`write_output`] did on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    /// Destination already held identical content
    Unchanged,
}

/// Write a stage output, creating parent directories
///
/// Identical existing content is left untouched. Otherwise, when
/// `create_backups` is set, the previous output is copied to `<name>.bak`
/// before it is replaced.
pub fn write_output(dest: &Path, content: &[u8], create_backups: bool) -> Result<WriteOutcome> {
    if matches_content(dest, content)? {
        debug!(?dest, "Output already up to date");
        return Ok(WriteOutcome::Unchanged);
    }

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }

    if create_backups && dest.is_file() {
        let backup = backup_path(dest);
        fs::copy(dest, &backup)?;
        debug!(?dest, ?backup, "Backed up previous output");
    }

    fs::write(dest, content)?;
    Ok(WriteOutcome::Written)
}

/// Copy a file verbatim through [`write_output`], preserving its mtime
pub fn copy_output(source: &Path, dest: &Path, create_backups: bool) -> Result<WriteOutcome> {
    let content = fs::read(source)?;
    let outcome = write_output(dest, &content, create_backups)?;

    if outcome == WriteOutcome::Written
        && let Ok(metadata) = fs::metadata(source)
        && let Ok(mtime) = metadata.modified()
    {
        let _ = filetime::set_file_mtime(dest, filetime::FileTime::from_system_time(mtime));
    }

    Ok(outcome)
}

/// `home.tsx` → `home.tsx.bak`
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".bak");
    path.with_file_name(name)
}

/// Join a `/`-separated relative path onto a root
pub fn join_relative(root: &Path, relative_path: &str) -> PathBuf {
    relative_path
        .split('/')
        .filter(|part| !part.is_empty())
        .fold(root.to_path_buf(), |acc, part| acc.join(part))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_stage_order() {
        let numbers: Vec<u8> = Stage::ALL.iter().map(|s| s.number()).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4]);
        assert_eq!(Stage::Validation.previous(), Some(Stage::Conventions));
        assert_eq!(Stage::MockRemoval.previous(), None);
        assert_eq!(Stage::Integrate.to_string(), "stage 4 (integration)");
    }

    #[test]
    fn test_write_output_creates_parents_and_skips_identical() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("pages/deep/home.tsx");

        assert_eq!(write_output(&dest, b"one", true).unwrap(), WriteOutcome::Written);
        assert_eq!(write_output(&dest, b"one", true).unwrap(), WriteOutcome::Unchanged);
        assert!(!backup_path(&dest).exists());
    }

    #[test]
    fn test_write_output_backs_up_changed_content() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("home.tsx");

        write_output(&dest, b"old", true).unwrap();
        write_output(&dest, b"new", true).unwrap();

        assert_eq!(fs::read(&dest).unwrap(), b"new");
        assert_eq!(fs::read(backup_path(&dest)).unwrap(), b"old");
    }

    #[test]
    fn test_write_output_without_backups() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("home.tsx");

        write_output(&dest, b"old", false).unwrap();
        write_output(&dest, b"new", false).unwrap();
        assert!(!backup_path(&dest).exists());
    }

    #[test]
    fn test_copy_output_preserves_mtime() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("a.tsx");
        let dest = dir.path().join("out/a.tsx");
        fs::write(&source, "x").unwrap();
        let old = filetime::FileTime::from_unix_time(1_600_000_000, 0);
        filetime::set_file_mtime(&source, old).unwrap();

        copy_output(&source, &dest, false).unwrap();

        let copied = filetime::FileTime::from_last_modification_time(&fs::metadata(&dest).unwrap());
        assert_eq!(copied, old);
    }

    #[test]
    fn test_join_relative() {
        let joined = join_relative(Path::new("/out"), "pages/business/[id].tsx");
        assert_eq!(joined, Path::new("/out/pages/business/[id].tsx"));
    }
}
