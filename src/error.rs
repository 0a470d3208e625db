//! Error types for the route migrator

use crate::stage::Stage;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for route migrator operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the route migrator
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unbalanced delimiter starting at offset {start}: depth {depth} at end of text")]
    UnbalancedDelimiter { start: usize, depth: usize },

    #[error("Mismatched delimiter at offset {offset}: expected '{expected}', found '{found}'")]
    MismatchedDelimiter {
        offset: usize,
        expected: char,
        found: char,
    },

    #[error("Failed to rewrite {path}: {message}")]
    Transform { path: PathBuf, message: String },

    #[error("Validator '{program}' could not be run on {path}: {message}")]
    Validator {
        program: String,
        path: PathBuf,
        message: String,
    },

    #[error("Cannot create output root for {stage} at {path}: {source}")]
    StageRoot {
        stage: Stage,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Report error: {0}")]
    Report(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("Directory traversal error: {0}")]
    WalkDir(#[from] walkdir::Error),
}

impl Error {
    /// Build a per-file transform error
    pub fn transform(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Error::Transform {
            path: path.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transform_display() {
        let err = Error::transform("pages/home.tsx", "signature has no closing paren");
        let msg = err.to_string();
        assert!(msg.contains("pages/home.tsx"));
        assert!(msg.contains("closing paren"));
    }

    #[test]
    fn test_stage_root_display() {
        let err = Error::StageRoot {
            stage: Stage::Integrate,
            path: PathBuf::from("app"),
            source: std::io::Error::new(std::io::ErrorKind::AlreadyExists, "file exists"),
        };
        let msg = err.to_string();
        assert!(msg.starts_with("Cannot create output root for stage 4 (integration) at app"));
        assert!(!msg.contains("Configuration"));
    }

    #[test]
    fn test_unbalanced_display() {
        let err = Error::UnbalancedDelimiter { start: 12, depth: 2 };
        assert!(err.to_string().contains("offset 12"));
    }
}
