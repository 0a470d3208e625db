//! Source discovery and file classification
//!
//! Walks the source tree once per run, classifies every matching file into a
//! [`Category`] and records whether it appears to hold mock declarations.

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::stage::mock::NAME_PATTERNS;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Closed classification of a source file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Component,
    Page,
    Context,
    Service,
    Hook,
    Type,
    Util,
    Other,
}

/// Ordered prefix rules, first match wins
const PREFIX_RULES: &[(&str, Category)] = &[
    ("components/", Category::Component),
    ("pages/", Category::Page),
    ("contexts/", Category::Context),
    ("services/", Category::Service),
    ("hooks/", Category::Hook),
    ("types/", Category::Type),
    ("utils/", Category::Util),
];

impl Category {
    /// Every category, in declaration order
    pub const ALL: [Category; 8] = [
        Category::Component,
        Category::Page,
        Category::Context,
        Category::Service,
        Category::Hook,
        Category::Type,
        Category::Util,
        Category::Other,
    ];

    /// Classify a `/`-separated path relative to the source root
    pub fn classify(relative_path: &str) -> Category {
        PREFIX_RULES
            .iter()
            .find(|(prefix, _)| relative_path.starts_with(prefix))
            .map(|(_, category)| *category)
            .unwrap_or(Category::Other)
    }

    /// Folder prefix that selects this category, if any
    pub fn root_prefix(&self) -> Option<&'static str> {
        PREFIX_RULES
            .iter()
            .find(|(_, category)| category == self)
            .map(|(prefix, _)| *prefix)
    }

    /// Lowercase label used in logs and reports
    pub fn label(&self) -> &'static str {
        match self {
            Category::Component => "component",
            Category::Page => "page",
            Category::Context => "context",
            Category::Service => "service",
            Category::Hook => "hook",
            Category::Type => "type",
            Category::Util => "util",
            Category::Other => "other",
        }
    }
}

/// A discovered source file. Immutable for the rest of the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Absolute (or source-dir joined) path to the original file
    pub path: PathBuf,
    /// Path relative to the source root, always `/`-separated
    pub relative_path: String,
    pub category: Category,
    /// Whether the file is expected to contain mock declarations
    pub has_mock_marker: bool,
    /// Size in bytes at discovery time
    pub size: u64,
}

impl SourceFile {
    /// Relative path below the category's root folder
    ///
    /// `pages/business/list.tsx` yields `business/list.tsx`; files in
    /// [`Category::Other`] keep their full relative path.
    pub fn path_below_category(&self) -> &str {
        self.category
            .root_prefix()
            .and_then(|prefix| self.relative_path.strip_prefix(prefix))
            .unwrap_or(&self.relative_path)
    }
}

/// Precomputed list of files known to contain mock declarations
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MockAnalysis {
    /// Relative paths, `/`-separated
    pub files: BTreeSet<String>,
}

impl MockAnalysis {
    /// Load a manifest, returning `None` when it is missing or unreadable
    ///
    /// A broken manifest never stops discovery; the caller falls back to
    /// scanning every file.
    pub fn load(path: &Path) -> Option<Self> {
        if !path.exists() {
            debug!(?path, "Mock analysis manifest not found, scanning files instead");
            return None;
        }

        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                warn!(?path, error = %e, "Failed to read mock analysis manifest");
                return None;
            }
        };

        match serde_json::from_str::<Self>(&content) {
            Ok(analysis) => {
                info!(
                    files = analysis.files.len(),
                    "Loaded mock analysis manifest"
                );
                Some(analysis)
            }
            Err(e) => {
                warn!(?path, error = %e, "Failed to parse mock analysis manifest");
                None
            }
        }
    }

    /// Whether the manifest lists this relative path
    pub fn contains(&self, relative_path: &str) -> bool {
        self.files.contains(relative_path)
    }
}

/// One-time file discovery for a pipeline run
pub struct Discovery<'a> {
    config: &'a PipelineConfig,
    analysis: Option<MockAnalysis>,
    mock_names: Regex,
}

impl<'a> Discovery<'a> {
    /// Create a discovery pass, loading the mock manifest if one is configured
    pub fn new(config: &'a PipelineConfig) -> Result<Self> {
        let analysis = config.mock_analysis.as_deref().and_then(MockAnalysis::load);
        Self::with_analysis(config, analysis)
    }

    /// Create a discovery pass with an explicit manifest
    pub fn with_analysis(
        config: &'a PipelineConfig,
        analysis: Option<MockAnalysis>,
    ) -> Result<Self> {
        let alternation = NAME_PATTERNS
            .iter()
            .map(|(_, pattern)| *pattern)
            .collect::<Vec<_>>()
            .join("|");
        let mock_names = Regex::new(&format!(r"\b(?:{alternation})\b"))?;

        Ok(Self {
            config,
            analysis,
            mock_names,
        })
    }

    /// Walk the source root and classify every matching file
    ///
    /// A missing or empty source root is not an error: it is logged and the
    /// run continues with zero files.
    pub fn run(&self) -> Result<Vec<SourceFile>> {
        let root = &self.config.source_dir;
        if !root.is_dir() {
            warn!(source_dir = %root.display(), "Source directory does not exist, nothing to migrate");
            return Ok(Vec::new());
        }

        let mut files = Vec::new();

        for entry in WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !self.is_excluded(e.path()))
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable directory entry");
                    continue;
                }
            };
            let path = entry.path();
            if !entry.file_type().is_file() || !self.has_supported_extension(path) {
                continue;
            }

            let Some(relative_path) = relative_slash_path(root, path) else {
                warn!(?path, "Skipping file with non UTF-8 path");
                continue;
            };

            let category = Category::classify(&relative_path);
            let size = entry.metadata()?.len();
            let has_mock_marker = self.has_mock_marker(path, &relative_path);

            debug!(
                file = %relative_path,
                category = category.label(),
                has_mock_marker,
                "Discovered source file"
            );

            files.push(SourceFile {
                path: path.to_path_buf(),
                relative_path,
                category,
                has_mock_marker,
                size,
            });
        }

        if files.is_empty() {
            warn!(source_dir = %root.display(), "Source directory contains no migratable files");
        } else {
            info!(count = files.len(), "Discovered source files");
        }

        Ok(files)
    }

    fn has_mock_marker(&self, path: &Path, relative_path: &str) -> bool {
        if let Some(analysis) = &self.analysis {
            return analysis.contains(relative_path);
        }

        match fs::read_to_string(path) {
            Ok(text) => self.mock_names.is_match(&text),
            Err(e) => {
                // stage 1 reports the read failure for this file
                debug!(?path, error = %e, "Could not scan file for mock names");
                false
            }
        }
    }

    fn has_supported_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|ext| {
                let ext = ext.to_lowercase();
                self.config.extensions.iter().any(|e| *e == ext)
            })
            .unwrap_or(false)
    }

    /// Hidden entries and configured folder names are skipped
    fn is_excluded(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        if name.starts_with('.') {
            return true;
        }
        self.config.exclude_dirs.iter().any(|exclude| exclude == name)
    }
}

/// `/`-separated path of `path` below `root`
fn relative_slash_path(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let mut parts = Vec::new();
    for component in relative.components() {
        if let Component::Normal(part) = component {
            parts.push(part.to_str()?);
        }
    }
    Some(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_classify_prefixes() {
        assert_eq!(Category::classify("components/Card.tsx"), Category::Component);
        assert_eq!(Category::classify("pages/business/[id].tsx"), Category::Page);
        assert_eq!(Category::classify("contexts/Auth.tsx"), Category::Context);
        assert_eq!(Category::classify("services/api.ts"), Category::Service);
        assert_eq!(Category::classify("hooks/useRewards.ts"), Category::Hook);
        assert_eq!(Category::classify("types/index.ts"), Category::Type);
        assert_eq!(Category::classify("utils/format.ts"), Category::Util);
    }

    #[test]
    fn test_classify_is_total() {
        for path in [
            "",
            "App.tsx",
            "lib/pages/x.tsx",
            "component/Card.tsx",
            "pages",
            "Pages/home.tsx",
            "./pages/home.tsx",
        ] {
            let category = Category::classify(path);
            assert!(Category::ALL.contains(&category));
            assert_eq!(category, Category::Other, "{path}");
        }
    }

    #[test]
    fn test_path_below_category() {
        let file = SourceFile {
            path: PathBuf::from("/src/pages/events/list.tsx"),
            relative_path: "pages/events/list.tsx".into(),
            category: Category::Page,
            has_mock_marker: false,
            size: 0,
        };
        assert_eq!(file.path_below_category(), "events/list.tsx");

        let other = SourceFile {
            relative_path: "App.tsx".into(),
            category: Category::Other,
            ..file
        };
        assert_eq!(other.path_below_category(), "App.tsx");
    }

    #[test]
    fn test_discovery_classifies_and_detects_mocks() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("src");
        write(&root, "pages/home.tsx", "const mockDeals = [{ id: 1 }];");
        write(&root, "components/Card.tsx", "export const Card = () => null;");
        write(&root, "node_modules/pkg/index.js", "const mockX = {};");
        write(&root, ".cache/tmp.ts", "");
        write(&root, "README.md", "mockThing");

        let config = PipelineConfig {
            source_dir: root.clone(),
            ..PipelineConfig::default()
        };
        let files = Discovery::with_analysis(&config, None).unwrap().run().unwrap();

        let rels: Vec<_> = files.iter().map(|f| f.relative_path.as_str()).collect();
        assert_eq!(rels, vec!["components/Card.tsx", "pages/home.tsx"]);
        assert!(!files[0].has_mock_marker);
        assert!(files[1].has_mock_marker);
        assert_eq!(files[1].category, Category::Page);
        assert_eq!(files[1].size, 30);
    }

    #[test]
    fn test_discovery_prefers_manifest() {
        let dir = tempdir().unwrap();
        let root = dir.path().to_path_buf();
        write(&root, "pages/a.tsx", "const mockA = {};");
        write(&root, "pages/b.tsx", "const plain = {};");

        let config = PipelineConfig {
            source_dir: root,
            ..PipelineConfig::default()
        };
        let analysis = MockAnalysis {
            files: ["pages/b.tsx".to_string()].into_iter().collect(),
        };
        let files = Discovery::with_analysis(&config, Some(analysis))
            .unwrap()
            .run()
            .unwrap();

        assert!(!files[0].has_mock_marker);
        assert!(files[1].has_mock_marker);
    }

    #[test]
    fn test_missing_source_dir_yields_no_files() {
        let dir = tempdir().unwrap();
        let config = PipelineConfig {
            source_dir: dir.path().join("missing"),
            ..PipelineConfig::default()
        };
        let files = Discovery::with_analysis(&config, None).unwrap().run().unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn test_mock_analysis_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mocks.json");
        assert!(MockAnalysis::load(&path).is_none());

        fs::write(&path, r#"{ "files": ["pages/a.tsx"] }"#).unwrap();
        let analysis = MockAnalysis::load(&path).unwrap();
        assert!(analysis.contains("pages/a.tsx"));

        fs::write(&path, "not json").unwrap();
        assert!(MockAnalysis::load(&path).is_none());
    }
}
