//! Stage 1: mock-data removal
//!
//! Finds `mockX` / `MOCK_X` / `fakeX` / `dummyX` / `sampleX` declarations
//! whose initializer is an object or array literal, cuts out the whole
//! declaration using the balanced-span locator and leaves a two-line audit
//! marker in its place. Known stock-photo URLs are rewritten to a local
//! placeholder.

use crate::config::PipelineConfig;
use crate::discovery::SourceFile;
use crate::error::{Error, Result};
use crate::span::{ScanMode, locate};
use crate::stage::{FileResult, Stage, join_relative, write_output};
use regex::Regex;
use std::fs;
use tracing::{debug, info};

/// Mock-name patterns as `(pattern id, regex fragment)`
pub const NAME_PATTERNS: &[(&str, &str)] = &[
    ("mock-camel", r"mock[A-Z]\w*"),
    ("mock-upper", r"MOCK_[A-Z0-9_]+"),
    ("fake-camel", r"fake[A-Z]\w*"),
    ("dummy-camel", r"dummy[A-Z]\w*"),
    ("sample-camel", r"sample[A-Z]\w*"),
];

/// Hosts whose URLs are replaced by [`PLACEHOLDER_MEDIA_PATH`]
const MEDIA_HOSTS: &[&str] = &[
    r"images\.unsplash\.com",
    r"via\.placeholder\.com",
    r"picsum\.photos",
    r"placehold\.co",
    r"randomuser\.me/api/portraits",
];

/// Canonical local path substituted for external stock media
pub const PLACEHOLDER_MEDIA_PATH: &str = "/images/placeholder.svg";

/// Maximum length of the audit excerpt, ellipsis included
const EXCERPT_LIMIT: usize = 50;

/// Extent of one mock declaration, from the start of its line to the
/// delimiter closing its initializer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockDeclarationSpan {
    pub start: usize,
    /// Offset of the closing `}` or `]`
    pub end: usize,
    pub matched_pattern_id: &'static str,
    pub name: String,
    /// Leading whitespace of the declaration line
    indent: String,
}

/// Text produced by [`MockStripper::strip`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StripOutcome {
    pub text: String,
    /// Names of the removed declarations, in file order
    pub removed: Vec<String>,
    pub urls_replaced: usize,
}

/// Stage 1 transformer
pub struct MockStripper {
    declarations: Vec<(&'static str, Regex)>,
    media_urls: Regex,
    scan_mode: ScanMode,
}

impl MockStripper {
    pub fn new(scan_mode: ScanMode) -> Result<Self> {
        let declarations = NAME_PATTERNS
            .iter()
            .map(|(id, name)| {
                let pattern = format!(
                    r"(?m)^([ \t]*)(?:export[ \t]+)?(?:const|let|var)[ \t]+({name})[ \t]*(?::[^=\n]+)?=\s*([\[{{])"
                );
                Regex::new(&pattern).map(|re| (*id, re))
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let media_urls = Regex::new(&format!(
            r#"https?://(?:{})[^\s"'`)]*"#,
            MEDIA_HOSTS.join("|")
        ))?;

        Ok(Self {
            declarations,
            media_urls,
            scan_mode,
        })
    }

    /// Locate every mock declaration, ordered and without overlaps
    ///
    /// A declaration nested inside another one's initializer is dropped; the
    /// outer span already covers it.
    pub fn find_declarations(&self, text: &str) -> Result<Vec<MockDeclarationSpan>> {
        let mut spans = Vec::new();

        for (id, re) in &self.declarations {
            for caps in re.captures_iter(text) {
                let (Some(whole), Some(indent), Some(name), Some(open)) =
                    (caps.get(0), caps.get(1), caps.get(2), caps.get(3))
                else {
                    continue;
                };

                let span = locate(text, open.start(), self.scan_mode)?;
                spans.push(MockDeclarationSpan {
                    start: whole.start(),
                    end: span.end,
                    matched_pattern_id: *id,
                    name: name.as_str().to_string(),
                    indent: indent.as_str().to_string(),
                });
            }
        }

        spans.sort_by_key(|s| s.start);
        let mut kept: Vec<MockDeclarationSpan> = Vec::with_capacity(spans.len());
        for span in spans {
            if kept.last().is_some_and(|last| span.start <= last.end) {
                continue;
            }
            kept.push(span);
        }
        Ok(kept)
    }

    /// Remove mock declarations (when `scan_declarations` is set) and
    /// canonicalize media URLs
    pub fn strip(&self, text: &str, scan_declarations: bool) -> Result<StripOutcome> {
        let spans = if scan_declarations {
            self.find_declarations(text)?
        } else {
            Vec::new()
        };

        let mut out = String::with_capacity(text.len());
        let mut cursor = 0;
        let mut removed = Vec::with_capacity(spans.len());

        for span in &spans {
            out.push_str(&text[cursor..span.start]);

            let mut end = span.end + 1;
            if text[end..].starts_with(';') {
                end += 1;
            }

            let declaration = &text[span.start + span.indent.len()..end];
            out.push_str(&removal_marker(span, declaration));
            removed.push(span.name.clone());
            cursor = end;
        }
        out.push_str(&text[cursor..]);

        let urls_replaced = self.media_urls.find_iter(&out).count();
        let text = if urls_replaced > 0 {
            self.media_urls
                .replace_all(&out, PLACEHOLDER_MEDIA_PATH)
                .into_owned()
        } else {
            out
        };

        Ok(StripOutcome {
            text,
            removed,
            urls_replaced,
        })
    }

    /// Run stage 1 for one file: source tree → stage 1 tree
    pub fn process(&self, file: &SourceFile, config: &PipelineConfig) -> Result<FileResult> {
        let dest = join_relative(&config.stage_dir(Stage::MockRemoval), &file.relative_path);

        if config.skip_existing && dest.exists() {
            debug!(file = %file.relative_path, "Stage 1 output exists, skipping");
            return Ok(FileResult::skipped(&file.relative_path, Some(dest), None));
        }

        let text = fs::read_to_string(&file.path)?;
        let outcome = self
            .strip(&text, file.has_mock_marker)
            .map_err(|e| Error::transform(&file.path, format!("mock removal failed: {e}")))?;

        write_output(&dest, outcome.text.as_bytes(), config.create_backups)?;

        if outcome.removed.is_empty() && outcome.urls_replaced == 0 {
            debug!(file = %file.relative_path, "No mock data found");
        } else {
            info!(
                file = %file.relative_path,
                removed = ?outcome.removed,
                urls_replaced = outcome.urls_replaced,
                "Removed mock data"
            );
        }

        Ok(FileResult::processed(&file.relative_path, dest))
    }
}

/// Two comment lines: what was removed, and a short excerpt for audit
fn removal_marker(span: &MockDeclarationSpan, declaration: &str) -> String {
    format!(
        "{indent}// [route-migrator] removed mock declaration `{name}` ({id})\n{indent}// was: {excerpt}",
        indent = span.indent,
        name = span.name,
        id = span.matched_pattern_id,
        excerpt = excerpt(declaration),
    )
}

/// Whitespace-collapsed prefix of at most [`EXCERPT_LIMIT`] characters
fn excerpt(declaration: &str) -> String {
    let collapsed = declaration.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= EXCERPT_LIMIT {
        return collapsed;
    }
    let mut short: String = collapsed.chars().take(EXCERPT_LIMIT - 3).collect();
    short.push_str("...");
    short
}
