//! Stage 2: route-loader convention rewriting
//!
//! Page files get a generated `loader` export, a typed component signature,
//! an `ErrorBoundary` export and the imports those need. Local `useState`
//! holders for fetched data are removed since the loader now provides them.
//! Every step checks for its own output first, so rewriting an already
//! rewritten page changes nothing. Other categories only get import
//! bookkeeping.

use crate::config::PipelineConfig;
use crate::discovery::{Category, SourceFile};
use crate::error::{Error, Result};
use crate::span::{ScanMode, locate_group};
use crate::stage::{FileResult, Stage, join_relative, write_output};
use regex::Regex;
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Loader template selected for a page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TemplateId {
    BusinessQuery,
    EventQuery,
    Generic,
}

impl TemplateId {
    pub fn id(&self) -> &'static str {
        match self {
            TemplateId::BusinessQuery => "business-query",
            TemplateId::EventQuery => "event-query",
            TemplateId::Generic => "generic",
        }
    }

    fn loader_body(&self) -> &'static str {
        match self {
            TemplateId::BusinessQuery => {
                "  const client = createDataClient(request);
  const businesses = await client.businesses.list({ slug: params.slug });
  return { businesses };"
            }
            TemplateId::EventQuery => {
                "  const client = createDataClient(request);
  const events = await client.events.upcoming({ slug: params.slug });
  return { events };"
            }
            TemplateId::Generic => {
                "  const client = createDataClient(request);
  const data = await client.query(new URL(request.url).pathname, params);
  return { data };"
            }
        }
    }

    /// Full `loader` export for this template
    pub fn render_loader(&self) -> String {
        format!(
            "export async function loader({{ params, request }}: Route.LoaderArgs) {{\n  // loader template: {}\n{}\n}}\n",
            self.id(),
            self.loader_body()
        )
    }
}

fn mentions_business(path: &str) -> bool {
    path.contains("business")
}

fn mentions_event(path: &str) -> bool {
    path.contains("event")
}

/// Ordered `(predicate, template)` table; first match wins
const TEMPLATE_RULES: &[(fn(&str) -> bool, TemplateId)] = &[
    (mentions_business, TemplateId::BusinessQuery),
    (mentions_event, TemplateId::EventQuery),
];

/// Template used when no rule matches
const DEFAULT_TEMPLATE: TemplateId = TemplateId::Generic;

/// Pick the loader template for a relative page path
pub fn select_template(relative_path: &str) -> TemplateId {
    let path = relative_path.to_lowercase();
    TEMPLATE_RULES
        .iter()
        .find(|(matches, _)| matches(&path))
        .map(|(_, template)| *template)
        .unwrap_or(DEFAULT_TEMPLATE)
}

/// Framework imports every rewritten page needs
pub const FRAMEWORK_IMPORTS: &[&str] = &[
    r#"import { isRouteErrorResponse } from "react-router";"#,
    r#"import { createDataClient } from "~/lib/data.server";"#,
];

/// Name of the exported failure boundary
pub const ERROR_BOUNDARY_EXPORT: &str = "ErrorBoundary";

const ERROR_BOUNDARY: &str = r#"export function ErrorBoundary({ error }: Route.ErrorBoundaryProps) {
  if (isRouteErrorResponse(error)) {
    return (
      <div className="route-error">
        <h1>
          {error.status} {error.statusText}
        </h1>
        <p>{error.data}</p>
      </div>
    );
  }
  const message = error instanceof Error ? error.message : "Unknown error";
  return (
    <div className="route-error">
      <h1>Something went wrong</h1>
      <p>{message}</p>
    </div>
  );
}
"#;

/// Parameter list every rewritten page component takes
const COMPONENT_PARAMS: &str = "{ loaderData }: Route.ComponentProps";

/// Result of rewriting one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteOutcome {
    pub text: String,
    /// Template used, pages only
    pub template: Option<TemplateId>,
    /// Steps that changed the text
    pub applied: Vec<&'static str>,
}

/// Stage 2 transformer
pub struct ConventionRewriter {
    default_export: Regex,
    loader_export: Regex,
    error_boundary: Regex,
    local_state: Regex,
}

impl ConventionRewriter {
    pub fn new() -> Result<Self> {
        Ok(Self {
            default_export: Regex::new(
                r"(?m)^export[ \t]+default[ \t]+(?:async[ \t]+)?function\b[ \t]*\w*[ \t]*\(",
            )?,
            loader_export: Regex::new(
                r"(?m)^export[ \t]+(?:(?:async[ \t]+)?function[ \t]+loader\b|const[ \t]+loader\b)",
            )?,
            error_boundary: Regex::new(&format!(
                r"(?m)^export[ \t]+(?:function|const)[ \t]+{ERROR_BOUNDARY_EXPORT}\b"
            ))?,
            local_state: Regex::new(
                r"(?m)^([ \t]*)const[ \t]*\[[ \t]*(\w+)[ \t]*,[ \t]*\w+[ \t]*\][ \t]*=[ \t]*(?:React\.)?useState[ \t]*(?:<[^>\n]*>)?[ \t]*\(",
            )?,
        })
    }

    /// Apply the page rewrite steps
    pub fn rewrite_page(&self, relative_path: &str, text: &str) -> Result<RewriteOutcome> {
        let template = select_template(relative_path);
        let mut applied = Vec::new();
        let mut text = text.to_string();

        let mut imports = vec![route_type_import(relative_path)];
        imports.extend(FRAMEWORK_IMPORTS.iter().map(|line| line.to_string()));
        if ensure_imports(&mut text, &imports) {
            applied.push("imports");
        }

        if !self.loader_export.is_match(&text) {
            let loader = template.render_loader();
            match self.default_export.find(&text) {
                Some(signature) => text.insert_str(signature.start(), &format!("{loader}\n")),
                None => append_block(&mut text, &loader),
            }
            applied.push("loader");
        }

        if self.rewrite_component_params(relative_path, &mut text)? {
            applied.push("component-params");
        }

        let stripped = self.remove_fetched_state(relative_path, &text)?;
        if stripped != text {
            text = stripped;
            applied.push("local-state");
        }

        if !self.error_boundary.is_match(&text) {
            append_block(&mut text, ERROR_BOUNDARY);
            applied.push("error-boundary");
        }

        let deduped = dedupe_imports(&text);
        if deduped != text {
            text = deduped;
            applied.push("dedupe-imports");
        }

        Ok(RewriteOutcome {
            text,
            template: Some(template),
            applied,
        })
    }

    /// Import bookkeeping only, for everything that is not a page
    pub fn normalize(&self, text: &str) -> RewriteOutcome {
        let deduped = dedupe_imports(text);
        let applied = if deduped != text {
            vec!["dedupe-imports"]
        } else {
            Vec::new()
        };
        RewriteOutcome {
            text: deduped,
            template: None,
            applied,
        }
    }

    /// Run stage 2 for one file: stage 1 tree → stage 2 tree
    pub fn process(&self, file: &SourceFile, config: &PipelineConfig) -> Result<FileResult> {
        let input = join_relative(&config.stage_dir(Stage::MockRemoval), &file.relative_path);
        let dest = join_relative(&config.stage_dir(Stage::Conventions), &file.relative_path);

        if !input.is_file() {
            return Ok(FileResult::skipped(
                &file.relative_path,
                None,
                Some("no stage 1 output to rewrite".into()),
            ));
        }

        let text = fs::read_to_string(&input)?;
        let outcome = if file.category == Category::Page {
            self.rewrite_page(&file.relative_path, &text)?
        } else {
            self.normalize(&text)
        };

        write_output(&dest, outcome.text.as_bytes(), config.create_backups)?;

        if let Some(template) = outcome.template {
            info!(
                file = %file.relative_path,
                template = template.id(),
                steps = ?outcome.applied,
                "Rewrote page to route conventions"
            );
        } else {
            debug!(file = %file.relative_path, steps = ?outcome.applied, "Normalized imports");
        }

        Ok(FileResult::processed(&file.relative_path, dest))
    }

    /// Point the default export's parameters at the loader data
    fn rewrite_component_params(&self, relative_path: &str, text: &mut String) -> Result<bool> {
        let Some(signature) = self.default_export.find(text) else {
            return Ok(false);
        };

        let open = signature.end() - 1;
        let close = locate_group(text, open, ScanMode::LiteralAware)
            .map_err(|e| {
                Error::transform(
                    relative_path,
                    format!("default export signature has no closing parenthesis: {e}"),
                )
            })?
            .end;

        if text[open + 1..close].trim() == COMPONENT_PARAMS {
            return Ok(false);
        }
        text.replace_range(open + 1..close, COMPONENT_PARAMS);
        Ok(true)
    }

    /// Replace whole `useState` declarations of fetched data, however many
    /// lines their initial value spans, with a one-line marker
    fn remove_fetched_state(&self, relative_path: &str, text: &str) -> Result<String> {
        let mut out = String::with_capacity(text.len());
        let mut cursor = 0;

        for caps in self.local_state.captures_iter(text) {
            let (Some(whole), Some(indent), Some(name)) = (caps.get(0), caps.get(1), caps.get(2))
            else {
                continue;
            };
            if whole.start() < cursor || !holds_fetched_data(name.as_str()) {
                continue;
            }

            let call = locate_group(text, whole.end() - 1, ScanMode::LiteralAware).map_err(|e| {
                Error::transform(
                    relative_path,
                    format!("useState call for `{}` is not closed: {e}", name.as_str()),
                )
            })?;
            let mut end = call.end_exclusive();
            if text[end..].starts_with(';') {
                end += 1;
            }

            out.push_str(&text[cursor..whole.start()]);
            out.push_str(&format!(
                "{}// [route-migrator] removed local state `{}` (provided by loader)",
                indent.as_str(),
                name.as_str()
            ));
            cursor = end;
        }

        out.push_str(&text[cursor..]);
        Ok(out)
    }
}

/// Heuristic for state that a loader now supplies
fn holds_fetched_data(name: &str) -> bool {
    let name = name.to_lowercase();
    name.contains("data") || name.contains("list")
}

/// `import type { Route } from "./+types/<stem>";`
fn route_type_import(relative_path: &str) -> String {
    let stem = Path::new(relative_path)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("route");
    format!(r#"import type {{ Route }} from "./+types/{stem}";"#)
}

/// Insert every import line not already present; true if any was added
///
/// New lines go at the top of the file, after a leading `"use ..."`
/// directive if there is one.
fn ensure_imports(text: &mut String, imports: &[String]) -> bool {
    let missing: Vec<&str> = imports
        .iter()
        .map(String::as_str)
        .filter(|line| !text.contains(*line))
        .collect();
    if missing.is_empty() {
        return false;
    }

    let mut block = missing.join("\n");
    block.push('\n');

    let first_line_end = text.find('\n').map_or(text.len(), |i| i + 1);
    let first_line = text[..first_line_end].trim();
    let at = if first_line.starts_with("\"use ") || first_line.starts_with("'use ") {
        first_line_end
    } else {
        0
    };
    if at == text.len() && !text.is_empty() && !text.ends_with('\n') {
        text.push('\n');
        text.push_str(&block);
    } else {
        text.insert_str(at, &block);
    }
    true
}

/// Drop repeated identical single-line imports, keeping the first
fn dedupe_imports(text: &str) -> String {
    let mut seen = HashSet::new();
    let mut out = String::with_capacity(text.len());
    for line in text.split_inclusive('\n') {
        let trimmed = line.trim();
        if trimmed.starts_with("import ") && trimmed.ends_with(';') && !seen.insert(trimmed.to_string()) {
            continue;
        }
        out.push_str(line);
    }
    out
}

/// Append a block separated from existing content by one blank line
fn append_block(text: &mut String, block: &str) {
    if !text.is_empty() {
        if !text.ends_with('\n') {
            text.push('\n');
        }
        text.push('\n');
    }
    text.push_str(block);
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn rewriter() -> ConventionRewriter {
        ConventionRewriter::new().unwrap()
    }

    const PAGE: &str = r#"import { useState, useEffect } from "react";
import { Card } from "~/components/Card";

export default function BusinessDirectory(props) {
  const [businessList, setBusinessList] = useState([]);
  const [filter, setFilter] = useState("");
  const [pageData, setPageData] = React.useState(null);

  return <Card items={businessList} filter={filter} />;
}
"#;

    fn count(text: &str, needle: &str) -> usize {
        text.matches(needle).count()
    }

    #[test]
    fn test_template_table_order() {
        assert_eq!(select_template("pages/business/[id].tsx"), TemplateId::BusinessQuery);
        assert_eq!(select_template("pages/BusinessEvents.tsx"), TemplateId::BusinessQuery);
        assert_eq!(select_template("pages/events/index.tsx"), TemplateId::EventQuery);
        assert_eq!(select_template("pages/rewards.tsx"), TemplateId::Generic);
    }

    #[test]
    fn test_rewrite_page_full() {
        let outcome = rewriter().rewrite_page("pages/business/directory.tsx", PAGE).unwrap();
        let text = &outcome.text;

        assert_eq!(outcome.template, Some(TemplateId::BusinessQuery));
        assert!(text.starts_with(r#"import type { Route } from "./+types/directory";"#));
        assert_eq!(count(text, "export async function loader("), 1);
        assert!(text.contains("// loader template: business-query"));
        assert!(text.contains(
            "export default function BusinessDirectory({ loaderData }: Route.ComponentProps) {"
        ));
        assert_eq!(count(text, "export function ErrorBoundary("), 1);

        // loader sits directly above the component
        let loader_at = text.find("export async function loader").unwrap();
        let component_at = text.find("export default function").unwrap();
        assert!(loader_at < component_at);

        assert!(text.contains("removed local state `businessList`"));
        assert!(text.contains("removed local state `pageData`"));
        assert!(text.contains("const [filter, setFilter] = useState(\"\");"));
    }

    #[test]
    fn test_rewrite_page_is_idempotent() {
        let once = rewriter().rewrite_page("pages/events.tsx", PAGE).unwrap();
        let twice = rewriter().rewrite_page("pages/events.tsx", &once.text).unwrap();
        assert_eq!(once.text, twice.text);
        assert!(twice.applied.is_empty());
    }

    #[test]
    fn test_imports_never_duplicated() {
        let source = format!(
            "{}\n{}\n{}\nexport default function Home() {{ return null; }}\n",
            FRAMEWORK_IMPORTS[0], FRAMEWORK_IMPORTS[0], FRAMEWORK_IMPORTS[1]
        );
        let outcome = rewriter().rewrite_page("pages/home.tsx", &source).unwrap();

        for import in FRAMEWORK_IMPORTS {
            assert_eq!(count(&outcome.text, import), 1, "{import}");
        }
        assert_eq!(count(&outcome.text, r#"from "./+types/home";"#), 1);
    }

    #[test]
    fn test_loader_appended_without_default_export() {
        let outcome = rewriter()
            .rewrite_page("pages/about.tsx", "export const About = () => null;")
            .unwrap();
        let text = &outcome.text;
        let about_at = text.find("export const About").unwrap();
        let loader_at = text.find("export async function loader").unwrap();
        assert!(about_at < loader_at);
        assert!(text.contains("// loader template: generic"));
        assert!(!outcome.applied.contains(&"component-params"));
    }

    #[test]
    fn test_existing_loader_and_boundary_kept() {
        let source = "export const loader = async () => ({});\nexport function ErrorBoundary() { return null; }\nexport default function Home({ loaderData }: Route.ComponentProps) { return null; }\n";
        let outcome = rewriter().rewrite_page("pages/home.tsx", source).unwrap();
        assert_eq!(outcome.applied, vec!["imports"]);
        assert_eq!(count(&outcome.text, "ErrorBoundary"), 1);
    }

    #[test]
    fn test_use_client_directive_stays_first() {
        let source = "\"use client\";\nexport default function Home() { return null; }\n";
        let outcome = rewriter().rewrite_page("pages/home.tsx", source).unwrap();
        assert!(outcome.text.starts_with("\"use client\";\nimport type { Route }"));
    }

    #[test]
    fn test_unclosed_signature_fails() {
        let source = "export default function Broken(props: { a: string }\n";
        let err = rewriter().rewrite_page("pages/broken.tsx", source).unwrap_err();
        assert!(matches!(err, Error::Transform { .. }));
    }

    #[test]
    fn test_normalize_only_dedupes() {
        let source = "import { a } from \"a\";\nimport { a } from \"a\";\nexport const Card = () => null;\n";
        let outcome = rewriter().normalize(source);
        assert_eq!(
            outcome.text,
            "import { a } from \"a\";\nexport const Card = () => null;\n"
        );
        assert_eq!(outcome.template, None);
        assert!(!outcome.text.contains("loader"));
    }

    #[test]
    fn test_multiline_state_removed_whole() {
        let source = "export default function Home() {\n  const [itemList, setItemList] = useState<Item[]>([\n    { id: 1 },\n    { id: 2, label: \")\" },\n  ]);\n  return <ul />;\n}\n";
        let outcome = rewriter().rewrite_page("pages/home.tsx", source).unwrap();
        let text = &outcome.text;

        assert!(text.contains(
            "  // [route-migrator] removed local state `itemList` (provided by loader)\n  return <ul />;"
        ));
        assert!(!text.contains("{ id: 1 },"));
        assert!(!text.contains("]);"));
    }

    #[test]
    fn test_unclosed_state_call_fails() {
        let source = "export default function Home() {\n  const [dataRows, setDataRows] = useState([\n";
        let err = rewriter().rewrite_page("pages/home.tsx", source).unwrap_err();
        assert!(matches!(err, Error::Transform { .. }));
    }

    #[test]
    fn test_parens_inside_default_values_kept_intact() {
        let source = "export default function Home({ label = \")\" }) {\n  return null;\n}\n";
        let outcome = rewriter().rewrite_page("pages/home.tsx", source).unwrap();
        assert!(outcome.text.contains(
            "export default function Home({ loaderData }: Route.ComponentProps) {\n  return null;"
        ));
        assert!(!outcome.text.contains("\" })"));
    }

    #[test]
    fn test_process_skips_missing_input() {
        let dir = tempdir().unwrap();
        let config = PipelineConfig {
            source_dir: dir.path().join("src"),
            work_dir: dir.path().join("work"),
            ..PipelineConfig::default()
        };
        let file = SourceFile {
            path: dir.path().join("src/pages/home.tsx"),
            relative_path: "pages/home.tsx".into(),
            category: Category::Page,
            has_mock_marker: false,
            size: 0,
        };
        let result = rewriter().process(&file, &config).unwrap();
        assert_eq!(result.status, crate::stage::FileStatus::Skipped);
        assert!(result.message.is_some());
    }
}
