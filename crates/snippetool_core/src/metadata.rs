use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::config::DialectSection;
use crate::lines::LineIndex;
use crate::locate::{DocumentShape, Located};
use crate::rewrite::component_reference;

static LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]+)\]\([^)]+\)").expect("valid regex"));
static CODE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"`([^`]+)`").expect("valid regex"));
static BOLD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*([^*]+)\*\*").expect("valid regex"));
static LABEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\*\*[^*]*:\*\*").expect("valid regex"));
static THRESHOLD_LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\*\*[^*]*[Tt]hreshold[^*]*\*\*[:\s]*\n\n((?:\|.+(?:\n|\z))+)").expect("valid regex")
});
static TABLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:\|.+(?:\n|\z))+").expect("valid regex"));

const STRUCTURAL_PREFIXES: &[&str] = &["#", "import ", "```", "|", ">", "<"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnippetMetadata {
    pub file_name: String,
    pub title: String,
    pub description: Option<String>,
    pub thresholds: Option<String>,
}

impl SnippetMetadata {
    /// First sentence of the description, capped at 100 characters, or the title.
    pub fn short_description(&self) -> String {
        match self.description.as_deref() {
            Some(description) => description
                .split(['.', '!', '?'])
                .next()
                .unwrap_or_default()
                .chars()
                .take(100)
                .collect(),
            None => self.title.clone(),
        }
    }
}

/// Metadata for an artifact no page imports: a title made from the file stem.
pub fn fallback_metadata(file_name: &str, stem: &str) -> SnippetMetadata {
    SnippetMetadata {
        file_name: file_name.to_string(),
        title: stem.replace('-', " "),
        description: None,
        thresholds: None,
    }
}

pub fn mine_located(
    located: &Located<'_>,
    file_name: &str,
    stem: &str,
    dialect: &DialectSection,
) -> SnippetMetadata {
    mine_metadata(
        &located.source.text,
        located.identifier,
        located.shape,
        file_name,
        stem,
        dialect,
    )
}

/// Title, description and threshold table for the artifact bound to `identifier`.
///
/// A single page is mined as a whole. On a shared page the search is bounded to the
/// second-level section holding the artifact's reference; the description falls back
/// to the whole page when that section has no prose.
pub fn mine_metadata(
    text: &str,
    identifier: &str,
    shape: DocumentShape,
    file_name: &str,
    stem: &str,
    dialect: &DialectSection,
) -> SnippetMetadata {
    let normalized = text.replace("\r\n", "\n");
    let index = LineIndex::new(&normalized);
    let page_title = index
        .title_text()
        .map(str::to_string)
        .unwrap_or_else(|| stem.replace('-', " "));

    let (title, description, thresholds) = match shape {
        DocumentShape::Single => (
            page_title,
            page_description(&index),
            find_thresholds(&normalized, &dialect.rating_marker),
        ),
        DocumentShape::Shared { .. } => {
            let reference = component_reference(dialect, identifier);
            let section = normalized
                .find(&reference)
                .and_then(|offset| index.section_before(offset));
            match section {
                Some(heading) => {
                    let region_end = index
                        .section_after(heading.start)
                        .map_or(normalized.len(), |next| next.start);
                    let region = &normalized[heading.end..region_end];
                    // A section without prose borrows from later text only, never from
                    // anything above its own heading.
                    let description = first_paragraph(region)
                        .or_else(|| first_paragraph(&normalized[heading.end..]));
                    (
                        format!("{page_title}: {}", heading.text),
                        description,
                        find_thresholds(region, &dialect.rating_marker),
                    )
                }
                None => (page_title, page_description(&index), None),
            }
        }
    };

    SnippetMetadata {
        file_name: file_name.to_string(),
        title,
        description,
        thresholds,
    }
}

fn page_description(index: &LineIndex<'_>) -> Option<String> {
    let start = index.title().map_or(0, |line| line.end);
    first_paragraph(&index.text()[start..])
}

/// First prose paragraph in `region`, with inline markup reduced to plain text.
fn first_paragraph(region: &str) -> Option<String> {
    paragraphs(region)
        .into_iter()
        .map(|paragraph| paragraph.trim().to_string())
        .find(|paragraph| !is_structural(paragraph))
        .map(|paragraph| strip_inline_markup(&paragraph))
        .filter(|paragraph| !paragraph.is_empty())
}

/// Split on blank lines, keeping each fenced block together as one paragraph even when
/// it contains blank lines.
fn paragraphs(region: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut in_fence = false;

    for line in region.lines() {
        let is_fence = line.trim_start().starts_with("```");
        if in_fence {
            current.push(line);
            if is_fence {
                in_fence = false;
                out.push(current.join("\n"));
                current.clear();
            }
            continue;
        }
        if is_fence {
            if !current.is_empty() {
                out.push(current.join("\n"));
                current.clear();
            }
            current.push(line);
            in_fence = true;
            continue;
        }
        if line.trim().is_empty() {
            if !current.is_empty() {
                out.push(current.join("\n"));
                current.clear();
            }
            continue;
        }
        current.push(line);
    }
    if !current.is_empty() {
        out.push(current.join("\n"));
    }
    out
}

fn is_structural(paragraph: &str) -> bool {
    paragraph.is_empty()
        || STRUCTURAL_PREFIXES
            .iter()
            .any(|prefix| paragraph.starts_with(prefix))
        || LABEL_RE.is_match(paragraph)
}

pub fn strip_inline_markup(paragraph: &str) -> String {
    let text = LINK_RE.replace_all(paragraph, "$1");
    let text = CODE_RE.replace_all(&text, "$1");
    let text = BOLD_RE.replace_all(&text, "$1");
    text.replace('\n', " ").trim().to_string()
}

/// The table under a bold "threshold" label, else the first table holding `marker`.
pub fn find_thresholds(region: &str, marker: &str) -> Option<String> {
    if let Some(table) = THRESHOLD_LABEL_RE
        .captures(region)
        .and_then(|captures| captures.get(1))
    {
        return Some(table.as_str().trim_end().to_string());
    }
    TABLE_RE
        .find_iter(region)
        .find(|table| table.as_str().contains(marker))
        .map(|table| table.as_str().trim_end().to_string())
}
