use std::collections::BTreeSet;

use anyhow::{Result, bail};
use serde::Serialize;

use crate::blocks::ExtractionBlock;
use crate::config::DialectSection;
use crate::filesystem::SourceDocument;
use crate::slug::derive_slug;

/// An artifact a document will produce, before anything touches the disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedArtifact {
    pub index: usize,
    pub identifier: String,
    pub file_name: String,
    pub heading: Option<String>,
    pub code: String,
}

impl PlannedArtifact {
    pub fn content(&self) -> String {
        format!("{}\n", self.code)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replacement {
    pub start: usize,
    pub end: usize,
    pub text: String,
}

/// `snippet`, `snippet2`, `snippet3`, ...
pub fn binding_identifier(prefix: &str, index: usize) -> String {
    if index == 0 {
        prefix.to_string()
    } else {
        format!("{prefix}{}", index + 1)
    }
}

/// `<base>.<ext>` for the first block, then `<base>-<slug>.<ext>` or `<base>-<index+1>.<ext>`.
pub fn artifact_filename(base_name: &str, index: usize, slug: &str, extension: &str) -> String {
    if index == 0 {
        format!("{base_name}.{extension}")
    } else if slug.is_empty() {
        format!("{base_name}-{}.{extension}", index + 1)
    } else {
        format!("{base_name}-{slug}.{extension}")
    }
}

/// Name every block of one document. Two headings that slug identically would write the
/// same file; the later one keeps appending `-<index+1>` until its name is free.
pub fn plan_artifacts(
    base_name: &str,
    blocks: &[ExtractionBlock],
    dialect: &DialectSection,
) -> Vec<PlannedArtifact> {
    let mut taken = BTreeSet::new();
    let mut planned = Vec::with_capacity(blocks.len());
    for (index, block) in blocks.iter().enumerate() {
        let slug = derive_slug(block.heading.as_deref(), base_name);
        let mut file_name = artifact_filename(base_name, index, &slug, &dialect.artifact_extension);
        while taken.contains(&file_name) {
            let stem = file_name
                .strip_suffix(&format!(".{}", dialect.artifact_extension))
                .unwrap_or(&file_name)
                .to_string();
            file_name = format!("{stem}-{}.{}", index + 1, dialect.artifact_extension);
        }
        taken.insert(file_name.clone());
        planned.push(PlannedArtifact {
            index,
            identifier: binding_identifier(&dialect.binding_prefix, index),
            file_name,
            heading: block.heading.clone(),
            code: block.code.clone(),
        });
    }
    planned
}

pub fn component_reference(dialect: &DialectSection, identifier: &str) -> String {
    format!("<{} code={{{identifier}}} />", dialect.component_name)
}

pub fn component_import_line(dialect: &DialectSection, depth: usize) -> String {
    format!(
        "import {{ {} }} from '{}{}'",
        dialect.component_name,
        "../".repeat(depth),
        dialect.component_import
    )
}

pub fn artifact_import_line(
    dialect: &DialectSection,
    snippets_dir: &str,
    document: &SourceDocument,
    artifact: &PlannedArtifact,
) -> String {
    format!(
        "import {} from '{}{snippets_dir}/{}{}{}'",
        artifact.identifier,
        "../".repeat(document.depth()),
        document.category_prefix(),
        artifact.file_name,
        dialect.import_suffix
    )
}

/// A document counts as already extracted once it carries the shared component import.
pub fn is_already_extracted(text: &str, dialect: &DialectSection) -> bool {
    let head = format!("import {{ {} }} from '", dialect.component_name);
    let tail = format!("{}'", dialect.component_import);
    text.lines()
        .map(|line| line.trim_end_matches('\r'))
        .any(|line| line.starts_with(&head) && line.ends_with(&tail))
}

/// File names of the artifacts an extracted page already imports from `snippets_dir`.
pub fn imported_artifact_names(
    text: &str,
    dialect: &DialectSection,
    snippets_dir: &str,
) -> Vec<String> {
    let marker = format!("{snippets_dir}/");
    let suffix = format!("{}'", dialect.import_suffix);
    text.lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| line.starts_with("import "))
        .filter_map(|line| {
            let (_, source) = line.split_once(" from '")?;
            let source = source.strip_suffix(&suffix)?;
            if !source.contains(&marker) {
                return None;
            }
            let name = source.rsplit('/').next()?;
            (!name.is_empty()).then(|| name.to_string())
        })
        .collect()
}

/// Apply non-overlapping replacements computed against the same unmodified text.
///
/// Edits run from the highest offset down so every pending span still points at
/// untouched bytes.
pub fn apply_replacements(text: &str, replacements: &[Replacement]) -> Result<String> {
    let mut ordered: Vec<&Replacement> = replacements.iter().collect();
    ordered.sort_by_key(|replacement| replacement.start);
    for pair in ordered.windows(2) {
        if pair[0].end > pair[1].start {
            bail!(
                "overlapping replacement spans: {}..{} and {}..{}",
                pair[0].start,
                pair[0].end,
                pair[1].start,
                pair[1].end
            );
        }
    }

    let mut output = text.to_string();
    for replacement in ordered.iter().rev() {
        if replacement.start > replacement.end
            || replacement.end > text.len()
            || !text.is_char_boundary(replacement.start)
            || !text.is_char_boundary(replacement.end)
        {
            bail!(
                "replacement span {}..{} does not fit a {}-byte document",
                replacement.start,
                replacement.end,
                text.len()
            );
        }
        output.replace_range(replacement.start..replacement.end, &replacement.text);
    }
    Ok(output)
}

/// Produce the rewritten document: every block swapped for a component reference, then
/// one import line per artifact plus the component import, a blank line, and the body.
pub fn rewrite_document(
    text: &str,
    document: &SourceDocument,
    blocks: &[ExtractionBlock],
    artifacts: &[PlannedArtifact],
    dialect: &DialectSection,
    snippets_dir: &str,
) -> Result<String> {
    if blocks.len() != artifacts.len() {
        bail!(
            "{}: {} blocks but {} planned artifacts",
            document.relative_path,
            blocks.len(),
            artifacts.len()
        );
    }

    let replacements: Vec<Replacement> = blocks
        .iter()
        .zip(artifacts)
        .map(|(block, artifact)| Replacement {
            start: block.start,
            end: block.end,
            text: component_reference(dialect, &artifact.identifier),
        })
        .collect();
    let body = apply_replacements(text, &replacements)?;

    let mut header = String::new();
    for artifact in artifacts {
        header.push_str(&artifact_import_line(dialect, snippets_dir, document, artifact));
        header.push('\n');
    }
    header.push_str(&component_import_line(dialect, document.depth()));
    header.push_str("\n\n");
    Ok(header + &body)
}
