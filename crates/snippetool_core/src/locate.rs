use anyhow::{Context, Result};
use regex::Regex;
use serde::Serialize;

use crate::config::{DialectSection, ToolConfig};
use crate::filesystem::{SourceDocument, list_category_documents, read_text_file};
use crate::runtime::ResolvedPaths;

/// How many artifacts a page imports, decided once when the page is located.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DocumentShape {
    Single,
    Shared { import_count: usize },
}

impl DocumentShape {
    pub fn from_import_count(import_count: usize) -> Self {
        if import_count > 1 {
            Self::Shared { import_count }
        } else {
            Self::Single
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Shared { .. } => "shared",
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoadedDocument {
    pub document: SourceDocument,
    pub text: String,
}

/// A page that imports a given artifact, with the identifier the import binds.
#[derive(Debug, Clone, Copy)]
pub struct Located<'a> {
    pub source: &'a LoadedDocument,
    pub identifier: &'a str,
    pub shape: DocumentShape,
}

#[derive(Debug, Clone, Serialize)]
pub struct LocateReport {
    pub category: String,
    pub artifact: String,
    pub located: bool,
    pub document: Option<String>,
    pub identifier: Option<String>,
    pub shape: Option<DocumentShape>,
}

pub fn load_category_documents(
    paths: &ResolvedPaths,
    category: &str,
    dialect: &DialectSection,
) -> Result<Vec<LoadedDocument>> {
    list_category_documents(paths, category, dialect)?
        .into_iter()
        .map(|document| {
            let text = read_text_file(&document.path)?;
            Ok(LoadedDocument { document, text })
        })
        .collect()
}

/// Matches the import line for one artifact file name and captures its identifier.
pub fn artifact_import_pattern(file_name: &str, dialect: &DialectSection) -> Result<Regex> {
    let pattern = format!(
        r"import (\w+) from '[^']*/{}{}'",
        regex::escape(file_name),
        regex::escape(&dialect.import_suffix)
    );
    Regex::new(&pattern).with_context(|| format!("failed to build import pattern for {file_name}"))
}

pub fn count_artifact_imports(text: &str, dialect: &DialectSection) -> Result<usize> {
    let pattern = format!(r"(?m)^import {}\w* from ", regex::escape(&dialect.binding_prefix));
    let regex = Regex::new(&pattern).context("failed to build import count pattern")?;
    Ok(regex.find_iter(text).count())
}

/// First page (in the given order) whose imports include `file_name`.
pub fn locate_artifact<'a>(
    documents: &'a [LoadedDocument],
    file_name: &str,
    dialect: &DialectSection,
) -> Result<Option<Located<'a>>> {
    let pattern = artifact_import_pattern(file_name, dialect)?;
    for source in documents {
        let Some(captures) = pattern.captures(&source.text) else {
            continue;
        };
        let Some(identifier) = captures.get(1) else {
            continue;
        };
        let shape = DocumentShape::from_import_count(count_artifact_imports(&source.text, dialect)?);
        return Ok(Some(Located {
            source,
            identifier: identifier.as_str(),
            shape,
        }));
    }
    Ok(None)
}

/// Load one category and report which page imports `artifact`.
pub fn run_locate(
    paths: &ResolvedPaths,
    config: &ToolConfig,
    category: &str,
    artifact: &str,
) -> Result<LocateReport> {
    let documents = load_category_documents(paths, category, &config.dialect)?;
    let located = locate_artifact(&documents, artifact, &config.dialect)?;
    Ok(LocateReport {
        category: category.to_string(),
        artifact: artifact.to_string(),
        located: located.is_some(),
        document: located.map(|found| found.source.document.relative_path.clone()),
        identifier: located.map(|found| found.identifier.to_string()),
        shape: located.map(|found| found.shape),
    })
}
