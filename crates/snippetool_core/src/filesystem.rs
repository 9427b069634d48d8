use std::fs;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Serialize;
use walkdir::WalkDir;

use crate::config::DialectSection;
use crate::runtime::ResolvedPaths;

/// A documentation page on disk. The category is its directory relative to the pages
/// root (empty for pages at the root); the base name is its file stem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceDocument {
    #[serde(skip)]
    pub path: PathBuf,
    pub relative_path: String,
    pub category: String,
    pub base_name: String,
}

impl SourceDocument {
    pub fn is_root_category(&self) -> bool {
        self.category.is_empty()
    }

    /// `"Loading/"` for a categorized page, `""` at the root.
    pub fn category_prefix(&self) -> String {
        if self.is_root_category() {
            String::new()
        } else {
            format!("{}/", self.category)
        }
    }

    /// Number of `../` segments from the page back to the project root.
    pub fn depth(&self) -> usize {
        1 + self
            .category
            .split('/')
            .filter(|segment| !segment.is_empty())
            .count()
    }
}

pub fn scan_documents(paths: &ResolvedPaths, dialect: &DialectSection) -> Result<Vec<SourceDocument>> {
    let mut documents = Vec::new();
    if !paths.pages_dir.exists() {
        return Ok(documents);
    }

    for entry in WalkDir::new(&paths.pages_dir).follow_links(false) {
        let entry = entry.with_context(|| format!("failed to walk {}", paths.pages_dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if !has_extension(path, &dialect.document_extension) {
            continue;
        }
        validate_scoped_path(paths, path)?;
        documents.push(source_document(&paths.pages_dir, path)?);
    }

    documents.sort_by(|left, right| left.relative_path.cmp(&right.relative_path));
    Ok(documents)
}

fn source_document(pages_dir: &Path, path: &Path) -> Result<SourceDocument> {
    let relative = path.strip_prefix(pages_dir).with_context(|| {
        format!(
            "failed to derive relative path from {} for {}",
            pages_dir.display(),
            path.display()
        )
    })?;
    let category = relative.parent().map(normalize_path).unwrap_or_default();
    let base_name = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .ok_or_else(|| anyhow::anyhow!("document name is not valid UTF-8: {}", path.display()))?
        .to_string();

    Ok(SourceDocument {
        path: path.to_path_buf(),
        relative_path: normalize_path(relative),
        category,
        base_name,
    })
}

/// Documents directly inside one category directory, in lexicographic file-name order.
pub fn list_category_documents(
    paths: &ResolvedPaths,
    category: &str,
    dialect: &DialectSection,
) -> Result<Vec<SourceDocument>> {
    let dir = paths.pages_dir.join(category);
    let mut documents = Vec::new();
    for name in list_files_with_extension(&dir, &dialect.document_extension)? {
        documents.push(source_document(&paths.pages_dir, &dir.join(name))?);
    }
    Ok(documents)
}

/// Artifact file names in one category directory, sorted. A missing directory has none.
pub fn list_artifacts(dir: &Path, extension: &str) -> Result<Vec<String>> {
    list_files_with_extension(dir, extension)
}

fn list_files_with_extension(dir: &Path, extension: &str) -> Result<Vec<String>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut names = Vec::new();
    let entries = fs::read_dir(dir).with_context(|| format!("failed to list {}", dir.display()))?;
    for entry in entries {
        let entry = entry.with_context(|| format!("failed to list {}", dir.display()))?;
        if !entry.file_type().is_ok_and(|file_type| file_type.is_file()) {
            continue;
        }
        let path = entry.path();
        if !has_extension(&path, extension) {
            continue;
        }
        if let Some(name) = path.file_name().and_then(|name| name.to_str()) {
            names.push(name.to_string());
        }
    }
    names.sort();
    Ok(names)
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension().and_then(|ext| ext.to_str()) == Some(extension)
}

/// Whole-file write, creating parent directories first.
pub fn write_text_file(path: &Path, content: &str) -> Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| anyhow::anyhow!("path has no parent: {}", path.display()))?;
    fs::create_dir_all(parent)
        .with_context(|| format!("failed to create parent directory {}", parent.display()))?;
    fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

pub fn read_text_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

/// Copy every file under `source` into `destination`, preserving the relative layout.
/// Returns the number of files copied.
pub fn copy_dir_recursive(source: &Path, destination: &Path) -> Result<usize> {
    let mut copied = 0usize;
    for entry in WalkDir::new(source).follow_links(false).sort_by_file_name() {
        let entry = entry.with_context(|| format!("failed to walk {}", source.display()))?;
        let relative = entry.path().strip_prefix(source).with_context(|| {
            format!(
                "failed to derive relative path from {} for {}",
                source.display(),
                entry.path().display()
            )
        })?;
        let target = destination.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)
                .with_context(|| format!("failed to create {}", target.display()))?;
        } else if entry.file_type().is_file() {
            fs::copy(entry.path(), &target).with_context(|| {
                format!(
                    "failed to copy {} to {}",
                    entry.path().display(),
                    target.display()
                )
            })?;
            copied += 1;
        }
    }
    Ok(copied)
}

pub fn validate_scoped_path(paths: &ResolvedPaths, candidate: &Path) -> Result<()> {
    let allowed = [
        paths.pages_dir.as_path(),
        paths.snippets_dir.as_path(),
        paths.skills_dir.as_path(),
        paths.state_dir.as_path(),
    ];
    validate_within(&allowed, &absolute_from_root(paths, candidate))
}

/// Fail unless `candidate` lies under one of `allowed` after lexical normalization.
pub fn validate_within(allowed: &[&Path], candidate: &Path) -> Result<()> {
    let normalized = normalize_pathbuf(candidate);
    let roots: Vec<PathBuf> = allowed.iter().map(|root| normalize_pathbuf(root)).collect();
    if roots.iter().any(|root| normalized.starts_with(root)) {
        return Ok(());
    }

    let root_lines = roots
        .iter()
        .map(|root| format!("  - {}", normalize_path(root)))
        .collect::<Vec<_>>()
        .join("\n");
    bail!(
        "path escapes scoped output directories: {}\nallowed roots:\n{root_lines}",
        normalize_path(&normalized)
    )
}

fn absolute_from_root(paths: &ResolvedPaths, candidate: &Path) -> PathBuf {
    if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        paths.project_root.join(candidate)
    }
}

pub fn normalize_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

fn normalize_pathbuf(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(prefix) => out.push(prefix.as_os_str()),
            Component::RootDir => out.push(Path::new(std::path::MAIN_SEPARATOR_STR)),
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            Component::Normal(part) => out.push(part),
        }
    }
    out
}
