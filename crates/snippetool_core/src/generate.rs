use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::config::ToolConfig;
use crate::filesystem::{list_artifacts, validate_scoped_path, write_text_file};
use crate::locate::{load_category_documents, locate_artifact};
use crate::manifest::{
    CategoryCount, MANIFEST_FILE_NAME, ensure_valid, render_category_manifest,
    render_umbrella_manifest,
};
use crate::metadata::{SnippetMetadata, fallback_metadata, mine_located};
use crate::runtime::ResolvedPaths;

#[derive(Debug, Clone, Serialize)]
pub struct ManifestSummary {
    pub skill: String,
    pub path: String,
    pub artifacts: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerateReport {
    pub manifests: Vec<ManifestSummary>,
    pub total_artifacts: usize,
    pub copied_scripts: usize,
    pub unlocated: Vec<String>,
}

struct CategoryOutput {
    skill: String,
    manifest_path: PathBuf,
    scripts_dir: PathBuf,
    sources: Vec<PathBuf>,
    content: String,
}

/// Pass 2: rebuild every category manifest and the umbrella manifest from the
/// artifacts on disk and the pages that import them.
///
/// Headers are validated for the whole batch first; one bad category stops the run
/// before any file is written. Manifests are rendered in memory, then written.
pub fn run_generate(paths: &ResolvedPaths, config: &ToolConfig) -> Result<GenerateReport> {
    ensure_valid(config)?;

    let dialect = &config.dialect;
    let mut outputs = Vec::new();
    let mut counts = Vec::with_capacity(config.categories.len());
    let mut unlocated = Vec::new();

    for category in &config.categories {
        let artifact_dir = paths.snippets_dir.join(&category.id);
        let artifact_names = list_artifacts(&artifact_dir, &dialect.artifact_extension)?;
        counts.push(CategoryCount {
            category,
            artifacts: artifact_names.len(),
        });
        if artifact_names.is_empty() {
            continue;
        }

        let documents = load_category_documents(paths, &category.id, dialect)?;
        let mut metas: Vec<SnippetMetadata> = Vec::with_capacity(artifact_names.len());
        for file_name in &artifact_names {
            let stem = artifact_stem(file_name, &dialect.artifact_extension);
            match locate_artifact(&documents, file_name, dialect)? {
                Some(located) => metas.push(mine_located(&located, file_name, stem, dialect)),
                None => {
                    unlocated.push(format!("{}/{file_name}", category.id));
                    metas.push(fallback_metadata(file_name, stem));
                }
            }
        }

        let skill_dir = paths.skills_dir.join(&category.skill);
        outputs.push(CategoryOutput {
            skill: category.skill.clone(),
            manifest_path: skill_dir.join(MANIFEST_FILE_NAME),
            scripts_dir: skill_dir.join(&config.manifest.scripts_dir),
            sources: artifact_names
                .iter()
                .map(|name| artifact_dir.join(name))
                .collect(),
            content: render_category_manifest(category, &config.manifest, &metas),
        });
    }

    let umbrella_path = paths
        .skills_dir
        .join(&config.umbrella.skill)
        .join(MANIFEST_FILE_NAME);
    let umbrella = render_umbrella_manifest(config, &counts);

    for output in &outputs {
        validate_scoped_path(paths, &output.manifest_path)?;
        validate_scoped_path(paths, &output.scripts_dir)?;
    }
    validate_scoped_path(paths, &umbrella_path)?;

    let mut manifests = Vec::new();
    let mut copied_scripts = 0usize;
    for output in &outputs {
        copied_scripts += replace_scripts(&output.scripts_dir, &output.sources)?;
        write_text_file(&output.manifest_path, &output.content)?;
        manifests.push(ManifestSummary {
            skill: output.skill.clone(),
            path: paths.display_relative(&output.manifest_path),
            artifacts: output.sources.len(),
        });
    }
    write_text_file(&umbrella_path, &umbrella)?;
    let total_artifacts = counts.iter().map(|count| count.artifacts).sum();
    manifests.push(ManifestSummary {
        skill: config.umbrella.skill.clone(),
        path: paths.display_relative(&umbrella_path),
        artifacts: total_artifacts,
    });

    Ok(GenerateReport {
        manifests,
        total_artifacts,
        copied_scripts,
        unlocated,
    })
}

fn artifact_stem<'a>(file_name: &'a str, extension: &str) -> &'a str {
    file_name
        .strip_suffix(extension)
        .and_then(|stem| stem.strip_suffix('.'))
        .unwrap_or(file_name)
}

/// Empty `scripts_dir` and copy `sources` into it.
fn replace_scripts(scripts_dir: &Path, sources: &[PathBuf]) -> Result<usize> {
    if scripts_dir.exists() {
        fs::remove_dir_all(scripts_dir)
            .with_context(|| format!("failed to clear {}", scripts_dir.display()))?;
    }
    fs::create_dir_all(scripts_dir)
        .with_context(|| format!("failed to create {}", scripts_dir.display()))?;
    for source in sources {
        let Some(name) = source.file_name() else {
            continue;
        };
        let target = scripts_dir.join(name);
        fs::copy(source, &target).with_context(|| {
            format!("failed to copy {} to {}", source.display(), target.display())
        })?;
    }
    Ok(sources.len())
}
