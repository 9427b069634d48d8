use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::config::{PathsSection, ToolConfig, embedded_default_config};
use crate::filesystem::{list_artifacts, normalize_path, scan_documents, write_text_file};
use crate::manifest::MANIFEST_FILE_NAME;

pub const STATE_DIR_NAME: &str = ".snippetool";
pub const DEFAULT_PAGES_DIR: &str = "pages";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueSource {
    Flag,
    Env,
    Heuristic,
    Default,
}

impl ValueSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Flag => "flag",
            Self::Env => "env",
            Self::Heuristic => "heuristic",
            Self::Default => "default",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PathOverrides {
    pub project_root: Option<PathBuf>,
    pub config: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct ResolutionContext {
    pub cwd: PathBuf,
    pub executable_dir: Option<PathBuf>,
}

impl ResolutionContext {
    pub fn from_process() -> Result<Self> {
        let cwd = env::current_dir().context("failed to read current directory")?;
        let executable_dir = env::current_exe()
            .ok()
            .and_then(|path| path.parent().map(Path::to_path_buf));
        Ok(Self {
            cwd,
            executable_dir,
        })
    }
}

/// The three fixed roots (input documents, artifact output, manifest output) plus the
/// tool's own state directory.
#[derive(Debug, Clone)]
pub struct ResolvedPaths {
    pub project_root: PathBuf,
    pub pages_dir: PathBuf,
    pub snippets_dir: PathBuf,
    pub skills_dir: PathBuf,
    pub state_dir: PathBuf,
    pub config_path: PathBuf,
    pub root_source: ValueSource,
    pub config_source: ValueSource,
}

impl ResolvedPaths {
    /// Point the document, artifact and manifest roots at the configured directories.
    pub fn with_layout(mut self, layout: &PathsSection) -> Self {
        self.pages_dir = absolutize(Path::new(&layout.pages_dir), &self.project_root);
        self.snippets_dir = absolutize(Path::new(&layout.snippets_dir), &self.project_root);
        self.skills_dir = absolutize(Path::new(&layout.skills_dir), &self.project_root);
        self
    }

    pub fn diagnostics(&self) -> String {
        format!(
            "project_root={} ({})\nstate_dir={}\npages_dir={}\nsnippets_dir={}\nskills_dir={}\nconfig_path={} ({})",
            normalize_path(&self.project_root),
            self.root_source.as_str(),
            normalize_path(&self.state_dir),
            normalize_path(&self.pages_dir),
            normalize_path(&self.snippets_dir),
            normalize_path(&self.skills_dir),
            normalize_path(&self.config_path),
            self.config_source.as_str(),
        )
    }

    /// Relative, `/`-separated path from the project root; falls back to the full path.
    pub fn display_relative(&self, path: &Path) -> String {
        match path.strip_prefix(&self.project_root) {
            Ok(relative) => normalize_path(relative),
            Err(_) => normalize_path(path),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RuntimeStatus {
    pub project_root_exists: bool,
    pub pages_exists: bool,
    pub snippets_exists: bool,
    pub skills_exists: bool,
    pub state_dir_exists: bool,
    pub config_exists: bool,
    pub document_count: usize,
    pub artifact_count: usize,
    pub manifest_count: usize,
    pub warnings: Vec<String>,
}

pub fn resolve_paths(
    context: &ResolutionContext,
    overrides: &PathOverrides,
) -> Result<ResolvedPaths> {
    resolve_paths_with_lookup(context, overrides, |key| env::var(key).ok())
}

pub fn resolve_paths_with_lookup<F>(
    context: &ResolutionContext,
    overrides: &PathOverrides,
    lookup_env: F,
) -> Result<ResolvedPaths>
where
    F: Fn(&str) -> Option<String>,
{
    let (project_root, root_source) = resolve_project_root(context, overrides, &lookup_env);
    let state_dir = project_root.join(STATE_DIR_NAME);

    let (config_path, config_source) = if let Some(path) = overrides.config.as_deref() {
        (absolutize(path, &context.cwd), ValueSource::Flag)
    } else if let Some(value) = lookup_env("SNIPPETOOL_CONFIG")
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
    {
        (absolutize(Path::new(&value), &project_root), ValueSource::Env)
    } else {
        (state_dir.join("config.toml"), ValueSource::Default)
    };

    Ok(ResolvedPaths {
        pages_dir: project_root.join(DEFAULT_PAGES_DIR),
        snippets_dir: project_root.join("snippets"),
        skills_dir: project_root.join("skills"),
        state_dir,
        config_path,
        project_root,
        root_source,
        config_source,
    })
}

fn resolve_project_root<F>(
    context: &ResolutionContext,
    overrides: &PathOverrides,
    lookup_env: &F,
) -> (PathBuf, ValueSource)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(path) = overrides.project_root.as_deref() {
        return (absolutize(path, &context.cwd), ValueSource::Flag);
    }

    if let Some(value) = lookup_env("SNIPPETOOL_PROJECT_ROOT")
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
    {
        return (absolutize(Path::new(&value), &context.cwd), ValueSource::Env);
    }

    match detect_project_root_heuristic(&context.cwd, context.executable_dir.as_deref()) {
        Some(root) => (root, ValueSource::Heuristic),
        None => (context.cwd.clone(), ValueSource::Default),
    }
}

fn detect_project_root_heuristic(cwd: &Path, executable_dir: Option<&Path>) -> Option<PathBuf> {
    let mut seen = HashSet::new();
    let candidates = cwd
        .ancestors()
        .chain(executable_dir.into_iter().flat_map(Path::ancestors));
    for candidate in candidates {
        if !seen.insert(candidate.to_path_buf()) {
            continue;
        }
        if candidate.join(STATE_DIR_NAME).is_dir() || candidate.join(DEFAULT_PAGES_DIR).is_dir()
        {
            return Some(candidate.to_path_buf());
        }
    }
    None
}

fn absolutize(path: &Path, base: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

#[derive(Debug, Clone, Default)]
pub struct InitOptions {
    pub force: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct InitReport {
    pub created_dirs: Vec<String>,
    pub wrote_config: bool,
}

pub fn init_layout(paths: &ResolvedPaths, options: &InitOptions) -> Result<InitReport> {
    let mut created_dirs = Vec::new();
    for dir in [
        &paths.pages_dir,
        &paths.snippets_dir,
        &paths.skills_dir,
        &paths.state_dir,
    ] {
        if !dir.exists() {
            fs::create_dir_all(dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
            created_dirs.push(paths.display_relative(dir));
        }
    }

    let wrote_config = if paths.config_path.exists() && !options.force {
        false
    } else {
        write_text_file(&paths.config_path, embedded_default_config())?;
        true
    };

    Ok(InitReport {
        created_dirs,
        wrote_config,
    })
}

pub fn inspect_runtime(paths: &ResolvedPaths, config: &ToolConfig) -> Result<RuntimeStatus> {
    let pages_exists = paths.pages_dir.is_dir();
    let snippets_exists = paths.snippets_dir.is_dir();
    let skills_exists = paths.skills_dir.is_dir();

    let document_count = if pages_exists {
        scan_documents(paths, &config.dialect)?.len()
    } else {
        0
    };

    let mut artifact_count = 0usize;
    let mut manifest_count = 0usize;
    for category in &config.categories {
        artifact_count += list_artifacts(
            &paths.snippets_dir.join(&category.id),
            &config.dialect.artifact_extension,
        )?
        .len();
        if paths.skills_dir.join(&category.skill).join(MANIFEST_FILE_NAME).exists() {
            manifest_count += 1;
        }
    }
    if paths
        .skills_dir
        .join(&config.umbrella.skill)
        .join(MANIFEST_FILE_NAME)
        .exists()
    {
        manifest_count += 1;
    }

    let mut warnings = Vec::new();
    if !pages_exists {
        warnings.push(format!(
            "{} is missing; run `snippetool init` before `extract`",
            paths.display_relative(&paths.pages_dir)
        ));
    }
    if !snippets_exists {
        warnings.push(format!(
            "{} is missing; `generate` will emit empty manifests until `extract` runs",
            paths.display_relative(&paths.snippets_dir)
        ));
    }
    if config.categories.is_empty() {
        warnings.push("no [[categories]] configured; `generate` writes only the umbrella manifest".to_string());
    }

    Ok(RuntimeStatus {
        project_root_exists: paths.project_root.exists(),
        pages_exists,
        snippets_exists,
        skills_exists,
        state_dir_exists: paths.state_dir.is_dir(),
        config_exists: paths.config_path.exists(),
        document_count,
        artifact_count,
        manifest_count,
        warnings,
    })
}
