use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Serialize;

use crate::config::ToolConfig;
use crate::filesystem::{copy_dir_recursive, validate_within, write_text_file};
use crate::runtime::ResolvedPaths;

/// Where generated skill directories are published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallTarget {
    /// `<project root>/<install.target_dir>`; settings are registered in the project.
    Project,
    /// `<home>/<install.target_dir>`; settings are left to the user.
    Global { home: PathBuf },
    Explicit(PathBuf),
}

#[derive(Debug, Clone)]
pub struct InstallOptions {
    pub target: InstallTarget,
    pub write_settings: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct InstallReport {
    pub target_dir: String,
    pub installed: Vec<String>,
    pub copied_files: usize,
    pub settings_path: Option<String>,
}

#[derive(Debug, Serialize)]
struct SkillSettings {
    skills: Vec<SkillPath>,
}

#[derive(Debug, Serialize)]
struct SkillPath {
    path: String,
}

pub fn resolve_install_dir(
    paths: &ResolvedPaths,
    config: &ToolConfig,
    target: &InstallTarget,
) -> PathBuf {
    match target {
        InstallTarget::Project => paths.project_root.join(&config.install.target_dir),
        InstallTarget::Global { home } => home.join(&config.install.target_dir),
        InstallTarget::Explicit(path) if path.is_absolute() => path.clone(),
        InstallTarget::Explicit(path) => paths.project_root.join(path),
    }
}

/// Copy every generated skill directory into the install target, replacing older
/// copies, and register them in the project settings file when asked to.
pub fn install_skills(
    paths: &ResolvedPaths,
    config: &ToolConfig,
    options: &InstallOptions,
) -> Result<InstallReport> {
    let skill_dirs = generated_skill_dirs(&paths.skills_dir)?;
    if skill_dirs.is_empty() {
        bail!(
            "no generated skills under {}\nrun `snippetool generate` first",
            paths.display_relative(&paths.skills_dir)
        );
    }

    let target_dir = resolve_install_dir(paths, config, &options.target);
    fs::create_dir_all(&target_dir)
        .with_context(|| format!("failed to create {}", target_dir.display()))?;

    let mut installed = Vec::with_capacity(skill_dirs.len());
    let mut copied_files = 0usize;
    for name in &skill_dirs {
        let destination = target_dir.join(name);
        validate_within(&[target_dir.as_path()], &destination)?;
        if destination.exists() {
            fs::remove_dir_all(&destination)
                .with_context(|| format!("failed to remove {}", destination.display()))?;
        }
        copied_files += copy_dir_recursive(&paths.skills_dir.join(name), &destination)?;
        installed.push(name.clone());
    }

    let register = options.write_settings && !matches!(options.target, InstallTarget::Global { .. });
    let settings_path = if register {
        let settings_path = paths.project_root.join(&config.install.settings_path);
        write_text_file(&settings_path, &render_settings(&installed)?)?;
        Some(paths.display_relative(&settings_path))
    } else {
        None
    };

    Ok(InstallReport {
        target_dir: paths.display_relative(&target_dir),
        installed,
        copied_files,
        settings_path,
    })
}

fn generated_skill_dirs(skills_dir: &Path) -> Result<Vec<String>> {
    if !skills_dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut names = Vec::new();
    let entries =
        fs::read_dir(skills_dir).with_context(|| format!("failed to list {}", skills_dir.display()))?;
    for entry in entries {
        let entry = entry.with_context(|| format!("failed to list {}", skills_dir.display()))?;
        if !entry.file_type().is_ok_and(|file_type| file_type.is_dir()) {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            names.push(name.to_string());
        }
    }
    names.sort();
    Ok(names)
}

fn render_settings(installed: &[String]) -> Result<String> {
    let settings = SkillSettings {
        skills: installed
            .iter()
            .map(|name| SkillPath {
                path: format!("./skills/{name}"),
            })
            .collect(),
    };
    let mut json = serde_json::to_string_pretty(&settings).context("failed to encode settings")?;
    json.push('\n');
    Ok(json)
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use tempfile::tempdir;

    use super::{InstallOptions, InstallTarget, install_skills};
    use crate::config::default_config;
    use crate::filesystem::write_text_file;
    use crate::runtime::{ResolvedPaths, ValueSource};

    fn paths(project_root: &Path) -> ResolvedPaths {
        ResolvedPaths {
            pages_dir: project_root.join("pages"),
            snippets_dir: project_root.join("snippets"),
            skills_dir: project_root.join("skills"),
            state_dir: project_root.join(".snippetool"),
            config_path: project_root.join(".snippetool").join("config.toml"),
            project_root: project_root.to_path_buf(),
            root_source: ValueSource::Flag,
            config_source: ValueSource::Default,
        }
    }

    #[test]
    fn project_install_copies_and_registers() {
        let temp = tempdir().expect("tempdir");
        let paths = paths(temp.path());
        let config = default_config().expect("config");
        write_text_file(&paths.skills_dir.join("webperf").join("SKILL.md"), "umbrella")
            .expect("write umbrella");
        write_text_file(
            &paths
                .skills_dir
                .join("webperf-loading")
                .join("scripts")
                .join("TTFB.js"),
            "ttfb()\n",
        )
        .expect("write script");
        let stale = temp
            .path()
            .join(".claude")
            .join("skills")
            .join("webperf")
            .join("old.md");
        write_text_file(&stale, "old").expect("write stale");

        let report = install_skills(
            &paths,
            &config,
            &InstallOptions {
                target: InstallTarget::Project,
                write_settings: true,
            },
        )
        .expect("install");

        assert_eq!(report.target_dir, ".claude/skills");
        assert_eq!(report.installed, vec!["webperf", "webperf-loading"]);
        assert_eq!(report.copied_files, 2);
        assert!(!stale.exists());
        assert!(
            temp.path()
                .join(".claude/skills/webperf-loading/scripts/TTFB.js")
                .exists()
        );

        let settings = fs::read_to_string(temp.path().join(".claude").join("settings.json"))
            .expect("read settings");
        let parsed: serde_json::Value = serde_json::from_str(&settings).expect("json");
        assert_eq!(parsed["skills"][1]["path"], "./skills/webperf-loading");
        assert!(settings.ends_with("}\n"));
    }

    #[test]
    fn global_install_skips_settings() {
        let temp = tempdir().expect("tempdir");
        let project = temp.path().join("project");
        let home = temp.path().join("home");
        let paths = paths(&project);
        let config = default_config().expect("config");
        write_text_file(&paths.skills_dir.join("webperf").join("SKILL.md"), "umbrella")
            .expect("write umbrella");

        let report = install_skills(
            &paths,
            &config,
            &InstallOptions {
                target: InstallTarget::Global { home: home.clone() },
                write_settings: true,
            },
        )
        .expect("install");

        assert!(report.settings_path.is_none());
        assert!(home.join(".claude/skills/webperf/SKILL.md").exists());
        assert!(!project.join(".claude").exists());
    }

    #[test]
    fn nothing_generated_is_an_error() {
        let temp = tempdir().expect("tempdir");
        let paths = paths(temp.path());
        let config = default_config().expect("config");
        let error = install_skills(
            &paths,
            &config,
            &InstallOptions {
                target: InstallTarget::Project,
                write_settings: false,
            },
        )
        .expect_err("must fail");
        assert!(error.to_string().contains("snippetool generate"));
    }
}
