use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use walkdir::WalkDir;

use crate::filesystem::normalize_path;
use crate::runtime::ResolvedPaths;

pub const COMMAND_SURFACE: &[&str] = &[
    "init", "status", "extract", "generate", "install", "locate", "snapshot",
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SnapshotFile {
    pub relative_path: String,
    pub content_hash: String,
    pub bytes: u64,
}

/// Every generated file with a content hash, for comparing two runs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutputSnapshot {
    pub artifact_count: usize,
    pub manifest_file_count: usize,
    pub files: Vec<SnapshotFile>,
}

pub fn command_surface() -> Vec<String> {
    COMMAND_SURFACE
        .iter()
        .map(|command| (*command).to_string())
        .collect()
}

pub fn snapshot_outputs(paths: &ResolvedPaths) -> Result<OutputSnapshot> {
    let artifacts = collect_files(&paths.project_root, &paths.snippets_dir)?;
    let manifests = collect_files(&paths.project_root, &paths.skills_dir)?;

    let mut files = Vec::with_capacity(artifacts.len() + manifests.len());
    for relative_path in artifacts.iter().chain(manifests.iter()) {
        files.push(build_snapshot_file(&paths.project_root, relative_path)?);
    }
    files.sort_by(|left, right| left.relative_path.cmp(&right.relative_path));

    Ok(OutputSnapshot {
        artifact_count: artifacts.len(),
        manifest_file_count: manifests.len(),
        files,
    })
}

fn collect_files(project_root: &Path, base: &Path) -> Result<Vec<String>> {
    if !base.exists() {
        return Ok(Vec::new());
    }

    let mut out = Vec::new();
    for entry in WalkDir::new(base) {
        let entry = entry.with_context(|| format!("failed to walk {}", base.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let relative = path.strip_prefix(project_root).with_context(|| {
            format!(
                "failed to strip project root {} from {}",
                project_root.display(),
                path.display()
            )
        })?;
        out.push(normalize_path(relative));
    }
    Ok(out)
}

fn build_snapshot_file(project_root: &Path, relative_path: &str) -> Result<SnapshotFile> {
    let full_path = project_root.join(relative_path);
    let content =
        fs::read(&full_path).with_context(|| format!("failed to read {}", full_path.display()))?;
    Ok(SnapshotFile {
        relative_path: relative_path.to_string(),
        content_hash: compute_hash(&content),
        bytes: content.len() as u64,
    })
}

fn compute_hash(content: &[u8]) -> String {
    let digest = Sha256::digest(content);
    let mut output = String::with_capacity(16);
    for byte in digest.iter().take(8) {
        output.push_str(&format!("{byte:02x}"));
    }
    output
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use tempfile::tempdir;

    use super::{compute_hash, snapshot_outputs};
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
    fn snapshot_lists_generated_files_in_order() {
        let temp = tempdir().expect("tempdir");
        let paths = paths(temp.path());
        write_text_file(&paths.snippets_dir.join("Loading").join("TTFB.js"), "a\n")
            .expect("write artifact");
        write_text_file(&paths.skills_dir.join("webperf").join("SKILL.md"), "b")
            .expect("write manifest");
        write_text_file(&paths.pages_dir.join("index.mdx"), "ignored").expect("write page");

        let snapshot = snapshot_outputs(&paths).expect("snapshot");
        assert_eq!(snapshot.artifact_count, 1);
        assert_eq!(snapshot.manifest_file_count, 1);
        let listed: Vec<(&str, u64)> = snapshot
            .files
            .iter()
            .map(|file| (file.relative_path.as_str(), file.bytes))
            .collect();
        assert_eq!(
            listed,
            vec![("skills/webperf/SKILL.md", 1), ("snippets/Loading/TTFB.js", 2)]
        );
    }

    #[test]
    fn hash_is_truncated_sha256() {
        assert_eq!(compute_hash(b"abc"), "ba7816bf8f01cfea");
        assert_eq!(compute_hash(b"abc").len(), 16);
    }

    #[test]
    fn empty_project_has_empty_snapshot() {
        let temp = tempdir().expect("tempdir");
        let snapshot = snapshot_outputs(&paths(temp.path())).expect("snapshot");
        assert!(snapshot.files.is_empty());
    }
}
