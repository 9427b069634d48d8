use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use serde::Serialize;

use crate::blocks::extract_blocks;
use crate::config::ToolConfig;
use crate::filesystem::{
    SourceDocument, read_text_file, scan_documents, validate_scoped_path, write_text_file,
};
use crate::rewrite::{
    PlannedArtifact, imported_artifact_names, is_already_extracted, plan_artifacts,
    rewrite_document,
};
use crate::runtime::ResolvedPaths;

#[derive(Debug, Clone, Copy, Default)]
pub struct ExtractOptions {
    pub dry_run: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtractReport {
    pub dry_run: bool,
    pub scanned: usize,
    pub created: Vec<String>,
    pub updated: Vec<String>,
    pub skipped: Vec<String>,
    pub warnings: Vec<String>,
}

struct DocumentPlan {
    document: SourceDocument,
    artifacts: Vec<(PathBuf, PlannedArtifact)>,
    rewritten: String,
}

/// An artifact an already extracted page imports; later pages may not claim its name.
struct ReservedArtifact {
    path: PathBuf,
    owner: String,
}

/// Pass 1: move every eligible block into its own artifact file and rewrite the page to
/// import it.
///
/// All pages are read and planned before the first write, so an unreadable page or an
/// artifact name claimed by two pages stops the run with the tree untouched. Pages that
/// were extracted by an earlier run keep their artifact names reserved.
pub fn run_extract(
    paths: &ResolvedPaths,
    config: &ToolConfig,
    options: &ExtractOptions,
) -> Result<ExtractReport> {
    let dialect = &config.dialect;
    let documents = scan_documents(paths, dialect)?;

    let mut report = ExtractReport {
        dry_run: options.dry_run,
        scanned: documents.len(),
        created: Vec::new(),
        updated: Vec::new(),
        skipped: Vec::new(),
        warnings: Vec::new(),
    };

    let mut plans = Vec::new();
    let mut reserved = Vec::new();
    for document in documents {
        let text = read_text_file(&document.path)?;
        let blocks = extract_blocks(&text, dialect);

        if is_already_extracted(&text, dialect) {
            if !blocks.is_empty() {
                report.warnings.push(format!(
                    "{} already imports {} but still has {} eligible block(s); left untouched",
                    document.relative_path,
                    dialect.component_name,
                    blocks.len()
                ));
            }
            let artifact_dir = paths.snippets_dir.join(&document.category);
            reserved.extend(
                imported_artifact_names(&text, dialect, &config.paths.snippets_dir)
                    .into_iter()
                    .map(|name| ReservedArtifact {
                        path: artifact_dir.join(name),
                        owner: document.relative_path.clone(),
                    }),
            );
            report.skipped.push(document.relative_path.clone());
            continue;
        }
        if blocks.is_empty() {
            continue;
        }

        let artifacts = plan_artifacts(&document.base_name, &blocks, dialect);
        let rewritten = rewrite_document(
            &text,
            &document,
            &blocks,
            &artifacts,
            dialect,
            &config.paths.snippets_dir,
        )?;
        let artifact_dir = paths.snippets_dir.join(&document.category);
        let artifacts = artifacts
            .into_iter()
            .map(|artifact| (artifact_dir.join(&artifact.file_name), artifact))
            .collect();
        plans.push(DocumentPlan {
            document,
            artifacts,
            rewritten,
        });
    }

    check_artifact_collisions(paths, &reserved, &plans)?;

    for plan in &plans {
        for (path, _) in &plan.artifacts {
            validate_scoped_path(paths, path)?;
            report.created.push(paths.display_relative(path));
        }
        validate_scoped_path(paths, &plan.document.path)?;
        report.updated.push(paths.display_relative(&plan.document.path));
    }

    if options.dry_run {
        return Ok(report);
    }

    for plan in &plans {
        for (path, artifact) in &plan.artifacts {
            write_text_file(path, &artifact.content())?;
        }
        write_text_file(&plan.document.path, &plan.rewritten)?;
    }

    Ok(report)
}

fn check_artifact_collisions(
    paths: &ResolvedPaths,
    reserved: &[ReservedArtifact],
    plans: &[DocumentPlan],
) -> Result<()> {
    let mut owners: BTreeMap<&Path, &str> = BTreeMap::new();
    for artifact in reserved {
        owners
            .entry(artifact.path.as_path())
            .or_insert(artifact.owner.as_str());
    }
    let mut conflicts = Vec::new();
    for plan in plans {
        for (path, _) in &plan.artifacts {
            let Some(owner) = owners.insert(path.as_path(), &plan.document.relative_path) else {
                continue;
            };
            if owner != plan.document.relative_path {
                conflicts.push(format!(
                    "  - {} claimed by {} and {}",
                    paths.display_relative(path),
                    owner,
                    plan.document.relative_path
                ));
            }
        }
    }
    if conflicts.is_empty() {
        return Ok(());
    }
    bail!(
        "artifact name collision; nothing was written\n{}\nrename one of the pages or its section headings",
        conflicts.join("\n")
    )
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use tempfile::tempdir;

    use super::{ExtractOptions, run_extract};
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

    const TTFB: &str = "# TTFB\n\nTime to first byte.\n\n## Overview\n\n### Snippet\n\n```js copy\nmain()\n```\n\n## Measure TTFB sub-parts\n\n### Snippet\n\n```js copy\nparts()\n```\n\n## Resources\n\n### Snippet\n\n```js copy\nresources()\n```\n";

    #[test]
    fn extract_writes_artifacts_and_rewrites_document() {
        let temp = tempdir().expect("tempdir");
        let paths = paths(temp.path());
        let config = default_config().expect("config");
        let page = paths.pages_dir.join("Loading").join("TTFB.mdx");
        write_text_file(&page, TTFB).expect("write page");

        let report = run_extract(&paths, &config, &ExtractOptions::default()).expect("extract");
        assert_eq!(report.scanned, 1);
        assert_eq!(
            report.created,
            vec![
                "snippets/Loading/TTFB.js",
                "snippets/Loading/TTFB-Sub-Parts.js",
                "snippets/Loading/TTFB-Resources.js",
            ]
        );
        assert_eq!(report.updated, vec!["pages/Loading/TTFB.mdx"]);

        let loading = paths.snippets_dir.join("Loading");
        assert_eq!(
            fs::read_to_string(loading.join("TTFB-Sub-Parts.js")).expect("read artifact"),
            "parts()\n"
        );

        let rewritten = fs::read_to_string(&page).expect("read page");
        assert_eq!(rewritten.matches("<Snippet code={").count(), 3);
        assert_eq!(
            rewritten
                .lines()
                .filter(|line| line.starts_with("import "))
                .count(),
            4
        );
        assert!(!rewritten.contains("```js copy"));
    }

    #[test]
    fn second_run_extracts_nothing() {
        let temp = tempdir().expect("tempdir");
        let paths = paths(temp.path());
        let config = default_config().expect("config");
        let page = paths.pages_dir.join("Loading").join("TTFB.mdx");
        write_text_file(&page, TTFB).expect("write page");

        run_extract(&paths, &config, &ExtractOptions::default()).expect("first run");
        let after_first = fs::read_to_string(&page).expect("read page");

        let report = run_extract(&paths, &config, &ExtractOptions::default()).expect("second run");
        assert!(report.created.is_empty());
        assert!(report.updated.is_empty());
        assert_eq!(report.skipped, vec!["Loading/TTFB.mdx"]);
        assert!(report.warnings.is_empty());
        assert_eq!(fs::read_to_string(&page).expect("read page"), after_first);
    }

    #[test]
    fn partially_rewritten_page_is_reported_not_touched() {
        let temp = tempdir().expect("tempdir");
        let paths = paths(temp.path());
        let config = default_config().expect("config");
        let page = paths.pages_dir.join("Media").join("Images.mdx");
        let content = "import { Snippet } from '../../components/Snippet'\n\n### Snippet\n\n```js copy\nleft()\n```\n";
        write_text_file(&page, content).expect("write page");

        let report = run_extract(&paths, &config, &ExtractOptions::default()).expect("extract");
        assert!(report.created.is_empty());
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("Media/Images.mdx"));
        assert_eq!(fs::read_to_string(&page).expect("read page"), content);
    }

    #[test]
    fn dry_run_reports_without_writing() {
        let temp = tempdir().expect("tempdir");
        let paths = paths(temp.path());
        let config = default_config().expect("config");
        let page = paths.pages_dir.join("Loading").join("TTFB.mdx");
        write_text_file(&page, TTFB).expect("write page");

        let report =
            run_extract(&paths, &config, &ExtractOptions { dry_run: true }).expect("dry run");
        assert_eq!(report.created.len(), 3);
        assert!(!paths.snippets_dir.exists());
        assert_eq!(fs::read_to_string(&page).expect("read page"), TTFB);
    }

    #[test]
    fn pages_without_blocks_are_left_alone() {
        let temp = tempdir().expect("tempdir");
        let paths = paths(temp.path());
        let config = default_config().expect("config");
        let page = paths.pages_dir.join("index.mdx");
        write_text_file(&page, "# Home\n\nWelcome.\n").expect("write page");

        let report = run_extract(&paths, &config, &ExtractOptions::default()).expect("extract");
        assert_eq!(report.scanned, 1);
        assert!(report.updated.is_empty());
        assert!(report.skipped.is_empty());
        assert!(!paths.snippets_dir.exists());
    }

    #[test]
    fn cross_page_collision_aborts_before_writing() {
        let temp = tempdir().expect("tempdir");
        let paths = paths(temp.path());
        let config = default_config().expect("config");
        let first = paths.pages_dir.join("Loading").join("TTFB.mdx");
        let second = paths.pages_dir.join("Loading").join("TTFB-Sub-Parts.mdx");
        write_text_file(&first, TTFB).expect("write first");
        write_text_file(&second, "### Snippet\n\n```js copy\nother()\n```\n")
            .expect("write second");

        let error = run_extract(&paths, &config, &ExtractOptions::default())
            .expect_err("collision must fail");
        let message = error.to_string();
        assert!(message.contains("snippets/Loading/TTFB-Sub-Parts.js"));
        assert!(message.contains("Loading/TTFB.mdx"));
        assert!(message.contains("Loading/TTFB-Sub-Parts.mdx"));
        assert!(!paths.snippets_dir.exists());
        assert_eq!(fs::read_to_string(&first).expect("read first"), TTFB);
    }

    #[test]
    fn extracted_pages_keep_their_artifact_names() {
        let temp = tempdir().expect("tempdir");
        let paths = paths(temp.path());
        let config = default_config().expect("config");
        let first = paths.pages_dir.join("Loading").join("TTFB.mdx");
        write_text_file(&first, TTFB).expect("write first");
        run_extract(&paths, &config, &ExtractOptions::default()).expect("first run");
        let extracted = fs::read_to_string(&first).expect("read first");

        let second = paths.pages_dir.join("Loading").join("TTFB-Sub-Parts.mdx");
        let content = "### Snippet\n\n```js copy\nother()\n```\n";
        write_text_file(&second, content).expect("write second");

        let error = run_extract(&paths, &config, &ExtractOptions::default())
            .expect_err("reserved name must fail");
        let message = error.to_string();
        assert!(message.contains("snippets/Loading/TTFB-Sub-Parts.js"));
        assert!(message.contains("Loading/TTFB.mdx"));
        assert!(message.contains("Loading/TTFB-Sub-Parts.mdx"));
        assert_eq!(
            fs::read_to_string(paths.snippets_dir.join("Loading").join("TTFB-Sub-Parts.js"))
                .expect("read artifact"),
            "parts()\n"
        );
        assert_eq!(fs::read_to_string(&first).expect("read first"), extracted);
        assert_eq!(fs::read_to_string(&second).expect("read second"), content);
    }

    #[test]
    fn unreadable_page_aborts_the_batch() {
        let temp = tempdir().expect("tempdir");
        let paths = paths(temp.path());
        let config = default_config().expect("config");
        let valid = paths.pages_dir.join("Loading").join("A.mdx");
        write_text_file(&valid, TTFB).expect("write valid");
        let broken = paths.pages_dir.join("Loading").join("Z.mdx");
        fs::write(&broken, [0xff, 0xfe, b'#', b'\n', 0xc3]).expect("write broken");

        run_extract(&paths, &config, &ExtractOptions::default())
            .expect_err("unreadable page must fail");
        assert!(!paths.snippets_dir.exists());
        assert_eq!(fs::read(&valid).expect("read valid"), TTFB.as_bytes());
    }
}
