use std::fmt;

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

use crate::config::{CategoryConfig, LimitsSection, ManifestSection, ToolConfig};
use crate::metadata::SnippetMetadata;

pub const MANIFEST_FILE_NAME: &str = "SKILL.md";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationProblem {
    TooLong { length: usize, limit: usize },
    Frontmatter { detail: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    pub subject: String,
    pub field: String,
    pub problem: ValidationProblem,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.problem {
            ValidationProblem::TooLong { length, limit } => write!(
                formatter,
                "{}: {} too long: {length} chars (max {limit})",
                self.subject, self.field
            ),
            ValidationProblem::Frontmatter { detail } => write!(
                formatter,
                "{}: {} does not survive frontmatter: {detail}",
                self.subject, self.field
            ),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Frontmatter {
    name: String,
    description: String,
}

/// One category's share of the umbrella summary.
#[derive(Debug, Clone, Copy)]
pub struct CategoryCount<'a> {
    pub category: &'a CategoryConfig,
    pub artifacts: usize,
}

pub fn render_frontmatter(name: &str, description: &str) -> String {
    format!("---\n{}---", frontmatter_body(name, description))
}

fn frontmatter_body(name: &str, description: &str) -> String {
    format!("name: {name}\ndescription: {description}\n")
}

/// Check every manifest header (each category plus the umbrella) before anything is
/// rendered or written.
pub fn validate_manifests(config: &ToolConfig) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    for category in &config.categories {
        validate_header(&category.skill, &category.description, config.limits, &mut issues);
    }
    validate_header(
        &config.umbrella.skill,
        &config.umbrella.description,
        config.limits,
        &mut issues,
    );
    issues
}

pub fn ensure_valid(config: &ToolConfig) -> Result<()> {
    let issues = validate_manifests(config);
    if issues.is_empty() {
        return Ok(());
    }
    let lines = issues
        .iter()
        .map(|issue| format!("  {issue}"))
        .collect::<Vec<_>>()
        .join("\n");
    bail!("manifest validation failed; nothing was written\n{lines}")
}

fn validate_header(
    name: &str,
    description: &str,
    limits: LimitsSection,
    issues: &mut Vec<ValidationIssue>,
) {
    let name_length = name.chars().count();
    if name_length > limits.name_max {
        issues.push(ValidationIssue {
            subject: name.to_string(),
            field: "name".to_string(),
            problem: ValidationProblem::TooLong {
                length: name_length,
                limit: limits.name_max,
            },
        });
    }
    let description_length = description.chars().count();
    if description_length > limits.description_max {
        issues.push(ValidationIssue {
            subject: name.to_string(),
            field: "description".to_string(),
            problem: ValidationProblem::TooLong {
                length: description_length,
                limit: limits.description_max,
            },
        });
    }

    match serde_yaml::from_str::<Frontmatter>(&frontmatter_body(name, description)) {
        Ok(parsed) => {
            if parsed.name != name {
                issues.push(frontmatter_issue(name, "name", format!("reads back as {:?}", parsed.name)));
            }
            if parsed.description != description {
                issues.push(frontmatter_issue(
                    name,
                    "description",
                    format!("reads back as {:?}", parsed.description),
                ));
            }
        }
        Err(error) => issues.push(frontmatter_issue(name, "frontmatter", error.to_string())),
    }
}

fn frontmatter_issue(subject: &str, field: &str, detail: String) -> ValidationIssue {
    ValidationIssue {
        subject: subject.to_string(),
        field: field.to_string(),
        problem: ValidationProblem::Frontmatter { detail },
    }
}

fn table_cell(value: &str) -> String {
    value.replace('|', "\\|")
}

pub fn render_category_manifest(
    category: &CategoryConfig,
    manifest: &ManifestSection,
    artifacts: &[SnippetMetadata],
) -> String {
    let scripts = &manifest.scripts_dir;
    let mut lines = vec![
        render_frontmatter(&category.skill, &category.description),
        String::new(),
        format!("# {}: {}", manifest.heading_prefix, category.name),
        String::new(),
        manifest.intro.clone(),
        String::new(),
        "## Available Snippets".to_string(),
        String::new(),
        "| Snippet | Description | File |".to_string(),
        "|---------|-------------|------|".to_string(),
    ];
    for meta in artifacts {
        lines.push(format!(
            "| {} | {} | {scripts}/{} |",
            table_cell(&meta.title),
            table_cell(&meta.short_description()),
            meta.file_name
        ));
    }
    lines.push(String::new());

    lines.push(format!("## {}", manifest.execution_heading));
    lines.push(String::new());
    lines.push("```".to_string());
    lines.extend(manifest.execution_steps.iter().cloned());
    lines.push("```".to_string());
    lines.push(String::new());

    for meta in artifacts {
        lines.push("---".to_string());
        lines.push(String::new());
        lines.push(format!("## {}", meta.title));
        lines.push(String::new());
        if let Some(description) = &meta.description {
            lines.push(description.clone());
            lines.push(String::new());
        }
        lines.push(format!("**Script:** `{scripts}/{}`", meta.file_name));
        lines.push(String::new());
        if let Some(thresholds) = &meta.thresholds {
            lines.push("**Thresholds:**".to_string());
            lines.push(String::new());
            lines.push(thresholds.clone());
            lines.push(String::new());
        }
    }

    lines.join("\n")
}

pub fn render_umbrella_manifest(config: &ToolConfig, counts: &[CategoryCount<'_>]) -> String {
    let umbrella = &config.umbrella;
    let total: usize = counts.iter().map(|count| count.artifacts).sum();

    let mut lines = vec![
        render_frontmatter(&umbrella.skill, &umbrella.description),
        String::new(),
        format!("# {}", umbrella.title),
        String::new(),
        umbrella.intro.replace("{total}", &total.to_string()),
        String::new(),
        "## Skills by Category".to_string(),
        String::new(),
        "| Skill | Snippets | Use when |".to_string(),
        "|-------|----------|----------|".to_string(),
    ];
    for count in counts {
        let use_when = count
            .category
            .description
            .split('.')
            .next()
            .unwrap_or_default();
        lines.push(format!(
            "| {} | {} | {} |",
            count.category.skill,
            count.artifacts,
            table_cell(use_when)
        ));
    }
    lines.push(String::new());

    if !umbrella.quick_reference.is_empty() {
        lines.push("## Quick Reference".to_string());
        lines.push(String::new());
        lines.push("| User says | Skill to use |".to_string());
        lines.push("|-----------|--------------|".to_string());
        for row in &umbrella.quick_reference {
            lines.push(format!("| {} | {} |", table_cell(&row.phrases), row.skill));
        }
        lines.push(String::new());
    }

    if !umbrella.workflow.is_empty() {
        lines.push("## Workflow".to_string());
        lines.push(String::new());
        lines.extend(umbrella.workflow.iter().cloned());
        lines.push(String::new());
    }

    lines.join("\n")
}
