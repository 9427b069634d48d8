use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use toml::Value;

const EMBEDDED_DEFAULT_CONFIG: &str = include_str!("../../../config/default-config.toml");

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct ToolConfig {
    pub paths: PathsSection,
    pub dialect: DialectSection,
    pub limits: LimitsSection,
    pub manifest: ManifestSection,
    pub umbrella: UmbrellaSection,
    #[serde(default)]
    pub categories: Vec<CategoryConfig>,
    pub install: InstallSection,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct PathsSection {
    pub pages_dir: String,
    pub snippets_dir: String,
    pub skills_dir: String,
}

/// The fixed document dialect: marker lines and tokens the pipeline recognizes.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct DialectSection {
    pub extraction_heading: String,
    pub fence_open: String,
    pub fence_close: String,
    pub document_extension: String,
    pub artifact_extension: String,
    pub binding_prefix: String,
    pub component_name: String,
    pub component_import: String,
    pub import_suffix: String,
    pub rating_marker: String,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
pub struct LimitsSection {
    pub name_max: usize,
    pub description_max: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct ManifestSection {
    pub heading_prefix: String,
    pub scripts_dir: String,
    pub intro: String,
    pub execution_heading: String,
    #[serde(default)]
    pub execution_steps: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct UmbrellaSection {
    pub skill: String,
    pub title: String,
    pub description: String,
    pub intro: String,
    #[serde(default)]
    pub workflow: Vec<String>,
    #[serde(default)]
    pub quick_reference: Vec<QuickReference>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct QuickReference {
    pub phrases: String,
    pub skill: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct CategoryConfig {
    pub id: String,
    pub skill: String,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct InstallSection {
    pub target_dir: String,
    pub settings_path: String,
}

impl ToolConfig {
    pub fn category(&self, id: &str) -> Option<&CategoryConfig> {
        self.categories.iter().find(|category| category.id == id)
    }
}

pub fn embedded_default_config() -> &'static str {
    EMBEDDED_DEFAULT_CONFIG
}

pub fn default_config() -> Result<ToolConfig> {
    toml::from_str(EMBEDDED_DEFAULT_CONFIG).context("failed to parse embedded default config")
}

/// Load the project config layered over the embedded defaults. Returns the defaults
/// unchanged when the file doesn't exist.
pub fn load_config(config_path: &Path) -> Result<ToolConfig> {
    if !config_path.exists() {
        return default_config();
    }
    let content = fs::read_to_string(config_path)
        .with_context(|| format!("failed to read {}", config_path.display()))?;
    parse_layered_config(&content)
        .with_context(|| format!("failed to parse {}", config_path.display()))
}

pub fn parse_layered_config(content: &str) -> Result<ToolConfig> {
    let mut root = toml::from_str::<Value>(EMBEDDED_DEFAULT_CONFIG)
        .context("failed to parse embedded default config")?;
    let overlay = toml::from_str::<Value>(content)?;
    merge_values(&mut root, overlay);
    let config = ToolConfig::deserialize(root)?;
    Ok(config)
}

/// Tables merge key by key; arrays and scalars in `overlay` replace the base value.
fn merge_values(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Table(base_table), Value::Table(overlay_table)) => {
            for (key, value) in overlay_table {
                match base_table.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base_table.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}
