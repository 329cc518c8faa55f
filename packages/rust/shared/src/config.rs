//! Exporter configuration.
//!
//! User config lives at `~/.arcexport/arcexport.toml`. Every field carries an
//! explicit default, so an empty or missing file yields a working exporter.
//! Values are validated as soon as a config is constructed from text.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ArcExportError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "arcexport.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".arcexport";

// ---------------------------------------------------------------------------
// Config structs (matching arcexport.toml schema)
// ---------------------------------------------------------------------------

/// Top-level exporter config, deserialized from TOML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExporterConfig {
    /// Suffix of the artifact the host writes.
    #[serde(default = "default_file_extension")]
    pub file_extension: String,

    /// MIME type of the artifact.
    #[serde(default = "default_output_mimetype")]
    pub output_mimetype: String,

    /// Label the host shows in its "download as" menu.
    #[serde(default = "default_export_from_notebook")]
    pub export_from_notebook: String,

    /// Template the host renders the transformed notebook with.
    #[serde(default = "default_template_file")]
    pub template_file: String,

    /// Raw-cell MIME types the template includes verbatim.
    #[serde(default = "default_raw_mimetypes")]
    pub raw_mimetypes: Vec<String>,

    /// Output priority for rich display data.
    #[serde(default = "default_display_data_priority")]
    pub display_data_priority: Vec<String>,

    /// Cell selection settings.
    #[serde(default)]
    pub filter: FilterConfig,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            file_extension: default_file_extension(),
            output_mimetype: default_output_mimetype(),
            export_from_notebook: default_export_from_notebook(),
            template_file: default_template_file(),
            raw_mimetypes: default_raw_mimetypes(),
            display_data_priority: default_display_data_priority(),
            filter: FilterConfig::default(),
        }
    }
}

fn default_file_extension() -> String {
    ".json".into()
}
fn default_output_mimetype() -> String {
    "application/json".into()
}
fn default_export_from_notebook() -> String {
    "Arc".into()
}
fn default_template_file() -> String {
    "arcexport".into()
}
fn default_raw_mimetypes() -> Vec<String> {
    vec!["application/json".into(), String::new()]
}
fn default_display_data_priority() -> Vec<String> {
    vec!["text/plain".into()]
}

/// `[filter]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Drop code cells whose source is empty or whitespace-only.
    #[serde(default = "default_true")]
    pub drop_empty_cells: bool,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            drop_empty_cells: true,
        }
    }
}

fn default_true() -> bool {
    true
}

impl ExporterConfig {
    /// Parse and validate a config from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| ArcExportError::config(format!("failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Check field values that serde alone cannot enforce.
    pub fn validate(&self) -> Result<()> {
        if !self.file_extension.starts_with('.') || self.file_extension.len() < 2 {
            return Err(ArcExportError::config(format!(
                "file_extension must look like `.ext`, got `{}`",
                self.file_extension
            )));
        }
        if self.output_mimetype.trim().is_empty() {
            return Err(ArcExportError::config("output_mimetype must not be empty"));
        }
        if self.template_file.trim().is_empty() {
            return Err(ArcExportError::config("template_file must not be empty"));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.arcexport/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| ArcExportError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.arcexport/arcexport.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the exporter config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<ExporterConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(ExporterConfig::default());
    }

    load_config_from(&path)
}

/// Load and validate the exporter config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<ExporterConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| ArcExportError::io(path, e))?;

    let config = ExporterConfig::from_toml_str(&content).map_err(|e| match e {
        ArcExportError::Config { message } => {
            ArcExportError::config(format!("{}: {message}", path.display()))
        }
        other => other,
    })?;
    tracing::debug!(?path, "loaded exporter config");
    Ok(config)
}
