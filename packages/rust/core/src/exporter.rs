//! Host-facing exporter: runs host stages, then the Arc stage, and tags the
//! resources with the artifact's extension and MIME type.

use arcexport_shared::{
    ArcExportError, ExporterConfig, Notebook, Resources, Result, StageRecord,
};
use tracing::{info, instrument};

use crate::pipeline::ArcPreprocessor;
use crate::preprocess::{Preprocessor, PreprocessorChain};

/// Result of exporting one notebook.
#[derive(Debug, Clone, PartialEq)]
pub struct Export {
    /// Filtered, transformed notebook, ready for templating.
    pub notebook: Notebook,
    /// Resources after every stage.
    pub resources: Resources,
    /// Indices of the cells rewritten from `%sql`/`%sqlvalidate`.
    pub stage_cells: Vec<usize>,
}

impl Export {
    /// Decode the generated stage cells, in order.
    ///
    /// `%arc` cells are never included, even when their JSON looks like a
    /// stage.
    pub fn stages(&self) -> Result<Vec<StageRecord>> {
        self.stage_cells
            .iter()
            .map(|&index| {
                let cell = self.notebook.cells.get(index).ok_or_else(|| {
                    ArcExportError::parse(format!("stage cell {index} is out of range"))
                })?;
                StageRecord::from_json(&cell.source)
            })
            .collect()
    }
}

/// Converts notebooks into Arc job definitions.
pub struct ArcExporter {
    config: ExporterConfig,
    host_stages: PreprocessorChain,
    arc: ArcPreprocessor,
}

impl ArcExporter {
    /// Build an exporter, rejecting invalid configuration.
    pub fn new(config: ExporterConfig) -> Result<Self> {
        config.validate()?;
        let arc = ArcPreprocessor::new(config.filter.clone());
        Ok(Self {
            config,
            host_stages: PreprocessorChain::new(),
            arc,
        })
    }

    /// Add a host stage. Host stages run in insertion order, before the Arc
    /// stage, and the notebook is validated after each of them.
    pub fn with_preprocessor(mut self, stage: impl Preprocessor + 'static) -> Self {
        self.host_stages.push(stage);
        self
    }

    pub fn config(&self) -> &ExporterConfig {
        &self.config
    }

    pub fn file_extension(&self) -> &str {
        &self.config.file_extension
    }

    pub fn output_mimetype(&self) -> &str {
        &self.config.output_mimetype
    }

    /// Label for the host's "download as" menu.
    pub fn export_from_notebook(&self) -> &str {
        &self.config.export_from_notebook
    }

    /// Template the host renders the export with.
    pub fn template_file(&self) -> &str {
        &self.config.template_file
    }

    pub fn raw_mimetypes(&self) -> &[String] {
        &self.config.raw_mimetypes
    }

    pub fn display_data_priority(&self) -> &[String] {
        &self.config.display_data_priority
    }

    /// Export a notebook. The caller's notebook and resources are untouched.
    #[instrument(
        skip_all,
        fields(cells = notebook.cells.len(), host_stages = self.host_stages.len())
    )]
    pub fn from_notebook(&self, notebook: &Notebook, resources: &Resources) -> Result<Export> {
        let (notebook, resources) = self.host_stages.run(notebook.clone(), resources.clone())?;
        let conversion = self.arc.convert(&notebook, &resources)?;
        let (notebook, mut resources) = (conversion.notebook, conversion.resources);

        resources.insert("output_extension", self.config.file_extension.clone());
        resources.insert("output_mimetype", self.config.output_mimetype.clone());

        info!(
            cells = notebook.cells.len(),
            extension = %self.config.file_extension,
            "exported notebook"
        );

        Ok(Export {
            notebook,
            resources,
            stage_cells: conversion.stage_cells,
        })
    }

    /// Parse notebook JSON and export it with empty resources.
    pub fn from_json(&self, notebook_json: &str) -> Result<Export> {
        let notebook = Notebook::from_json(notebook_json)?;
        self.from_notebook(&notebook, &Resources::new())
    }
}

impl Default for ArcExporter {
    fn default() -> Self {
        let config = ExporterConfig::default();
        Self {
            arc: ArcPreprocessor::new(config.filter.clone()),
            config,
            host_stages: PreprocessorChain::new(),
        }
    }
}
