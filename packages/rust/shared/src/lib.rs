//! Shared types, error model, and configuration for the Arc exporter.
//!
//! This crate is the foundation depended on by the other exporter crates.
//! It provides:
//! - [`ArcExportError`], the unified error type
//! - Domain types ([`Notebook`], [`Cell`], [`Resources`], [`StageRecord`])
//! - Configuration ([`ExporterConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    ExporterConfig, FilterConfig, config_dir, config_file_path, load_config, load_config_from,
};
pub use error::{ArcExportError, Result};
pub use types::{
    Cell, CellType, Notebook, Resources, SUPPORTED_NBFORMAT, SqlTransformStage, SqlValidateStage,
    StageRecord,
};
