//! Notebook-to-Arc conversion for the exporter.
//!
//! This crate selects the code cells worth exporting, rewrites `%arc`,
//! `%sql` and `%sqlvalidate` cells, and wraps the result in a preprocessor
//! chain the host can extend (see [`exporter::ArcExporter`]).

pub mod exporter;
pub mod filter;
pub mod pipeline;
pub mod preprocess;
pub mod transform;

pub use exporter::{ArcExporter, Export};
pub use pipeline::{ArcPreprocessor, Conversion, convert, convert_with_stages};
pub use preprocess::{Preprocessor, PreprocessorChain, validate_notebook};
