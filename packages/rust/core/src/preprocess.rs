//! Ordered preprocessor stages with a structural check after each one.
//!
//! Every stage receives the notebook and resources by value and hands back
//! the same pair, so stages compose without sharing mutable state.

use std::collections::HashSet;

use arcexport_shared::{
    ArcExportError, Cell, CellType, Notebook, Resources, Result, SUPPORTED_NBFORMAT,
};
use serde_json::Value;
use tracing::{debug, error, instrument};

/// A single notebook transform stage.
pub trait Preprocessor: Send + Sync {
    /// Stage name used in logs and validation errors.
    fn name(&self) -> &str;

    /// Transform the whole notebook. The default applies
    /// [`preprocess_cell`](Self::preprocess_cell) to every cell in order.
    fn preprocess(
        &self,
        mut notebook: Notebook,
        mut resources: Resources,
    ) -> Result<(Notebook, Resources)> {
        let cells = std::mem::take(&mut notebook.cells);
        let mut out = Vec::with_capacity(cells.len());
        for (index, cell) in cells.into_iter().enumerate() {
            out.push(self.preprocess_cell(cell, &mut resources, index)?);
        }
        notebook.cells = out;
        Ok((notebook, resources))
    }

    /// Transform one cell. The default returns it unchanged.
    fn preprocess_cell(
        &self,
        cell: Cell,
        _resources: &mut Resources,
        _index: usize,
    ) -> Result<Cell> {
        Ok(cell)
    }
}

/// Stages applied in insertion order.
#[derive(Default)]
pub struct PreprocessorChain {
    stages: Vec<Box<dyn Preprocessor>>,
}

impl PreprocessorChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a stage to the end of the chain.
    pub fn push(&mut self, stage: impl Preprocessor + 'static) {
        self.stages.push(Box::new(stage));
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Stage names in execution order.
    pub fn names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Run every stage, validating the notebook after each.
    #[instrument(skip_all, fields(stages = self.stages.len()))]
    pub fn run(&self, notebook: Notebook, resources: Resources) -> Result<(Notebook, Resources)> {
        let mut notebook = notebook;
        let mut resources = resources;

        for stage in &self.stages {
            (notebook, resources) = stage.preprocess(notebook, resources)?;

            if let Err(e) = validate_notebook(&notebook) {
                error!(
                    preprocessor = stage.name(),
                    error = %e,
                    "notebook is invalid after preprocessor"
                );
                return Err(ArcExportError::validation(format!(
                    "notebook is invalid after preprocessor `{}`: {e}",
                    stage.name()
                )));
            }
            debug!(
                preprocessor = stage.name(),
                cells = notebook.cells.len(),
                "stage complete"
            );
        }

        Ok((notebook, resources))
    }
}

/// Structural checks a notebook must pass between stages.
///
/// Unknown extra fields are allowed. Checked:
/// - `nbformat`, when present, is the supported major version
/// - cell `id`s, when present, are non-empty strings and unique
/// - code cell `outputs`, when present, is an array
pub fn validate_notebook(notebook: &Notebook) -> Result<()> {
    if let Some(version) = notebook.nbformat {
        if version != SUPPORTED_NBFORMAT {
            return Err(ArcExportError::validation(format!(
                "nbformat {version} not supported (expected {SUPPORTED_NBFORMAT})"
            )));
        }
    }

    let mut seen_ids = HashSet::new();
    for (index, cell) in notebook.cells.iter().enumerate() {
        match cell.extra.get("id") {
            None => {}
            Some(Value::String(id)) if !id.is_empty() => {
                if !seen_ids.insert(id.as_str()) {
                    return Err(ArcExportError::validation(format!(
                        "cell {index}: duplicate cell id `{id}`"
                    )));
                }
            }
            Some(other) => {
                return Err(ArcExportError::validation(format!(
                    "cell {index}: id must be a non-empty string, got {other}"
                )));
            }
        }

        if cell.cell_type == CellType::Code {
            if let Some(outputs) = cell.extra.get("outputs") {
                if !outputs.is_array() {
                    return Err(ArcExportError::validation(format!(
                        "cell {index}: outputs must be an array"
                    )));
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    /// Uppercases every cell and counts them in resources.
    struct Shout;

    impl Preprocessor for Shout {
        fn name(&self) -> &str {
            "shout"
        }

        fn preprocess_cell(
            &self,
            cell: Cell,
            resources: &mut Resources,
            index: usize,
        ) -> Result<Cell> {
            resources.insert("shouted", index as u64 + 1);
            Ok(cell.with_source(cell.source.to_uppercase()))
        }
    }

    /// Gives every cell the same id, which fails validation.
    struct DuplicateIds;

    impl Preprocessor for DuplicateIds {
        fn name(&self) -> &str {
            "duplicate-ids"
        }

        fn preprocess_cell(
            &self,
            mut cell: Cell,
            _resources: &mut Resources,
            _index: usize,
        ) -> Result<Cell> {
            cell.extra.insert("id".into(), json!("same"));
            Ok(cell)
        }
    }

    struct Failing;

    impl Preprocessor for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        fn preprocess(
            &self,
            _notebook: Notebook,
            _resources: Resources,
        ) -> Result<(Notebook, Resources)> {
            Err(ArcExportError::malformed("%sql x", "boom"))
        }
    }

    fn notebook() -> Notebook {
        Notebook::new(vec![Cell::code("a"), Cell::markdown("b")])
    }

    #[test]
    fn empty_chain_is_identity() {
        let chain = PreprocessorChain::new();
        assert!(chain.is_empty());
        let (nb, res) = chain.run(notebook(), Resources::new()).expect("run");
        assert_eq!(nb, notebook());
        assert!(res.is_empty());
    }

    #[test]
    fn stages_run_in_order_per_cell() {
        let mut chain = PreprocessorChain::new();
        chain.push(Shout);
        assert_eq!(chain.names(), vec!["shout"]);

        let (nb, res) = chain.run(notebook(), Resources::new()).expect("run");
        let sources: Vec<&str> = nb.cells.iter().map(|c| c.source.as_str()).collect();
        assert_eq!(sources, vec!["A", "B"]);
        assert_eq!(res.get("shouted"), Some(&json!(2)));
    }

    #[test]
    fn invalid_output_names_the_stage() {
        let mut chain = PreprocessorChain::new();
        chain.push(Shout);
        chain.push(DuplicateIds);
        assert_eq!(chain.len(), 2);

        let err = chain.run(notebook(), Resources::new()).unwrap_err();
        assert!(matches!(err, ArcExportError::Validation { .. }));
        assert!(err.to_string().contains("duplicate-ids"));
    }

    #[test]
    fn stage_errors_propagate_unchanged() {
        let mut chain = PreprocessorChain::new();
        chain.push(Failing);
        let err = chain.run(notebook(), Resources::new()).unwrap_err();
        assert!(matches!(err, ArcExportError::MalformedDirective { .. }));
    }

    #[test]
    fn validation_rules() {
        assert!(validate_notebook(&notebook()).is_ok());

        let mut nb = notebook();
        nb.nbformat = Some(3);
        assert!(validate_notebook(&nb).is_err());

        let mut nb = notebook();
        nb.cells[0].extra.insert("outputs".into(), json!({}));
        assert!(validate_notebook(&nb).is_err());

        let mut nb = notebook();
        nb.cells[0].extra.insert("id".into(), json!(7));
        assert!(validate_notebook(&nb).is_err());

        let mut nb = notebook();
        nb.cells[0].extra.insert("id".into(), json!("one"));
        nb.cells[1].extra.insert("id".into(), json!("two"));
        nb.cells[1].extra.insert("outputs".into(), json!("markdown cells are not checked"));
        assert!(validate_notebook(&nb).is_ok());
    }
}
