//! The Arc conversion stage: language resource, cell filter, cell transform.

use arcexport_shared::{FilterConfig, Notebook, Resources, Result};
use tracing::{debug, instrument};

use crate::filter::filter_cells;
use crate::preprocess::Preprocessor;
use crate::transform::transform_cell_with_stage;

/// A converted notebook plus the positions of its generated stage cells.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversion {
    pub notebook: Notebook,
    pub resources: Resources,
    /// Output cell indices that were rewritten from `%sql`/`%sqlvalidate`.
    pub stage_cells: Vec<usize>,
}

/// Convert a notebook into its Arc form.
///
/// Neither input is modified; the returned pair is built fresh:
/// 1. `resources["language"]` is set to the lower-cased metadata language, if any
/// 2. ineligible cells are dropped, keeping order
/// 3. every remaining cell is transformed
///
/// Any malformed directive fails the whole conversion.
pub fn convert(
    notebook: &Notebook,
    resources: &Resources,
    filter: &FilterConfig,
) -> Result<(Notebook, Resources)> {
    let conversion = convert_with_stages(notebook, resources, filter)?;
    Ok((conversion.notebook, conversion.resources))
}

/// [`convert`], also recording which output cells hold stage records.
#[instrument(skip_all, fields(cells = notebook.cells.len()))]
pub fn convert_with_stages(
    notebook: &Notebook,
    resources: &Resources,
    filter: &FilterConfig,
) -> Result<Conversion> {
    let mut resources = resources.clone();
    if let Some(language) = notebook.language() {
        resources.insert("language", language.to_lowercase());
    }

    let eligible = filter_cells(&notebook.cells, filter);
    let mut cells = Vec::with_capacity(eligible.len());
    let mut stage_cells = Vec::new();
    for cell in eligible {
        let (cell, stage) = transform_cell_with_stage(cell)?;
        if stage.is_some() {
            stage_cells.push(cells.len());
        }
        cells.push(cell);
    }

    debug!(
        output_cells = cells.len(),
        stages = stage_cells.len(),
        "converted notebook"
    );

    let converted = Notebook {
        cells,
        metadata: notebook.metadata.clone(),
        nbformat: notebook.nbformat,
        nbformat_minor: notebook.nbformat_minor,
        extra: notebook.extra.clone(),
    };

    Ok(Conversion {
        notebook: converted,
        resources,
        stage_cells,
    })
}

/// [`convert`] packaged as a chain stage.
#[derive(Debug, Clone, Default)]
pub struct ArcPreprocessor {
    filter: FilterConfig,
}

impl ArcPreprocessor {
    pub fn new(filter: FilterConfig) -> Self {
        Self { filter }
    }

    /// Run the conversion, keeping track of the generated stage cells.
    pub fn convert(&self, notebook: &Notebook, resources: &Resources) -> Result<Conversion> {
        convert_with_stages(notebook, resources, &self.filter)
    }
}

impl Preprocessor for ArcPreprocessor {
    fn name(&self) -> &str {
        "arc"
    }

    fn preprocess(
        &self,
        notebook: Notebook,
        resources: Resources,
    ) -> Result<(Notebook, Resources)> {
        convert(&notebook, &resources, &self.filter)
    }
}

#[cfg(test)]
mod tests {
    use arcexport_shared::{ArcExportError, Cell, CellType};
    use serde_json::{Value, json};

    use super::*;

    fn sample() -> Notebook {
        let mut nb = Notebook::new(vec![
            Cell::markdown("# Job"),
            Cell::code("%arc\n{\"type\": \"DelimitedExtract\"}"),
            Cell::code("%sql name=t1 outputView=v1 persist=true\nSELECT 1\nFROM x"),
            Cell::code("%foo\nignored"),
            Cell::code("   "),
            Cell::code("%sqlvalidate name=chk environments=dev,prod\nSELECT 1"),
            Cell::raw("raw"),
            Cell::code("  print(1)"),
        ]);
        nb.metadata.insert("language".into(), json!("Python"));
        nb
    }

    #[test]
    fn converts_full_notebook() {
        let mut resources = Resources::new();
        resources.insert("unique_key", "job");

        let (nb, res) = convert(&sample(), &resources, &FilterConfig::default()).expect("convert");

        assert_eq!(res.get_str("language"), Some("python"));
        assert_eq!(res.get_str("unique_key"), Some("job"));

        assert_eq!(nb.cells.len(), 4);
        assert!(nb.cells.iter().all(|c| c.cell_type == CellType::Code));
        assert_eq!(nb.cells[0].source, "{\"type\": \"DelimitedExtract\"}");

        let transform: Value = serde_json::from_str(&nb.cells[1].source).expect("json");
        assert_eq!(transform["type"], "SQLTransform");
        assert_eq!(transform["sql"], "SELECT 1 FROM x");

        let validate: Value = serde_json::from_str(&nb.cells[2].source).expect("json");
        assert_eq!(validate["type"], "SQLValidate");
        assert_eq!(validate["environments"], json!(["dev", "prod"]));

        assert_eq!(nb.cells[3].source, "print(1)");
        assert_eq!(nb.metadata, sample().metadata);
    }

    #[test]
    fn inputs_are_not_mutated() {
        let original = sample();
        let resources = Resources::new();
        let _ = convert(&original, &resources, &FilterConfig::default()).expect("convert");
        assert_eq!(original, sample());
        assert!(resources.is_empty());
    }

    #[test]
    fn missing_language_leaves_resources_alone() {
        let nb = Notebook::new(vec![Cell::code("x")]);
        let (_, res) = convert(&nb, &Resources::new(), &FilterConfig::default()).expect("convert");
        assert!(!res.contains_key("language"));
    }

    #[test]
    fn permissive_filter_keeps_blank_cells() {
        let filter = FilterConfig {
            drop_empty_cells: false,
        };
        let (nb, _) = convert(&sample(), &Resources::new(), &filter).expect("convert");
        assert_eq!(nb.cells.len(), 5);
        assert_eq!(nb.cells[2].source, "");
    }

    #[test]
    fn malformed_directive_aborts_everything() {
        let mut nb = sample();
        nb.cells.push(Cell::code("%sql badtoken\nSELECT 1"));
        let err = convert(&nb, &Resources::new(), &FilterConfig::default()).unwrap_err();
        assert!(matches!(err, ArcExportError::MalformedDirective { .. }));
    }

    #[test]
    fn stage_cells_point_at_generated_stages() {
        let conversion =
            convert_with_stages(&sample(), &Resources::new(), &FilterConfig::default())
                .expect("convert");
        assert_eq!(conversion.stage_cells, vec![1, 2]);
        for index in conversion.stage_cells {
            let value: Value =
                serde_json::from_str(&conversion.notebook.cells[index].source).expect("json");
            assert!(value["type"].as_str().is_some_and(|t| t.starts_with("SQL")));
        }
    }

    #[test]
    fn preprocessor_matches_convert() {
        let stage = ArcPreprocessor::default();
        assert_eq!(stage.name(), "arc");
        let via_stage = stage.preprocess(sample(), Resources::new()).expect("stage");
        let direct =
            convert(&sample(), &Resources::new(), &FilterConfig::default()).expect("convert");
        assert_eq!(via_stage, direct);
    }
}
