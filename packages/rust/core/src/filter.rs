//! Cell selection: decides which notebook cells reach the transformer.

use arcexport_directive::{CellDirective, classify};
use arcexport_shared::{Cell, CellType, FilterConfig};
use tracing::debug;

/// Whether a single cell is eligible for transformation.
///
/// Only code cells qualify. Their left-trimmed source must either carry no
/// directive or start with `%arc`/`%sql`/`%sqlvalidate`. With
/// `drop_empty_cells`, whitespace-only code cells are rejected too.
pub fn is_eligible(cell: &Cell, config: &FilterConfig) -> bool {
    if cell.cell_type != CellType::Code {
        return false;
    }

    let trimmed = cell.source.trim_start();
    if config.drop_empty_cells && trimmed.is_empty() {
        return false;
    }

    match classify(trimmed) {
        CellDirective::Plain | CellDirective::Known(_) => true,
        CellDirective::Unknown(name) => {
            debug!(magic = %name, "skipping cell with unrecognized directive");
            false
        }
    }
}

/// The eligible cells, in their original order.
pub fn filter_cells<'a>(cells: &'a [Cell], config: &FilterConfig) -> Vec<&'a Cell> {
    let kept: Vec<&Cell> = cells.iter().filter(|c| is_eligible(c, config)).collect();
    debug!(
        total = cells.len(),
        kept = kept.len(),
        dropped = cells.len() - kept.len(),
        "filtered cells"
    );
    kept
}
