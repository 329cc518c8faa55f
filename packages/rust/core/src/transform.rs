//! Rewrites an eligible cell according to the directive on its first line.
//!
//! - `%arc`: the directive line is removed, the rest is kept verbatim.
//! - `%sql` / `%sqlvalidate`: the cell becomes an indented JSON stage record.
//! - Anything else: the source is only left-trimmed.

use arcexport_directive::{CellDirective, Directive, DirectiveKind, classify, parse_directive};
use arcexport_shared::{
    ArcExportError, Cell, Result, SqlTransformStage, SqlValidateStage, StageRecord,
};
use tracing::debug;

/// Produce the transformed copy of `cell`. The input is never modified.
pub fn transform_cell(cell: &Cell) -> Result<Cell> {
    transform_cell_with_stage(cell).map(|(cell, _)| cell)
}

/// Like [`transform_cell`], also returning the stage record when the cell
/// was a `%sql`/`%sqlvalidate` directive.
pub fn transform_cell_with_stage(cell: &Cell) -> Result<(Cell, Option<StageRecord>)> {
    let trimmed = cell.source.trim_start();

    match classify(trimmed) {
        CellDirective::Known(DirectiveKind::Arc) => {
            debug!("stripping %arc directive");
            let (_, body) = split_first_line(trimmed);
            Ok((cell.with_source(body), None))
        }
        CellDirective::Known(kind) => {
            let (line, body) = split_first_line(trimmed);
            let directive = parse_directive(kind, line)?;
            let stage = build_stage(&directive, body)?;
            debug!(kind = stage.kind(), name = stage.name(), "built stage record");
            Ok((cell.with_source(stage.to_json_pretty()?), Some(stage)))
        }
        CellDirective::Plain | CellDirective::Unknown(_) => {
            Ok((cell.with_source(trimmed), None))
        }
    }
}

/// Build the stage record for a parsed `%sql`/`%sqlvalidate` directive.
///
/// `body` is everything after the directive line.
pub fn build_stage(directive: &Directive, body: &str) -> Result<StageRecord> {
    let name = directive.get_or_empty("name");
    let description = directive.get_or_empty("description");
    let environments = directive.list("environments");
    let sql = join_sql(body);

    match directive.kind {
        DirectiveKind::Sql => Ok(StageRecord::SqlTransform(SqlTransformStage {
            name,
            description,
            environments,
            sql,
            output_view: directive.get_or_empty("outputView"),
            persist: directive.flag("persist"),
            sql_params: directive.pairs("sqlParams")?,
        })),
        DirectiveKind::SqlValidate => Ok(StageRecord::SqlValidate(SqlValidateStage {
            name,
            description,
            environments,
            sql,
            sql_params: directive.pairs("sqlParams")?,
        })),
        DirectiveKind::Arc => Err(ArcExportError::malformed(
            &directive.line,
            "%arc does not describe a stage",
        )),
    }
}

/// Collapse the statement body onto one line: every line trimmed, joined by
/// single spaces.
pub fn join_sql(body: &str) -> String {
    body.split('\n').map(str::trim).collect::<Vec<_>>().join(" ")
}

/// Split off the first line. The remainder is empty when there is no newline.
fn split_first_line(source: &str) -> (&str, &str) {
    source.split_once('\n').unwrap_or((source, ""))
}
