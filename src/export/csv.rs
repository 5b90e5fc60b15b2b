//! CSV writer.

use std::path::Path;

use csv::Writer;
use tracing::debug;

use super::{sanitize, Cell, ColumnHint};
use crate::core::Table;
use crate::error::{DogeError, Result};

/// Write `table` as CSV with a header row. Text cells are kept as received,
/// so column hints do not apply here.
pub fn write_table(path: &Path, table: &Table) -> Result<()> {
    let mut writer = Writer::from_path(path).map_err(|e| DogeError::export(path, e))?;

    writer
        .write_record(table.columns().iter().map(|c| sanitize(c).into_owned()))
        .map_err(|e| DogeError::export(path, e))?;

    for row in table.rows() {
        let record: Vec<String> = table
            .cells(row)
            .map(|value| cell_text(Cell::from_value(value, ColumnHint::Text)))
            .collect();
        writer
            .write_record(&record)
            .map_err(|e| DogeError::export(path, e))?;
    }

    writer.flush().map_err(|e| DogeError::export(path, e))?;
    debug!(path = %path.display(), rows = table.len(), "csv written");
    Ok(())
}

fn cell_text(cell: Cell<'_>) -> String {
    match cell {
        Cell::Empty => String::new(),
        Cell::Text(text) => text.into_owned(),
        Cell::Number(x) => x.to_string(),
        Cell::Bool(b) => b.to_string(),
        Cell::Date(dt) => dt.to_string(),
    }
}
