//! Spreadsheet export of flattened tables.
//!
//! - `xlsx`: Excel workbooks, one sheet per dataset
//! - `csv`: comma-separated files
//! - `path`: output file naming

pub mod csv;
pub mod path;
pub mod xlsx;


use std::borrow::Cow;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use serde_json::Value;
use tracing::{info, warn};

use crate::cli::types::Dataset;
use crate::core::Table;
use crate::error::{DogeError, Result};

/// Longest text written to a single cell.
pub const MAX_CELL_CHARS: usize = 32_000;
/// Worksheet row limit, header included.
pub const MAX_ROWS: usize = 1_048_576;
/// Worksheet column limit.
pub const MAX_COLUMNS: usize = 16_384;

/// Largest integer an f64 holds exactly; bigger ones are written as text.
const MAX_EXACT_INTEGER: u64 = 1 << 53;

const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];
const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%m/%d/%Y"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ExportFormat {
    #[default]
    Xlsx,
    Csv,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Xlsx => "xlsx",
            ExportFormat::Csv => "csv",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.extension())
    }
}

/// Settings shared by every file written in one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOptions {
    pub format: ExportFormat,
    /// Appended to file names when set.
    pub timestamp: Option<NaiveDateTime>,
}

impl ExportOptions {
    /// Options stamped with the current local time when `include_timestamp`.
    pub fn new(format: ExportFormat, include_timestamp: bool) -> Self {
        Self {
            format,
            timestamp: include_timestamp.then(|| Local::now().naive_local()),
        }
    }
}

/// One worksheet of a combined workbook.
#[derive(Debug, Clone, Copy)]
pub struct Sheet<'a> {
    pub dataset: Dataset,
    pub table: &'a Table,
}

/// How text in a column is interpreted on export.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ColumnHint {
    #[default]
    Text,
    Numeric,
    Date,
}

impl ColumnHint {
    pub fn for_column(dataset: Dataset, column: &str) -> Self {
        if dataset.numeric_fields().contains(&column) {
            ColumnHint::Numeric
        } else if dataset.date_fields().contains(&column) {
            ColumnHint::Date
        } else {
            ColumnHint::Text
        }
    }
}

/// A cell ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell<'a> {
    Empty,
    Text(Cow<'a, str>),
    Number(f64),
    Bool(bool),
    Date(NaiveDateTime),
}

impl<'a> Cell<'a> {
    /// Convert a flattened value. Text in a `Numeric` column that parses as a
    /// finite number becomes a number; text in a `Date` column that parses as
    /// a date becomes a date. Anything else stays text.
    pub fn from_value(value: Option<&'a Value>, hint: ColumnHint) -> Self {
        match value {
            None | Some(Value::Null) => Cell::Empty,
            Some(Value::Bool(b)) => Cell::Bool(*b),
            Some(Value::Number(n)) => match exact_f64(n) {
                Some(x) => Cell::Number(x),
                None => Cell::Text(Cow::Owned(n.to_string())),
            },
            Some(Value::String(s)) => match hint {
                ColumnHint::Numeric => match s.trim().parse::<f64>() {
                    Ok(x) if x.is_finite() => Cell::Number(x),
                    _ => Cell::Text(sanitize(s)),
                },
                ColumnHint::Date => match parse_date(s) {
                    Some(dt) => Cell::Date(dt),
                    None => Cell::Text(sanitize(s)),
                },
                ColumnHint::Text => Cell::Text(sanitize(s)),
            },
            // Flattened rows hold scalars only; anything else is kept as text.
            Some(other) => Cell::Text(Cow::Owned(sanitize(&other.to_string()).into_owned())),
        }
    }
}

/// Parse the date forms the API sends: RFC 3339, ISO date-times with or
/// without `T`, ISO dates and US `m/d/yyyy` dates.
pub fn parse_date(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_local());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

fn exact_f64(n: &serde_json::Number) -> Option<f64> {
    if let Some(u) = n.as_u64() {
        return (u <= MAX_EXACT_INTEGER).then_some(u as f64);
    }
    if let Some(i) = n.as_i64() {
        return (i.unsigned_abs() <= MAX_EXACT_INTEGER).then_some(i as f64);
    }
    n.as_f64()
}

/// Replace control whitespace with spaces and cap the length at
/// [`MAX_CELL_CHARS`].
pub fn sanitize(text: &str) -> Cow<'_, str> {
    let needs_replace = text.contains(['\r', '\n', '\t']);
    let too_long = text.len() > MAX_CELL_CHARS && text.chars().count() > MAX_CELL_CHARS;
    if !needs_replace && !too_long {
        return Cow::Borrowed(text);
    }

    let mut cleaned: String = text.replace(['\r', '\n', '\t'], " ");
    if too_long {
        warn!(
            chars = text.chars().count(),
            limit = MAX_CELL_CHARS,
            "truncating oversized cell"
        );
        cleaned = cleaned.chars().take(MAX_CELL_CHARS).collect();
    }
    Cow::Owned(cleaned)
}

/// Fail when `table` cannot fit in one worksheet.
pub fn check_limits(table: &Table, path: &Path) -> Result<()> {
    if table.columns().len() > MAX_COLUMNS {
        return Err(DogeError::export(
            path,
            format!(
                "{} columns exceeds the limit of {}",
                table.columns().len(),
                MAX_COLUMNS
            ),
        ));
    }
    if table.len() + 1 > MAX_ROWS {
        return Err(DogeError::export(
            path,
            format!(
                "{} rows exceeds the limit of {}",
                table.len(),
                MAX_ROWS - 1
            ),
        ));
    }
    Ok(())
}

fn prepare_dir(output_dir: &Path) -> Result<()> {
    fs::create_dir_all(output_dir).map_err(|e| DogeError::export(output_dir, e))
}

/// Write `table` for `dataset` to its own file in `output_dir`.
pub fn export(
    table: &Table,
    dataset: Dataset,
    output_dir: &Path,
    options: &ExportOptions,
) -> Result<PathBuf> {
    let path = path::output_path(output_dir, dataset.name(), options);
    prepare_dir(output_dir)?;

    match options.format {
        ExportFormat::Xlsx => xlsx::write_workbook(&path, &[Sheet { dataset, table }])?,
        ExportFormat::Csv => {
            check_limits(table, &path)?;
            csv::write_table(&path, table)?
        }
    }

    info!(
        dataset = dataset.name(),
        path = %path.display(),
        rows = table.len(),
        columns = table.columns().len(),
        "export written"
    );
    Ok(path)
}

/// Write every sheet into one `.xlsx` workbook in `output_dir`.
pub fn export_workbook(
    sheets: &[Sheet<'_>],
    output_dir: &Path,
    options: &ExportOptions,
) -> Result<PathBuf> {
    let options = ExportOptions {
        format: ExportFormat::Xlsx,
        ..options.clone()
    };
    let path = path::output_path(output_dir, path::WORKBOOK_STEM, &options);
    prepare_dir(output_dir)?;

    xlsx::write_workbook(&path, sheets)?;

    info!(
        path = %path.display(),
        sheets = sheets.len(),
        "workbook written"
    );
    Ok(path)
}
