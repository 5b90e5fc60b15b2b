//! Excel workbook writer.

use std::path::Path;

use chrono::{Datelike, NaiveDateTime, Timelike};
use rust_xlsxwriter::{ExcelDateTime, Format, Workbook, Worksheet, XlsxError};
use tracing::debug;

use super::{check_limits, sanitize, Cell, ColumnHint, Sheet};
use crate::core::Table;
use crate::error::{DogeError, Result};

/// Write one worksheet per entry of `sheets` and save to `path`.
///
/// Each sheet is named after its dataset and starts with a bold, frozen
/// header row. A table without rows still gets its header. The dataset's
/// numeric and date columns are written as Excel numbers and dates.
pub fn write_workbook(path: &Path, sheets: &[Sheet<'_>]) -> Result<()> {
    for sheet in sheets {
        check_limits(sheet.table, path)?;
    }

    let mut workbook = Workbook::new();
    let formats = Formats {
        header: Format::new().set_bold(),
        date: Format::new().set_num_format("yyyy-mm-dd"),
        datetime: Format::new().set_num_format("yyyy-mm-dd hh:mm:ss"),
    };

    for sheet in sheets {
        let worksheet = workbook.add_worksheet();
        worksheet
            .set_name(sheet.dataset.display_name())
            .map_err(|e| DogeError::export(path, e))?;
        let hints: Vec<ColumnHint> = sheet
            .table
            .columns()
            .iter()
            .map(|column| ColumnHint::for_column(sheet.dataset, column))
            .collect();
        write_sheet(worksheet, sheet.table, &hints, &formats)
            .map_err(|e| DogeError::export(path, e))?;
        debug!(
            sheet = sheet.dataset.display_name(),
            rows = sheet.table.len(),
            "worksheet filled"
        );
    }

    workbook.save(path).map_err(|e| DogeError::export(path, e))
}

struct Formats {
    header: Format,
    date: Format,
    datetime: Format,
}

/// Excel date for `dt`, or `None` outside the range Excel can hold.
fn excel_datetime(dt: &NaiveDateTime) -> Option<ExcelDateTime> {
    let year = u16::try_from(dt.year()).ok()?;
    ExcelDateTime::from_ymd(year, dt.month() as u8, dt.day() as u8)
        .and_then(|date| date.and_hms(dt.hour() as u16, dt.minute() as u8, dt.second()))
        .ok()
}

fn write_sheet(
    worksheet: &mut Worksheet,
    table: &Table,
    hints: &[ColumnHint],
    formats: &Formats,
) -> std::result::Result<(), XlsxError> {
    if table.columns().is_empty() {
        return Ok(());
    }

    // Limits are checked up front, so the index casts cannot overflow.
    for (col, name) in table.columns().iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, sanitize(name).as_ref(), &formats.header)?;
    }
    worksheet.set_freeze_panes(1, 0)?;

    for (i, row) in table.rows().iter().enumerate() {
        let r = (i + 1) as u32;
        for (col, (value, &hint)) in table.cells(row).zip(hints).enumerate() {
            let c = col as u16;
            match Cell::from_value(value, hint) {
                Cell::Empty => {}
                Cell::Text(text) => {
                    worksheet.write_string(r, c, text.as_ref())?;
                }
                Cell::Number(x) => {
                    worksheet.write_number(r, c, x)?;
                }
                Cell::Bool(b) => {
                    worksheet.write_boolean(r, c, b)?;
                }
                Cell::Date(dt) => match excel_datetime(&dt) {
                    Some(excel) => {
                        let midnight = dt.hour() == 0 && dt.minute() == 0 && dt.second() == 0;
                        let format = if midnight { &formats.date } else { &formats.datetime };
                        worksheet.write_datetime_with_format(r, c, &excel, format)?;
                    }
                    None => {
                        worksheet.write_string(r, c, dt.to_string())?;
                    }
                },
            }
        }
    }

    Ok(())
}
