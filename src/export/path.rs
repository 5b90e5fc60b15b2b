//! Output file naming: `<stem>[_<YYYYmmdd_HHMMSS>].<ext>`.

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;

use super::{ExportFormat, ExportOptions};

/// `strftime` pattern for file name timestamps.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Stem of the combined workbook.
pub const WORKBOOK_STEM: &str = "doge_export";

pub fn file_name(stem: &str, format: ExportFormat, timestamp: Option<&NaiveDateTime>) -> String {
    match timestamp {
        Some(ts) => format!(
            "{}_{}.{}",
            stem,
            ts.format(TIMESTAMP_FORMAT),
            format.extension()
        ),
        None => format!("{}.{}", stem, format.extension()),
    }
}

pub fn output_path(output_dir: &Path, stem: &str, options: &ExportOptions) -> PathBuf {
    output_dir.join(file_name(stem, options.format, options.timestamp.as_ref()))
}
