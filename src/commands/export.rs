//! Export command: fetch each selected dataset and write it to disk.
//!
//! Datasets are processed one after another. A failing dataset is recorded
//! in the summary and the run moves on to the next one.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{error, info, info_span, warn};

use crate::{
    api::{
        client::ApiClient,
        http::Transport,
        pagination::{fetch_all, PageQuery},
        retry::Sleeper,
    },
    cli::types::Dataset,
    config::Config,
    core::Table,
    export::{export, export_workbook, ExportOptions, Sheet},
    DogeError, Result,
};


/// Parameters for one export run
#[derive(Debug, Clone)]
pub struct ExportParams {
    pub datasets: Vec<Dataset>,
    pub query: PageQuery,
    pub output_dir: PathBuf,
    pub options: ExportOptions,
    /// Write every dataset as a sheet of one workbook instead of one file each.
    pub single_workbook: bool,
}

impl ExportParams {
    pub fn from_config(config: &Config, datasets: Vec<Dataset>) -> Self {
        Self {
            datasets,
            query: PageQuery::from_config(config),
            output_dir: config.output_dir.clone(),
            options: ExportOptions::new(config.export_format, config.include_timestamp),
            single_workbook: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DatasetStatus {
    /// Every page was fetched and written.
    Exported { path: PathBuf, records: usize },
    /// Written, but pagination stopped before the end.
    Partial {
        path: PathBuf,
        records: usize,
        reason: String,
    },
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct DatasetReport {
    pub dataset: Dataset,
    pub status: DatasetStatus,
}

/// Outcome of a whole run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExportSummary {
    pub reports: Vec<DatasetReport>,
}

impl ExportSummary {
    pub fn succeeded(&self) -> usize {
        self.count(|s| matches!(s, DatasetStatus::Exported { .. }))
    }

    pub fn partial(&self) -> usize {
        self.count(|s| matches!(s, DatasetStatus::Partial { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, DatasetStatus::Failed { .. }))
    }

    /// True only when every dataset was exported completely.
    pub fn is_success(&self) -> bool {
        self.succeeded() == self.reports.len()
    }

    fn count(&self, pred: impl Fn(&DatasetStatus) -> bool) -> usize {
        self.reports.iter().filter(|r| pred(&r.status)).count()
    }
}

/// A fetched dataset waiting to be written.
struct Fetched {
    dataset: Dataset,
    table: Table,
    records: usize,
    truncation: Option<String>,
}

impl Fetched {
    fn report(&self, path: PathBuf) -> DatasetReport {
        let status = match &self.truncation {
            Some(reason) => DatasetStatus::Partial {
                path,
                records: self.records,
                reason: reason.clone(),
            },
            None => DatasetStatus::Exported {
                path,
                records: self.records,
            },
        };
        DatasetReport {
            dataset: self.dataset,
            status,
        }
    }
}

/// Run the export for every dataset in `params`.
pub fn handle_export<T, S>(client: &ApiClient<T, S>, params: &ExportParams) -> ExportSummary
where
    T: Transport,
    S: Sleeper,
{
    let mut summary = ExportSummary::default();
    let mut pending: Vec<Fetched> = Vec::new();

    for &dataset in &params.datasets {
        let span = info_span!("dataset", dataset = dataset.name());
        let _enter = span.enter();
        info!("Exporting {}", dataset.display_name());

        let fetched = match fetch_dataset(client, dataset, &params.query) {
            Ok(fetched) => fetched,
            Err(e) => {
                log_failure(dataset, &e);
                summary.reports.push(failed(dataset, &e));
                continue;
            }
        };

        if params.single_workbook {
            pending.push(fetched);
            continue;
        }

        let report = match export(&fetched.table, dataset, &params.output_dir, &params.options) {
            Ok(path) => fetched.report(path),
            Err(e) => {
                error!(error = %e, "export failed");
                failed(dataset, &e)
            }
        };
        summary.reports.push(report);
    }

    if params.single_workbook && !pending.is_empty() {
        write_combined(&pending, &params.output_dir, &params.options, &mut summary);
    }

    // Keep reports in the order datasets were requested.
    summary.reports.sort_by_key(|r| {
        params
            .datasets
            .iter()
            .position(|d| *d == r.dataset)
            .unwrap_or(usize::MAX)
    });
    summary
}

fn fetch_dataset<T: Transport, S: Sleeper>(
    client: &ApiClient<T, S>,
    dataset: Dataset,
    query: &PageQuery,
) -> Result<Fetched> {
    let outcome = fetch_all(client, dataset, query)?;
    let truncation = outcome.truncation_reason();
    if let Some(reason) = &truncation {
        warn!(records = outcome.records.len(), reason = %reason, "partial result");
    }

    Ok(Fetched {
        dataset,
        records: outcome.records.len(),
        table: Table::from_records(&outcome.records),
        truncation,
    })
}

fn write_combined(
    pending: &[Fetched],
    output_dir: &Path,
    options: &ExportOptions,
    summary: &mut ExportSummary,
) {
    let sheets: Vec<Sheet<'_>> = pending
        .iter()
        .map(|f| Sheet {
            dataset: f.dataset,
            table: &f.table,
        })
        .collect();

    match export_workbook(&sheets, output_dir, options) {
        Ok(path) => summary
            .reports
            .extend(pending.iter().map(|f| f.report(path.clone()))),
        Err(e) => {
            error!(error = %e, "workbook export failed");
            summary
                .reports
                .extend(pending.iter().map(|f| failed(f.dataset, &e)));
        }
    }
}

fn failed(dataset: Dataset, e: &DogeError) -> DatasetReport {
    DatasetReport {
        dataset,
        status: DatasetStatus::Failed {
            error: e.to_string(),
        },
    }
}

fn log_failure(dataset: Dataset, e: &DogeError) {
    // Legacy endpoints are expected to be gone on current deployments.
    if dataset.is_legacy() {
        warn!(error = %e, "legacy dataset unavailable");
    } else {
        error!(error = %e, "dataset failed");
    }
}

/// Print one line per dataset and the totals.
pub fn print_summary<W: Write>(summary: &ExportSummary, out: &mut W) -> io::Result<()> {
    writeln!(out, "\nExport summary:")?;
    for report in &summary.reports {
        let name = report.dataset.name();
        match &report.status {
            DatasetStatus::Exported { path, records } => {
                writeln!(out, "  ✅ {}: {} ({} records)", name, path.display(), records)?
            }
            DatasetStatus::Partial {
                path,
                records,
                reason,
            } => writeln!(
                out,
                "  ⚠️ {}: {} ({} records, partial: {})",
                name,
                path.display(),
                records,
                reason
            )?,
            DatasetStatus::Failed { error } => writeln!(out, "  ❌ {}: {}", name, error)?,
        }
    }
    writeln!(
        out,
        "{} succeeded, {} partial, {} failed",
        summary.succeeded(),
        summary.partial(),
        summary.failed()
    )
}
