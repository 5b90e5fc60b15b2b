//! CLI argument definitions and parsing.

pub mod types;

use std::path::PathBuf;

use clap::{ArgGroup, Parser};
use types::{Dataset, Filters, SortOrder};

use crate::commands::ExportParams;
use crate::config::Config;
use crate::export::ExportFormat;

#[derive(Debug, Parser)]
#[clap(
    name = "doge-export",
    version,
    about = "Export DOGE API datasets to spreadsheet files",
    after_help = "Examples:\n  doge-export --all\n  doge-export --data-type grants\n  doge-export --data-type contracts --filter \"agency=GSA\"\n  doge-export --all --output-dir exports --no-timestamp"
)]
#[clap(group(ArgGroup::new("selector").required(true).args(["all", "data_type"])))]
pub struct Cli {
    /// Export every known dataset, continuing past failures.
    #[clap(long)]
    pub all: bool,

    /// Export a single dataset.
    #[clap(long, value_enum)]
    pub data_type: Option<Dataset>,

    /// Query filters in the form `key1=value1,key2=value2`.
    #[clap(long)]
    pub filter: Option<Filters>,

    /// Output directory (overrides `DOGE_OUTPUT_DIR`).
    #[clap(long)]
    pub output_dir: Option<PathBuf>,

    /// Leave the timestamp out of output file names.
    #[clap(long)]
    pub no_timestamp: bool,

    /// Output file format (overrides `DOGE_EXCEL_ENGINE`).
    #[clap(long, value_enum)]
    pub format: Option<ExportFormat>,

    /// With `--all`, write one workbook with a sheet per dataset.
    #[clap(long, requires = "all")]
    pub single_workbook: bool,

    /// Stop after this many records per dataset (0 = unlimited).
    #[clap(long)]
    pub max_records: Option<usize>,

    /// Sort field sent to the API instead of the dataset default.
    #[clap(long)]
    pub sort_by: Option<String>,

    /// Sort direction sent to the API.
    #[clap(long, value_enum)]
    pub sort_order: Option<SortOrder>,

    /// Enable debug logging.
    #[clap(long, short)]
    pub verbose: bool,
}

impl Cli {
    /// Datasets selected by `--all` or `--data-type`.
    pub fn datasets(&self) -> Vec<Dataset> {
        match self.data_type {
            Some(dataset) if !self.all => vec![dataset],
            _ => Dataset::ALL.to_vec(),
        }
    }

    /// Apply command-line overrides on top of the environment configuration.
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if self.no_timestamp {
            config.include_timestamp = false;
        }
        if let Some(format) = self.format {
            config.export_format = format;
        }
        if let Some(max) = self.max_records {
            config.max_records = (max > 0).then_some(max);
        }
        if self.verbose {
            config.log_level = "debug".to_string();
        }
    }

    /// Export parameters for this invocation, on top of `config`.
    pub fn export_params(&self, config: &Config) -> ExportParams {
        let mut params = ExportParams::from_config(config, self.datasets());
        if let Some(filters) = &self.filter {
            params.query.filters = filters.clone();
        }
        params.query.sort_by = self.sort_by.clone();
        if let Some(order) = self.sort_order {
            params.query.sort_order = order;
        }
        params.single_workbook = self.single_workbook;
        params
    }
}
