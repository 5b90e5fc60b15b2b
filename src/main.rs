//! Entry point: parse CLI, load configuration and run the export.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::process::ExitCode;
use std::sync::Mutex;

use anyhow::Context;
use clap::Parser;
use doge_export::{
    cli::Cli,
    commands::{handle_export, print_summary},
    config::{Config, LogFormat},
    ApiClient, ExportFormat,
};
use tracing::{error, info, warn};
use tracing_subscriber::{
    fmt::{self, MakeWriter},
    prelude::*,
    EnvFilter, Layer, Registry,
};

/// Some dataset failed or was only partially exported.
const EXIT_FAILURE: u8 = 1;
/// Bad configuration.
const EXIT_USAGE: u8 = 2;

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

fn fmt_layer<W>(format: LogFormat, writer: W, ansi: bool) -> BoxedLayer
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = fmt::layer().with_ansi(ansi).with_writer(writer);
    match format {
        LogFormat::Json => layer.json().boxed(),
        LogFormat::Text => layer.boxed(),
    }
}

fn open_log_file(config: &Config) -> io::Result<File> {
    fs::create_dir_all(&config.output_dir)?;
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(config.log_file())
}

/// Initialize tracing on stderr and in the output directory's log file.
/// `RUST_LOG` wins over the configured level.
fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,doge_export={}", config.log_level)));

    let mut layers = vec![fmt_layer(config.log_format, io::stderr, true)];
    let file_error = match open_log_file(config) {
        Ok(file) => {
            layers.push(fmt_layer(config.log_format, Mutex::new(file), false));
            None
        }
        Err(e) => Some(e),
    };

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .init();

    if let Some(e) = file_error {
        warn!(
            path = %config.log_file().display(),
            "Could not open log file, logging to stderr only: {}",
            e
        );
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = Config::from_env().context("Failed to load configuration")?;
    cli.apply_overrides(&mut config);
    Ok(config)
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return ExitCode::from(EXIT_USAGE);
        }
    };
    init_tracing(&config);

    let client = match ApiClient::from_config(&config).context("Failed to build HTTP client") {
        Ok(client) => client,
        Err(e) => {
            error!("{:#}", e);
            return ExitCode::from(EXIT_USAGE);
        }
    };

    if config.api_key.is_none() {
        warn!("DOGE_API_KEY is not set; sending requests without an API key");
    }

    let params = cli.export_params(&config);
    if params.single_workbook && config.export_format == ExportFormat::Csv {
        warn!("--single-workbook always writes .xlsx; ignoring csv format");
    }

    info!(
        datasets = params.datasets.len(),
        base_url = %config.base_url,
        output_dir = %config.output_dir.display(),
        "Starting export"
    );

    let summary = handle_export(&client, &params);

    if let Err(e) = print_summary(&summary, &mut io::stdout().lock()) {
        error!("Failed to print summary: {}", e);
    }

    if summary.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(EXIT_FAILURE)
    }
}
