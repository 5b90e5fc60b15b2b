//! DOGE API Export Library
//!
//! Fetches paginated datasets from the DOGE savings API and writes them to
//! spreadsheet files.
//!
//! ## Features
//!
//! - **Retrying Client**: Exponential backoff for timeouts, connection failures, 5xx and 429
//! - **Pagination**: Walks every page until the API runs dry or a record cap is hit
//! - **Flattening**: Nested JSON records become dotted spreadsheet columns
//! - **Export**: One `.xlsx` (or `.csv`) file per dataset, or a single workbook
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use doge_export::{
//!     commands::{handle_export, print_summary, ExportParams},
//!     ApiClient, Config, Dataset,
//! };
//!
//! # fn example() -> doge_export::Result<()> {
//! let config = Config::from_env()?;
//! let client = ApiClient::from_config(&config)?;
//!
//! let params = ExportParams::from_config(&config, vec![Dataset::Grants]);
//! let summary = handle_export(&client, &params);
//!
//! print_summary(&summary, &mut std::io::stdout())?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Environment Configuration
//!
//! Set your API key (and optionally a different base URL) before running:
//! ```bash
//! export DOGE_API_KEY=your-key
//! export DOGE_API_BASE_URL=https://api.doge.gov
//! ```

pub mod api;
pub mod cli;
pub mod commands;
pub mod config;
pub mod core;
pub mod error;
pub mod export;

// Re-export commonly used types
pub use api::{ApiClient, FetchOutcome, PageQuery, StopReason};
pub use cli::types::{Dataset, Filters, SortOrder};
pub use config::Config;
pub use error::{DogeError, RequestError, RequestErrorKind, Result};
pub use export::ExportFormat;
