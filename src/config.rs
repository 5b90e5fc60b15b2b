//! Runtime configuration.
//!
//! All settings are read once at startup (see [`Config::from_env`]) and then
//! passed by reference to the client, the pagination driver and the
//! exporters. Nothing below this module looks at the environment.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::api::retry::DEFAULT_RETRY_AFTER_MAX;
use crate::error::{DogeError, Result};
use crate::export::ExportFormat;

pub const BASE_URL_ENV_VAR: &str = "DOGE_API_BASE_URL";
pub const API_KEY_ENV_VAR: &str = "DOGE_API_KEY";
pub const API_VERSION_ENV_VAR: &str = "DOGE_API_VERSION";
pub const TIMEOUT_ENV_VAR: &str = "DOGE_REQUEST_TIMEOUT";
pub const MAX_RETRIES_ENV_VAR: &str = "DOGE_REQUEST_MAX_RETRIES";
pub const MAX_RECORDS_ENV_VAR: &str = "DOGE_MAX_RECORDS_PER_REQUEST";
pub const BATCH_SIZE_ENV_VAR: &str = "DOGE_BATCH_SIZE";
pub const OUTPUT_DIR_ENV_VAR: &str = "DOGE_OUTPUT_DIR";
pub const EXCEL_ENGINE_ENV_VAR: &str = "DOGE_EXCEL_ENGINE";
pub const INCLUDE_TIMESTAMP_ENV_VAR: &str = "DOGE_INCLUDE_TIMESTAMP";
pub const LOG_LEVEL_ENV_VAR: &str = "DOGE_LOG_LEVEL";
pub const LOG_FORMAT_ENV_VAR: &str = "DOGE_LOG_FORMAT";
pub const BACKOFF_BASE_ENV_VAR: &str = "DOGE_BACKOFF_BASE_MS";
pub const BACKOFF_MAX_ENV_VAR: &str = "DOGE_BACKOFF_MAX_MS";
pub const RETRY_AFTER_MAX_ENV_VAR: &str = "DOGE_RETRY_AFTER_MAX_SECS";

pub const DEFAULT_BASE_URL: &str = "https://api.doge.gov";
pub const DEFAULT_API_VERSION: &str = "v0.0.2-beta";
pub const DEFAULT_OUTPUT_DIR: &str = "doge_data";

/// Log file written next to the exports.
pub const LOG_FILE_NAME: &str = "doge_export.log";

/// Levels accepted in `DOGE_LOG_LEVEL`.
pub const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Smallest and largest `per_page` the API accepts.
pub const MIN_PAGE_SIZE: u32 = 1;
pub const MAX_PAGE_SIZE: u32 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub base_url: String,
    pub api_key: Option<String>,
    /// Informational only; reported in the `User-Agent` header.
    pub api_version: String,
    /// Per-attempt request timeout.
    pub timeout: Duration,
    /// Total attempts per request, including the first one.
    pub max_retries: u32,
    /// Cap on records collected for one dataset; `None` means unlimited.
    pub max_records: Option<usize>,
    /// Requested `per_page`; see [`Config::page_size`] for the clamped value.
    pub batch_size: u32,
    pub output_dir: PathBuf,
    pub export_format: ExportFormat,
    pub include_timestamp: bool,
    pub log_level: String,
    pub log_format: LogFormat,
    pub backoff_base: Duration,
    pub backoff_max: Duration,
    /// Longest server-requested `Retry-After` wait that is honored.
    pub retry_after_max: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            api_version: DEFAULT_API_VERSION.to_string(),
            timeout: Duration::from_secs(30),
            max_retries: 3,
            max_records: None,
            batch_size: 100,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            export_format: ExportFormat::Xlsx,
            include_timestamp: true,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            backoff_base: Duration::from_millis(500),
            backoff_max: Duration::from_secs(30),
            retry_after_max: DEFAULT_RETRY_AFTER_MAX,
        }
    }
}

impl Config {
    /// Build the configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup. Unset or blank
    /// values fall back to the defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::default();

        let max_records = match get(MAX_RECORDS_ENV_VAR) {
            Some(raw) => match parse_number::<usize>(MAX_RECORDS_ENV_VAR, &raw)? {
                0 => None,
                n => Some(n),
            },
            None => None,
        };

        let export_format = match get(EXCEL_ENGINE_ENV_VAR) {
            Some(raw) => parse_export_format(&raw)?,
            None => defaults.export_format,
        };

        let log_format = match get(LOG_FORMAT_ENV_VAR).as_deref() {
            Some(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
            Some(v) if v.eq_ignore_ascii_case("text") => LogFormat::Text,
            Some(v) => {
                return Err(DogeError::Config {
                    key: LOG_FORMAT_ENV_VAR.to_string(),
                    reason: format!("expected 'text' or 'json', got '{}'", v),
                })
            }
            None => defaults.log_format,
        };

        Ok(Self {
            base_url: get(BASE_URL_ENV_VAR).unwrap_or(defaults.base_url),
            api_key: get(API_KEY_ENV_VAR),
            api_version: get(API_VERSION_ENV_VAR).unwrap_or(defaults.api_version),
            timeout: match get(TIMEOUT_ENV_VAR) {
                Some(raw) => Duration::from_secs(parse_number(TIMEOUT_ENV_VAR, &raw)?),
                None => defaults.timeout,
            },
            max_retries: match get(MAX_RETRIES_ENV_VAR) {
                Some(raw) => parse_number(MAX_RETRIES_ENV_VAR, &raw)?,
                None => defaults.max_retries,
            },
            max_records,
            batch_size: match get(BATCH_SIZE_ENV_VAR) {
                Some(raw) => parse_number(BATCH_SIZE_ENV_VAR, &raw)?,
                None => defaults.batch_size,
            },
            output_dir: get(OUTPUT_DIR_ENV_VAR)
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            export_format,
            include_timestamp: match get(INCLUDE_TIMESTAMP_ENV_VAR) {
                Some(raw) => parse_bool(INCLUDE_TIMESTAMP_ENV_VAR, &raw)?,
                None => defaults.include_timestamp,
            },
            log_level: match get(LOG_LEVEL_ENV_VAR) {
                Some(raw) => parse_log_level(&raw)?.to_string(),
                None => defaults.log_level,
            },
            log_format,
            backoff_base: match get(BACKOFF_BASE_ENV_VAR) {
                Some(raw) => Duration::from_millis(parse_number(BACKOFF_BASE_ENV_VAR, &raw)?),
                None => defaults.backoff_base,
            },
            backoff_max: match get(BACKOFF_MAX_ENV_VAR) {
                Some(raw) => Duration::from_millis(parse_number(BACKOFF_MAX_ENV_VAR, &raw)?),
                None => defaults.backoff_max,
            },
            retry_after_max: match get(RETRY_AFTER_MAX_ENV_VAR) {
                Some(raw) => Duration::from_secs(parse_number(RETRY_AFTER_MAX_ENV_VAR, &raw)?),
                None => defaults.retry_after_max,
            },
        })
    }

    /// `per_page` sent to the API, clamped to the range it accepts.
    pub fn page_size(&self) -> u32 {
        self.batch_size.clamp(MIN_PAGE_SIZE, MAX_PAGE_SIZE)
    }

    /// Path of the run's log file inside the output directory.
    pub fn log_file(&self) -> PathBuf {
        self.output_dir.join(LOG_FILE_NAME)
    }
}

fn parse_number<T>(key: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse::<T>().map_err(|e| DogeError::Config {
        key: key.to_string(),
        reason: format!("'{}' is not a valid number: {}", raw, e),
    })
}

fn parse_bool(key: &str, raw: &str) -> Result<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(DogeError::Config {
            key: key.to_string(),
            reason: format!("'{}' is not a boolean", raw),
        }),
    }
}

/// Normalize a level name to a tracing directive. `warning` and `critical`
/// are accepted for existing .env files.
fn parse_log_level(raw: &str) -> Result<&'static str> {
    let level = raw.to_ascii_lowercase();
    match level.as_str() {
        "warning" => return Ok("warn"),
        "critical" => return Ok("error"),
        _ => {}
    }
    LOG_LEVELS
        .iter()
        .copied()
        .find(|known| *known == level)
        .ok_or_else(|| DogeError::Config {
            key: LOG_LEVEL_ENV_VAR.to_string(),
            reason: format!(
                "unknown level '{}' (expected one of {})",
                raw,
                LOG_LEVELS.join(", ")
            ),
        })
}

fn parse_export_format(raw: &str) -> Result<ExportFormat> {
    match raw.to_ascii_lowercase().as_str() {
        // Engine names kept for existing .env files
        "xlsx" | "openpyxl" | "xlsxwriter" => Ok(ExportFormat::Xlsx),
        "csv" => Ok(ExportFormat::Csv),
        other => Err(DogeError::Config {
            key: EXCEL_ENGINE_ENV_VAR.to_string(),
            reason: format!("unsupported engine '{}' (expected xlsx or csv)", other),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_environment_is_empty() {
        let config = Config::from_lookup(|_| None).unwrap();

        assert_eq!(config.base_url, "https://api.doge.gov");
        assert_eq!(config.api_key, None);
        assert_eq!(config.api_version, "v0.0.2-beta");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.max_records, None);
        assert_eq!(config.batch_size, 100);
        assert_eq!(config.output_dir, PathBuf::from("doge_data"));
        assert_eq!(config.export_format, ExportFormat::Xlsx);
        assert!(config.include_timestamp);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.log_format, LogFormat::Text);
        assert_eq!(config.retry_after_max, Duration::from_secs(300));
    }

    #[test]
    fn test_values_from_lookup() {
        let config = Config::from_lookup(lookup_from(&[
            (BASE_URL_ENV_VAR, "http://localhost:8080"),
            (API_KEY_ENV_VAR, "secret"),
            (TIMEOUT_ENV_VAR, "5"),
            (MAX_RETRIES_ENV_VAR, "7"),
            (MAX_RECORDS_ENV_VAR, "250"),
            (BATCH_SIZE_ENV_VAR, "50"),
            (OUTPUT_DIR_ENV_VAR, "exports"),
            (EXCEL_ENGINE_ENV_VAR, "csv"),
            (INCLUDE_TIMESTAMP_ENV_VAR, "False"),
            (LOG_LEVEL_ENV_VAR, "DEBUG"),
            (LOG_FORMAT_ENV_VAR, "json"),
            (BACKOFF_BASE_ENV_VAR, "10"),
            (BACKOFF_MAX_ENV_VAR, "100"),
            (RETRY_AFTER_MAX_ENV_VAR, "90"),
        ]))
        .unwrap();

        assert_eq!(config.base_url, "http://localhost:8080");
        assert_eq!(config.api_key.as_deref(), Some("secret"));
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.max_retries, 7);
        assert_eq!(config.max_records, Some(250));
        assert_eq!(config.batch_size, 50);
        assert_eq!(config.output_dir, PathBuf::from("exports"));
        assert_eq!(config.export_format, ExportFormat::Csv);
        assert!(!config.include_timestamp);
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.backoff_base, Duration::from_millis(10));
        assert_eq!(config.backoff_max, Duration::from_millis(100));
        assert_eq!(config.retry_after_max, Duration::from_secs(90));
    }

    #[test]
    fn test_log_level_aliases() {
        let cases = [
            ("WARNING", "warn"),
            ("warn", "warn"),
            ("Critical", "error"),
            ("error", "error"),
            ("TRACE", "trace"),
            ("info", "info"),
        ];
        for (raw, expected) in cases {
            let config = Config::from_lookup(lookup_from(&[(LOG_LEVEL_ENV_VAR, raw)])).unwrap();
            assert_eq!(config.log_level, expected, "level {}", raw);
        }
    }

    #[test]
    fn test_unknown_log_level_is_rejected() {
        let err = Config::from_lookup(lookup_from(&[(LOG_LEVEL_ENV_VAR, "verbose")])).unwrap_err();
        match err {
            DogeError::Config { key, reason } => {
                assert_eq!(key, LOG_LEVEL_ENV_VAR);
                assert!(reason.contains("verbose"));
                assert!(reason.contains("warn"));
            }
            _ => panic!("Expected Config error"),
        }
    }

    #[test]
    fn test_log_file_lives_in_output_dir() {
        let config = Config {
            output_dir: PathBuf::from("exports"),
            ..Config::default()
        };
        assert_eq!(config.log_file(), PathBuf::from("exports").join("doge_export.log"));
    }

    #[test]
    fn test_blank_values_fall_back_to_defaults() {
        let config =
            Config::from_lookup(lookup_from(&[(API_KEY_ENV_VAR, "  "), (BATCH_SIZE_ENV_VAR, "")]))
                .unwrap();

        assert_eq!(config.api_key, None);
        assert_eq!(config.batch_size, 100);
    }

    #[test]
    fn test_zero_max_records_means_unlimited() {
        let config = Config::from_lookup(lookup_from(&[(MAX_RECORDS_ENV_VAR, "0")])).unwrap();
        assert_eq!(config.max_records, None);
    }

    #[test]
    fn test_legacy_engine_names_map_to_xlsx() {
        for engine in ["openpyxl", "xlsxwriter", "XLSX"] {
            let config = Config::from_lookup(lookup_from(&[(EXCEL_ENGINE_ENV_VAR, engine)])).unwrap();
            assert_eq!(config.export_format, ExportFormat::Xlsx);
        }
    }

    #[test]
    fn test_invalid_number_is_reported_with_key() {
        let err = Config::from_lookup(lookup_from(&[(TIMEOUT_ENV_VAR, "soon")])).unwrap_err();
        match err {
            DogeError::Config { key, reason } => {
                assert_eq!(key, TIMEOUT_ENV_VAR);
                assert!(reason.contains("soon"));
            }
            _ => panic!("Expected Config error"),
        }
    }

    #[test]
    fn test_invalid_bool_and_engine_are_rejected() {
        assert!(Config::from_lookup(lookup_from(&[(INCLUDE_TIMESTAMP_ENV_VAR, "maybe")])).is_err());
        assert!(Config::from_lookup(lookup_from(&[(EXCEL_ENGINE_ENV_VAR, "ods")])).is_err());
        assert!(Config::from_lookup(lookup_from(&[(LOG_FORMAT_ENV_VAR, "xml")])).is_err());
    }

    #[test]
    fn test_page_size_is_clamped() {
        let mut config = Config::default();
        assert_eq!(config.page_size(), 100);

        config.batch_size = 0;
        assert_eq!(config.page_size(), 1);

        config.batch_size = 1000;
        assert_eq!(config.page_size(), 500);

        config.batch_size = 500;
        assert_eq!(config.page_size(), 500);
    }
}
