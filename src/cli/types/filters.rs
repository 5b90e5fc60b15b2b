//! Query filter and sort types for the export command.

use crate::error::{DogeError, Result};
use std::fmt;
use std::str::FromStr;

/// User-supplied query filters, parsed from `key=value[,key=value...]`.
///
/// Order of first appearance is kept; a repeated key replaces the earlier
/// value in place.
///
/// # Examples
///
/// ```rust
/// use doge_export::Filters;
///
/// let filters: Filters = "agency=GSA, state = TX".parse().unwrap();
/// assert_eq!(filters.get("state"), Some("TX"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filters(Vec<(String, String)>);

impl Filters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a single filter.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.0.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromStr for Filters {
    type Err = DogeError;

    fn from_str(s: &str) -> Result<Self> {
        let mut filters = Filters::new();

        for item in s.split(',') {
            let item = item.trim();
            if item.is_empty() {
                continue;
            }

            let (key, value) = item.split_once('=').ok_or_else(|| DogeError::InvalidFilter {
                input: item.to_string(),
                reason: "missing '=' separator".to_string(),
            })?;

            let key = key.trim();
            if key.is_empty() {
                return Err(DogeError::InvalidFilter {
                    input: item.to_string(),
                    reason: "empty key".to_string(),
                });
            }

            filters.insert(key, value.trim());
        }

        Ok(filters)
    }
}

impl fmt::Display for Filters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        write!(f, "{}", parts.join(","))
    }
}

/// Sort direction passed to the API as `sort_order`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
