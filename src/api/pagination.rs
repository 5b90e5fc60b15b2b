//! Page-by-page fetching of a whole dataset.

use tracing::{debug, info, info_span, warn};

use super::client::ApiClient;
use super::http::Transport;
use super::retry::Sleeper;
use super::types::Record;
use crate::cli::types::{Dataset, Filters, SortOrder};
use crate::config::Config;
use crate::error::{DogeError, Result};

#[cfg(test)]
mod tests;

/// Hard stop for runaway pagination.
pub const MAX_PAGES: u64 = 10_000;

/// Query parameters owned by the pagination loop; filters cannot set them.
const RESERVED_PARAMS: [&str; 2] = ["page", "per_page"];

/// What to request for one dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageQuery {
    pub filters: Filters,
    /// Overrides the dataset's default sort key.
    pub sort_by: Option<String>,
    pub sort_order: SortOrder,
    pub page_size: u32,
    /// Stop once this many records are collected. `None` means everything.
    pub max_records: Option<usize>,
    pub max_pages: u64,
}

impl Default for PageQuery {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl PageQuery {
    pub fn from_config(config: &Config) -> Self {
        Self {
            filters: Filters::new(),
            sort_by: None,
            sort_order: SortOrder::default(),
            page_size: config.page_size(),
            max_records: config.max_records,
            max_pages: MAX_PAGES,
        }
    }

    /// Query string for `page` of `dataset`: sort keys, then user filters,
    /// then the paging pair.
    pub fn params(&self, dataset: Dataset, page: u64) -> Vec<(String, String)> {
        let mut params = Filters::new();
        params.insert(
            "sort_by",
            self.sort_by
                .as_deref()
                .unwrap_or_else(|| dataset.default_sort_key()),
        );
        params.insert("sort_order", self.sort_order.as_str());
        for (key, value) in self.filters.iter() {
            if !RESERVED_PARAMS.contains(&key) {
                params.insert(key, value);
            }
        }
        params.insert("page", page.to_string());
        params.insert("per_page", self.page_size.to_string());

        params
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }
}

/// Why pagination ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// A page came back with no records.
    EmptyPage,
    /// The page number reached the reported page count.
    LastPage,
    /// The configured record cap was reached.
    RecordLimit,
    /// The safety page limit was hit.
    PageLimit,
    /// A page after the first failed for good; earlier pages are kept.
    RetriesExhausted { page: u64, error: String },
}

/// Everything collected for one dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchOutcome {
    pub records: Vec<Record>,
    pub pages_fetched: u64,
    pub total_results: Option<u64>,
    pub total_pages: Option<u64>,
    pub stop_reason: StopReason,
}

impl FetchOutcome {
    /// True when records are known to be missing because fetching stopped
    /// early for reasons other than the user's record cap.
    pub fn is_truncated(&self) -> bool {
        matches!(
            self.stop_reason,
            StopReason::RetriesExhausted { .. } | StopReason::PageLimit
        )
    }

    /// Short description of why the result is incomplete, if it is.
    pub fn truncation_reason(&self) -> Option<String> {
        match &self.stop_reason {
            StopReason::RetriesExhausted { page, error } => {
                Some(format!("stopped at page {}: {}", page, error))
            }
            StopReason::PageLimit => Some(format!(
                "stopped after {} pages (page limit)",
                self.pages_fetched
            )),
            _ => None,
        }
    }
}

/// Fetch every page of `dataset`, in order, until a stop condition holds.
///
/// Errors on the first page, and auth or envelope errors on any page, fail
/// the whole fetch. A request failure on a later page ends pagination with
/// the records gathered so far.
pub fn fetch_all<T, S>(
    client: &ApiClient<T, S>,
    dataset: Dataset,
    query: &PageQuery,
) -> Result<FetchOutcome>
where
    T: Transport,
    S: Sleeper,
{
    let span = info_span!("fetch", dataset = dataset.name());
    let _enter = span.enter();

    for key in RESERVED_PARAMS {
        if query.filters.get(key).is_some() {
            warn!(filter = key, "ignoring filter; paging parameters are managed automatically");
        }
    }

    let mut records: Vec<Record> = Vec::new();
    let mut pages_fetched = 0u64;
    let mut total_results = None;
    let mut total_pages = None;
    let mut page = 1u64;

    let stop_reason = loop {
        if page > query.max_pages {
            warn!(max_pages = query.max_pages, "page limit reached, stopping");
            break StopReason::PageLimit;
        }

        let params = query.params(dataset, page);
        let response = match info_span!("page", page)
            .in_scope(|| client.fetch(dataset.endpoint(), &params))
        {
            Ok(response) => response,
            Err(err @ DogeError::Request(_)) if page > 1 => {
                warn!(
                    page,
                    collected = records.len(),
                    error = %err,
                    "page failed after retries, keeping partial results"
                );
                break StopReason::RetriesExhausted {
                    page,
                    error: err.to_string(),
                };
            }
            Err(err) => return Err(err),
        };

        pages_fetched += 1;
        total_results = response.meta.total_results.or(total_results);
        total_pages = response.meta.pages.or(total_pages);
        debug!(
            page,
            records = response.records.len(),
            total_pages = ?total_pages,
            "page fetched"
        );

        if response.records.is_empty() {
            break StopReason::EmptyPage;
        }
        records.extend(response.records);

        if let Some(max) = query.max_records {
            if records.len() >= max {
                records.truncate(max);
                break StopReason::RecordLimit;
            }
        }

        if total_pages.is_some_and(|pages| page >= pages) {
            break StopReason::LastPage;
        }

        page += 1;
    };

    if matches!(stop_reason, StopReason::EmptyPage | StopReason::LastPage) {
        if let Some(expected) = total_results {
            if expected != records.len() as u64 {
                warn!(
                    expected,
                    collected = records.len(),
                    "collected record count differs from reported total"
                );
            }
        }
    }

    info!(
        records = records.len(),
        pages = pages_fetched,
        stop = ?stop_reason,
        "fetch complete"
    );

    Ok(FetchOutcome {
        records,
        pages_fetched,
        total_results,
        total_pages,
        stop_reason,
    })
}
