//! Retrying API client: transport + retry policy + envelope decoding.

use tracing::debug;

use super::http::{HttpTransport, Transport};
use super::retry::{RetryPolicy, Sleeper, ThreadSleeper};
use super::types::PageResponse;
use crate::config::Config;
use crate::error::Result;

#[derive(Debug, Clone)]
pub struct ApiClient<T = HttpTransport, S = ThreadSleeper> {
    transport: T,
    sleeper: S,
    policy: RetryPolicy,
}

impl ApiClient {
    /// Client talking to the configured API over HTTP with real sleeps.
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(
            HttpTransport::new(config)?,
            ThreadSleeper,
            RetryPolicy::from_config(config),
        ))
    }
}

impl<T: Transport, S: Sleeper> ApiClient<T, S> {
    pub fn new(transport: T, sleeper: S, policy: RetryPolicy) -> Self {
        Self {
            transport,
            sleeper,
            policy,
        }
    }

    #[cfg(test)]
    pub(crate) fn transport(&self) -> &T {
        &self.transport
    }

    /// Fetch and decode one page, retrying transient failures.
    pub fn fetch(&self, endpoint: &str, params: &[(String, String)]) -> Result<PageResponse> {
        let body = self
            .policy
            .run(&self.sleeper, |_| self.transport.get_json(endpoint, params))?;
        let page = PageResponse::from_value(body, endpoint, &self.transport.url(endpoint))?;
        debug!(
            endpoint,
            records = page.records.len(),
            total_results = ?page.meta.total_results,
            pages = ?page.meta.pages,
            "page decoded"
        );
        Ok(page)
    }
}
