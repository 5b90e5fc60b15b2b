//! DOGE API access: transport, retries, envelope decoding and pagination.

pub mod client;
pub mod http;
pub mod pagination;
pub mod retry;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use client::ApiClient;
pub use http::{HttpTransport, Transport};
pub use pagination::{fetch_all, FetchOutcome, PageQuery, StopReason};
pub use retry::{RetryPolicy, RetryState, Sleeper, ThreadSleeper};
pub use types::{PageMeta, PageResponse, Record};
