//! In-memory transport and sleeper for unit tests.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::time::Duration;

use serde_json::{json, Value};

use super::http::Transport;
use super::retry::{RetryPolicy, Sleeper};
use super::ApiClient;
use crate::error::{RequestError, RequestErrorKind, Result};

/// Replays scripted responses in order and records every request.
#[derive(Default)]
pub struct ScriptedTransport {
    responses: RefCell<VecDeque<Result<Value>>>,
    pub calls: RefCell<Vec<(String, Vec<(String, String)>)>>,
}

impl ScriptedTransport {
    pub fn new(responses: Vec<Result<Value>>) -> Self {
        Self {
            responses: RefCell::new(responses.into()),
            calls: RefCell::default(),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }

    /// Value of `key` in the query of call `index`.
    pub fn param(&self, index: usize, key: &str) -> Option<String> {
        self.calls.borrow()[index]
            .1
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    }
}

impl Transport for ScriptedTransport {
    fn url(&self, endpoint: &str) -> String {
        format!("http://scripted{}", endpoint)
    }

    fn get_json(&self, endpoint: &str, params: &[(String, String)]) -> Result<Value> {
        self.calls
            .borrow_mut()
            .push((endpoint.to_string(), params.to_vec()));
        self.responses
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Ok(json!({"success": true, "result": []})))
    }
}

#[derive(Default)]
pub struct NoSleep {
    pub delays: RefCell<Vec<Duration>>,
}

impl Sleeper for NoSleep {
    fn sleep(&self, duration: Duration) {
        self.delays.borrow_mut().push(duration);
    }
}

pub type TestClient = ApiClient<ScriptedTransport, NoSleep>;

pub fn client(responses: Vec<Result<Value>>, max_attempts: u32) -> TestClient {
    ApiClient::new(
        ScriptedTransport::new(responses),
        NoSleep::default(),
        RetryPolicy::new(max_attempts, Duration::from_millis(10), Duration::from_millis(100)),
    )
}

/// A savings-style page body under `key`.
pub fn page(key: &str, records: Vec<Value>, total_results: u64, pages: u64) -> Result<Value> {
    Ok(json!({
        "success": true,
        "result": { key: records },
        "meta": {"total_results": total_results, "pages": pages}
    }))
}

/// Numbered grant records `start..start + count`.
pub fn grants(start: usize, count: usize) -> Vec<Value> {
    (start..start + count)
        .map(|i| json!({"id": i, "agency": format!("Agency {}", i), "savings": i as f64 * 10.0}))
        .collect()
}

pub fn failure(kind: RequestErrorKind) -> Result<Value> {
    Err(RequestError::new(kind, "http://scripted", "scripted failure").into())
}
