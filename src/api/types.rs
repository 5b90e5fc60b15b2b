use serde::Deserialize;
use serde_json::{Map, Value};

use crate::cli::types::dataset::result_key_for_endpoint;
use crate::error::{DogeError, Result};


/// One item returned by the API. Fields vary per dataset, so records stay
/// open mappings.
pub type Record = Map<String, Value>;

/// Pagination metadata from the envelope's `meta` object.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct PageMeta {
    #[serde(default)]
    pub total_results: Option<u64>,
    #[serde(default)]
    pub pages: Option<u64>,
}

/// One decoded page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageResponse {
    pub success: bool,
    pub records: Vec<Record>,
    pub meta: PageMeta,
}

/// Top-level envelope: `{success, result: {<dataset>: [...]}, meta}`.
/// `data` is the pre-savings layout, still answered by legacy endpoints.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default = "default_success")]
    success: bool,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    meta: Option<PageMeta>,
}

fn default_success() -> bool {
    true
}

impl PageResponse {
    /// Decode a response body fetched from `endpoint`.
    ///
    /// The record list is looked up under `result.<last endpoint segment>`;
    /// if that key is absent but `result` holds exactly one list, that list
    /// is used. A bare `result` list, a legacy `data` list and a top-level
    /// array are accepted as well.
    pub fn from_value(value: Value, endpoint: &str, url: &str) -> Result<Self> {
        let invalid = |reason: String| DogeError::InvalidResponse {
            url: url.to_string(),
            reason,
        };

        let envelope = match value {
            Value::Array(items) => {
                return Ok(Self {
                    success: true,
                    records: into_records(items).map_err(invalid)?,
                    meta: PageMeta::default(),
                })
            }
            Value::Object(_) => serde_json::from_value::<Envelope>(value)
                .map_err(|e| invalid(format!("unexpected envelope: {}", e)))?,
            other => {
                return Err(invalid(format!(
                    "expected a JSON object, got {}",
                    json_type_name(&other)
                )))
            }
        };

        if !envelope.success {
            return Err(invalid("API reported success=false".to_string()));
        }

        let items = match (envelope.result, envelope.data) {
            (Some(Value::Object(mut result)), _) => {
                let key = result_key_for_endpoint(endpoint);
                match result.remove(key) {
                    Some(Value::Array(items)) => items,
                    Some(other) => {
                        return Err(invalid(format!(
                            "'result.{}' is {}, expected a list",
                            key,
                            json_type_name(&other)
                        )))
                    }
                    None => single_list(result)
                        .ok_or_else(|| invalid(format!("'result' has no '{}' list", key)))?,
                }
            }
            (Some(Value::Array(items)), _) => items,
            (Some(other), _) => {
                return Err(invalid(format!(
                    "'result' is {}, expected an object or list",
                    json_type_name(&other)
                )))
            }
            (None, Some(Value::Array(items))) => items,
            (None, _) => return Err(invalid("missing 'result'".to_string())),
        };

        Ok(Self {
            success: envelope.success,
            records: into_records(items).map_err(invalid)?,
            meta: envelope.meta.unwrap_or_default(),
        })
    }
}

fn single_list(result: Map<String, Value>) -> Option<Vec<Value>> {
    let mut lists = result.into_iter().filter_map(|(_, v)| match v {
        Value::Array(items) => Some(items),
        _ => None,
    });
    let first = lists.next()?;
    lists.next().is_none().then_some(first)
}

fn into_records(items: Vec<Value>) -> std::result::Result<Vec<Record>, String> {
    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::Object(record) => Ok(record),
            other => Err(format!(
                "record {} is {}, expected an object",
                i,
                json_type_name(&other)
            )),
        })
        .collect()
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}
