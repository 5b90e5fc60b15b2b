//! Pagination driver tests over a scripted transport

use super::*;
use crate::api::testing::{client, failure, grants, page};
use crate::error::RequestErrorKind;
use serde_json::json;

fn ids(outcome: &FetchOutcome) -> Vec<u64> {
    outcome
        .records
        .iter()
        .map(|r| r["id"].as_u64().unwrap())
        .collect()
}

#[test]
fn test_concatenates_pages_in_order_and_stops_at_last_page() {
    let client = client(
        vec![
            page("grants", grants(0, 2), 6, 3),
            page("grants", grants(2, 2), 6, 3),
            page("grants", grants(4, 2), 6, 3),
        ],
        1,
    );

    let outcome = fetch_all(&client, Dataset::Grants, &PageQuery::default()).unwrap();

    assert_eq!(ids(&outcome), vec![0, 1, 2, 3, 4, 5]);
    assert_eq!(outcome.pages_fetched, 3);
    assert_eq!(outcome.stop_reason, StopReason::LastPage);
    assert_eq!(outcome.total_results, Some(6));
    assert_eq!(outcome.total_pages, Some(3));
    assert!(!outcome.is_truncated());
    assert_eq!(client.transport().call_count(), 3);
}

#[test]
fn test_stops_on_empty_page_without_meta() {
    let client = client(
        vec![
            Ok(json!({"success": true, "result": {"contracts": grants(0, 3)}})),
            Ok(json!({"success": true, "result": {"contracts": grants(3, 1)}})),
            Ok(json!({"success": true, "result": {"contracts": []}})),
            page("contracts", grants(10, 5), 0, 0),
        ],
        1,
    );

    let outcome = fetch_all(&client, Dataset::Contracts, &PageQuery::default()).unwrap();

    assert_eq!(ids(&outcome), vec![0, 1, 2, 3]);
    assert_eq!(outcome.stop_reason, StopReason::EmptyPage);
    assert_eq!(outcome.pages_fetched, 3);
    assert_eq!(client.transport().call_count(), 3);
}

#[test]
fn test_empty_first_page_is_success() {
    let client = client(vec![page("leases", vec![], 0, 0)], 1);

    let outcome = fetch_all(&client, Dataset::Leases, &PageQuery::default()).unwrap();

    assert!(outcome.records.is_empty());
    assert_eq!(outcome.stop_reason, StopReason::EmptyPage);
}

#[test]
fn test_record_cap_truncates_and_stops() {
    let client = client(
        vec![
            page("grants", grants(0, 4), 100, 25),
            page("grants", grants(4, 4), 100, 25),
        ],
        1,
    );
    let query = PageQuery {
        max_records: Some(6),
        ..PageQuery::default()
    };

    let outcome = fetch_all(&client, Dataset::Grants, &query).unwrap();

    assert_eq!(ids(&outcome), vec![0, 1, 2, 3, 4, 5]);
    assert_eq!(outcome.stop_reason, StopReason::RecordLimit);
    assert!(!outcome.is_truncated());
    assert_eq!(client.transport().call_count(), 2);
}

#[test]
fn test_page_limit() {
    let client = client(
        vec![
            page("grants", grants(0, 1), 1000, 1000),
            page("grants", grants(1, 1), 1000, 1000),
            page("grants", grants(2, 1), 1000, 1000),
        ],
        1,
    );
    let query = PageQuery {
        max_pages: 2,
        ..PageQuery::default()
    };

    let outcome = fetch_all(&client, Dataset::Grants, &query).unwrap();

    assert_eq!(outcome.records.len(), 2);
    assert_eq!(outcome.stop_reason, StopReason::PageLimit);
    assert!(outcome.is_truncated());
    assert!(outcome.truncation_reason().unwrap().contains("page limit"));
}

#[test]
fn test_first_page_failure_fails_dataset() {
    let client = client(vec![failure(RequestErrorKind::HttpStatus(404))], 3);

    let err = fetch_all(&client, Dataset::Grants, &PageQuery::default()).unwrap_err();

    assert_eq!(err.request_kind(), Some(RequestErrorKind::HttpStatus(404)));
    assert_eq!(client.transport().call_count(), 1);
}

#[test]
fn test_later_page_failure_keeps_partial_results() {
    let client = client(
        vec![
            page("grants", grants(0, 2), 6, 3),
            failure(RequestErrorKind::HttpStatus(503)),
            failure(RequestErrorKind::HttpStatus(503)),
        ],
        2,
    );

    let outcome = fetch_all(&client, Dataset::Grants, &PageQuery::default()).unwrap();

    assert_eq!(ids(&outcome), vec![0, 1]);
    assert!(outcome.is_truncated());
    match &outcome.stop_reason {
        StopReason::RetriesExhausted { page, error } => {
            assert_eq!(*page, 2);
            assert!(error.contains("HTTP 503"));
        }
        other => panic!("Expected RetriesExhausted, got {:?}", other),
    }
    assert!(outcome.truncation_reason().unwrap().contains("page 2"));
}

#[test]
fn test_invalid_envelope_on_later_page_fails_dataset() {
    let client = client(
        vec![
            page("grants", grants(0, 2), 6, 3),
            Ok(json!({"success": false})),
        ],
        1,
    );

    let err = fetch_all(&client, Dataset::Grants, &PageQuery::default()).unwrap_err();
    assert!(matches!(err, DogeError::InvalidResponse { .. }));
}

#[test]
fn test_auth_error_on_later_page_fails_dataset() {
    let client = client(
        vec![
            page("grants", grants(0, 2), 6, 3),
            Err(DogeError::Auth {
                status: 401,
                url: "http://scripted/savings/grants".to_string(),
            }),
        ],
        3,
    );

    let err = fetch_all(&client, Dataset::Grants, &PageQuery::default()).unwrap_err();
    assert!(matches!(err, DogeError::Auth { status: 401, .. }));
}

#[test]
fn test_transient_failure_is_retried_within_a_page() {
    let client = client(
        vec![
            failure(RequestErrorKind::Timeout),
            page("grants", grants(0, 2), 2, 1),
        ],
        3,
    );

    let outcome = fetch_all(&client, Dataset::Grants, &PageQuery::default()).unwrap();

    assert_eq!(outcome.records.len(), 2);
    assert_eq!(outcome.pages_fetched, 1);
    assert_eq!(client.transport().call_count(), 2);
}

#[test]
fn test_request_parameters() {
    let client = client(
        vec![
            page("grants", grants(0, 1), 2, 2),
            page("grants", grants(1, 1), 2, 2),
        ],
        1,
    );
    let query = PageQuery {
        filters: "agency=GSA".parse().unwrap(),
        page_size: 25,
        ..PageQuery::default()
    };

    fetch_all(&client, Dataset::Grants, &query).unwrap();

    let transport = client.transport();
    assert_eq!(transport.calls.borrow()[0].0, "/savings/grants");
    assert_eq!(transport.param(0, "sort_by").as_deref(), Some("savings"));
    assert_eq!(transport.param(0, "sort_order").as_deref(), Some("desc"));
    assert_eq!(transport.param(0, "agency").as_deref(), Some("GSA"));
    assert_eq!(transport.param(0, "page").as_deref(), Some("1"));
    assert_eq!(transport.param(0, "per_page").as_deref(), Some("25"));
    assert_eq!(transport.param(1, "page").as_deref(), Some("2"));
}

#[test]
fn test_filters_override_sort_but_not_paging() {
    let query = PageQuery {
        filters: "sort_by=value,sort_order=asc,page=9,per_page=1".parse().unwrap(),
        ..PageQuery::default()
    };

    let params = query.params(Dataset::Leases, 3);

    let keys: Vec<&str> = params.iter().map(|(k, _)| k.as_str()).collect();
    assert_eq!(keys, vec!["sort_by", "sort_order", "page", "per_page"]);
    assert_eq!(params[0].1, "value");
    assert_eq!(params[1].1, "asc");
    assert_eq!(params[2].1, "3");
    assert_eq!(params[3].1, "100");
}

#[test]
fn test_sort_overrides_and_legacy_default_sort_key() {
    let query = PageQuery::default();
    assert_eq!(query.params(Dataset::Employees, 1)[0].1, "employee_id");

    let query = PageQuery {
        sort_by: Some("date".to_string()),
        sort_order: SortOrder::Asc,
        ..PageQuery::default()
    };
    let params = query.params(Dataset::Grants, 1);
    assert_eq!(params[0], ("sort_by".to_string(), "date".to_string()));
    assert_eq!(params[1], ("sort_order".to_string(), "asc".to_string()));
}

#[test]
fn test_query_from_config() {
    let config = Config {
        batch_size: 5000,
        max_records: Some(10),
        ..Config::default()
    };
    let query = PageQuery::from_config(&config);
    assert_eq!(query.page_size, 500);
    assert_eq!(query.max_records, Some(10));
    assert_eq!(query.max_pages, MAX_PAGES);
}
