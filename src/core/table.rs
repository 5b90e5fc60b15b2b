//! Tabular view of flattened rows.

use std::collections::HashSet;

use serde_json::Value;

use super::flatten::{flatten, FlatRow};
use crate::api::types::Record;

/// Rows plus the union of their columns in first-seen order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<FlatRow>,
}

impl Table {
    pub fn from_rows(rows: Vec<FlatRow>) -> Self {
        let mut seen = HashSet::new();
        let columns: Vec<String> = rows
            .iter()
            .flat_map(|row| row.keys())
            .filter(|key| seen.insert(key.as_str()))
            .cloned()
            .collect();
        drop(seen);

        Self { columns, rows }
    }

    /// Flatten `records` and build the table.
    pub fn from_records(records: &[Record]) -> Self {
        Self::from_rows(records.iter().map(flatten).collect())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[FlatRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cells of `row` in column order; `None` where the row lacks a column.
    pub fn cells<'a>(&'a self, row: &'a FlatRow) -> impl Iterator<Item = Option<&'a Value>> + 'a {
        self.columns.iter().map(move |column| row.get(column))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> FlatRow {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_columns_are_union_in_first_seen_order() {
        let table = Table::from_rows(vec![
            row(json!({"a": 1, "b": 2})),
            row(json!({"c": 3, "a": 4})),
            row(json!({"d": 5})),
        ]);

        assert_eq!(table.columns(), &["a", "b", "c", "d"]);
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn test_missing_cells_are_none() {
        let table = Table::from_rows(vec![row(json!({"a": 1})), row(json!({"b": "x"}))]);

        let second: Vec<Option<&Value>> = table.cells(&table.rows()[1]).collect();
        assert_eq!(second, vec![None, Some(&json!("x"))]);
    }

    #[test]
    fn test_from_records_flattens() {
        let records = vec![
            json!({"id": 1, "agency": {"name": "GSA"}}),
            json!({"id": 2, "tags": ["a", "b"]}),
        ];
        let records: Vec<Record> = records
            .into_iter()
            .map(|v| v.as_object().unwrap().clone())
            .collect();

        let table = Table::from_records(&records);

        assert_eq!(table.columns(), &["id", "agency.name", "tags"]);
        assert_eq!(table.rows()[1]["tags"], "a,b");
    }

    #[test]
    fn test_empty_table() {
        let table = Table::from_records(&[]);
        assert!(table.is_empty());
        assert!(table.columns().is_empty());
    }
}
