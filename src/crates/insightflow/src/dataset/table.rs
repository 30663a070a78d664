//! Column-oriented view of a JSON record list.

use crate::error::{InsightError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

/// Inferred type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    /// Every present value is a number.
    Numeric,
    /// Every present value is a boolean.
    Boolean,
    /// Text, mixed values, or nothing but nulls.
    Categorical,
}

/// A single cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Number(f64),
    Bool(bool),
    Text(String),
}

impl Cell {
    fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => Cell::Null,
            Value::Bool(b) => Cell::Bool(*b),
            Value::Number(n) => n.as_f64().map(Cell::Number).unwrap_or(Cell::Null),
            Value::String(s) => Cell::Text(s.clone()),
            other => Cell::Text(other.to_string()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    /// Label used when counting categories; `None` for nulls.
    pub fn label(&self) -> Option<String> {
        match self {
            Cell::Null => None,
            Cell::Number(n) => Some(format_number(*n)),
            Cell::Bool(b) => Some(b.to_string()),
            Cell::Text(s) => Some(s.clone()),
        }
    }
}

/// Render integral floats without a trailing `.0`.
pub(crate) fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// A named column and its cells, one per row.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    kind: ColumnKind,
    cells: Vec<Cell>,
}

impl Column {
    fn new(name: String, cells: Vec<Cell>) -> Self {
        let kind = infer_kind(&cells);
        Self { name, kind, cells }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ColumnKind {
        self.kind
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn null_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_null()).count()
    }

    /// Non-null cell count.
    pub fn count(&self) -> usize {
        self.cells.len() - self.null_count()
    }

    /// Numeric values in row order, nulls and non-numbers skipped.
    pub fn numeric_values(&self) -> Vec<f64> {
        self.cells
            .iter()
            .filter_map(|c| match c {
                Cell::Number(n) => Some(*n),
                _ => None,
            })
            .collect()
    }

    /// Row-aligned numeric values, `None` where the cell is not a number.
    pub fn numeric_cells(&self) -> Vec<Option<f64>> {
        self.cells
            .iter()
            .map(|c| match c {
                Cell::Number(n) => Some(*n),
                _ => None,
            })
            .collect()
    }
}

fn infer_kind(cells: &[Cell]) -> ColumnKind {
    let mut present = cells.iter().filter(|c| !c.is_null()).peekable();
    if present.peek().is_none() {
        return ColumnKind::Categorical;
    }

    let mut all_numbers = true;
    let mut all_bools = true;
    for cell in present {
        all_numbers &= matches!(cell, Cell::Number(_));
        all_bools &= matches!(cell, Cell::Bool(_));
    }

    if all_numbers {
        ColumnKind::Numeric
    } else if all_bools {
        ColumnKind::Boolean
    } else {
        ColumnKind::Categorical
    }
}

/// Tabular dataset built from a list of JSON records.
///
/// Columns are the union of record keys in first-seen order, so the first
/// record fixes the leading column order. Keys missing from a record are
/// nulls.
#[derive(Debug, Clone, PartialEq)]
pub struct TabularDataset {
    columns: Vec<Column>,
    row_count: usize,
}

impl TabularDataset {
    /// Parse either a bare record list or an object with a `data` record list.
    pub fn from_json(value: &Value) -> Result<Self> {
        match value {
            Value::Array(records) => Self::from_records(records),
            Value::Object(map) => match map.get("data") {
                Some(Value::Array(records)) => Self::from_records(records),
                Some(_) => Err(InsightError::Analysis(
                    "dataset `data` must be a list of records".to_string(),
                )),
                None => Err(InsightError::Analysis(
                    "dataset is missing a `data` list".to_string(),
                )),
            },
            _ => Err(InsightError::Analysis(
                "dataset must be a list of records".to_string(),
            )),
        }
    }

    /// Build from records; each record must be a JSON object.
    pub fn from_records(records: &[Value]) -> Result<Self> {
        if records.is_empty() {
            return Err(InsightError::Analysis("dataset contains no records".to_string()));
        }

        let mut names: Vec<String> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut rows = Vec::with_capacity(records.len());

        for (i, record) in records.iter().enumerate() {
            let Value::Object(map) = record else {
                return Err(InsightError::Analysis(format!(
                    "record {} is not an object",
                    i
                )));
            };
            for key in map.keys() {
                if !index.contains_key(key) {
                    index.insert(key.clone(), names.len());
                    names.push(key.clone());
                }
            }
            rows.push(map);
        }

        if names.is_empty() {
            return Err(InsightError::Analysis("dataset has no columns".to_string()));
        }

        let columns = names
            .into_iter()
            .map(|name| {
                let cells = rows
                    .iter()
                    .map(|row| row.get(&name).map(Cell::from_json).unwrap_or(Cell::Null))
                    .collect();
                Column::new(name, cells)
            })
            .collect();

        Ok(Self {
            columns,
            row_count: records.len(),
        })
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn numeric_columns(&self) -> Vec<&Column> {
        self.columns_of(ColumnKind::Numeric)
    }

    pub fn categorical_columns(&self) -> Vec<&Column> {
        self.columns_of(ColumnKind::Categorical)
    }

    pub fn column_types(&self) -> BTreeMap<String, ColumnKind> {
        self.columns
            .iter()
            .map(|c| (c.name.clone(), c.kind))
            .collect()
    }

    fn columns_of(&self, kind: ColumnKind) -> Vec<&Column> {
        self.columns.iter().filter(|c| c.kind == kind).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_wrapped_records() {
        let value = json!({"data": [
            {"a": 1, "b": "x"},
            {"a": 2, "b": "y"},
            {"a": 3, "b": "x"}
        ]});
        let table = TabularDataset::from_json(&value).unwrap();

        assert_eq!(table.row_count(), 3);
        assert_eq!(table.column_count(), 2);
        assert_eq!(table.columns()[0].name(), "a");
        assert_eq!(table.column("a").unwrap().kind(), ColumnKind::Numeric);
        assert_eq!(table.column("b").unwrap().kind(), ColumnKind::Categorical);
        assert_eq!(table.column("a").unwrap().numeric_values(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_kind_inference() {
        let value = json!([
            {"n": 1.5, "flag": true, "mixed": 1, "blank": null, "nested": {"k": 1}},
            {"n": null, "flag": false, "mixed": "two", "blank": null, "nested": [1]}
        ]);
        let table = TabularDataset::from_json(&value).unwrap();

        assert_eq!(table.column("n").unwrap().kind(), ColumnKind::Numeric);
        assert_eq!(table.column("flag").unwrap().kind(), ColumnKind::Boolean);
        assert_eq!(table.column("mixed").unwrap().kind(), ColumnKind::Categorical);
        assert_eq!(table.column("blank").unwrap().kind(), ColumnKind::Categorical);
        assert_eq!(table.column("nested").unwrap().kind(), ColumnKind::Categorical);
        assert_eq!(table.column("n").unwrap().null_count(), 1);
        assert_eq!(table.column("n").unwrap().count(), 1);
    }

    #[test]
    fn test_union_of_keys_fills_nulls() {
        let value = json!([{"a": 1}, {"b": "late"}]);
        let table = TabularDataset::from_json(&value).unwrap();

        assert_eq!(table.column_count(), 2);
        assert_eq!(table.column("a").unwrap().cells()[1], Cell::Null);
        assert_eq!(table.column("b").unwrap().cells()[0], Cell::Null);
    }

    #[test]
    fn test_malformed_inputs_are_analysis_errors() {
        let cases = [
            json!([]),
            json!({"data": []}),
            json!({"rows": []}),
            json!({"data": "not a list"}),
            json!("csv,text"),
            json!([1, 2, 3]),
            json!([{}, {}]),
        ];
        for case in cases {
            let err = TabularDataset::from_json(&case).unwrap_err();
            assert!(matches!(err, InsightError::Analysis(_)), "case {}", case);
        }
    }

    #[test]
    fn test_cell_labels() {
        assert_eq!(Cell::Number(3.0).label().as_deref(), Some("3"));
        assert_eq!(Cell::Number(2.5).label().as_deref(), Some("2.5"));
        assert_eq!(Cell::Bool(true).label().as_deref(), Some("true"));
        assert_eq!(Cell::Null.label(), None);
    }
}
