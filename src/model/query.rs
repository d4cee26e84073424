use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::borrow::Cow;

pub type QueryRow = Map<String, Value>;

/// Result of an ad-hoc query, in the order the collector returned it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    columns: Vec<String>,
    #[serde(rename = "data")]
    rows: Vec<QueryRow>,
    row_count: usize,
}

/// Raw `execute-query` response body.
#[derive(Debug, Deserialize)]
pub struct QueryResponse {
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub data: Vec<QueryRow>,
    #[serde(default)]
    pub row_count: Option<usize>,
    #[serde(default)]
    pub error: Option<String>,
}

/// A single cell: a NULL is a value the column carried, `Missing` means
/// the row had no such key at all.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CellValue<'a> {
    Missing,
    Null,
    Value(&'a Value),
}

impl CellValue<'_> {
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    pub fn to_text(&self) -> Cow<'_, str> {
        match self {
            CellValue::Missing => Cow::Borrowed(""),
            CellValue::Null => Cow::Borrowed("NULL"),
            CellValue::Value(Value::String(s)) => Cow::Borrowed(s.as_str()),
            CellValue::Value(v) => Cow::Owned(v.to_string()),
        }
    }
}

impl QueryResult {
    /// Build a result, rejecting a `row_count` that disagrees with the rows
    /// actually delivered.
    pub fn new(
        columns: Vec<String>,
        rows: Vec<QueryRow>,
        row_count: Option<usize>,
    ) -> Result<Self, String> {
        let row_count = row_count.unwrap_or(rows.len());
        if row_count != rows.len() {
            return Err(format!(
                "row_count {row_count} does not match {} returned rows",
                rows.len()
            ));
        }
        Ok(Self {
            columns,
            rows,
            row_count,
        })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[QueryRow] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn cell<'a>(row: &'a QueryRow, column: &str) -> CellValue<'a> {
        match row.get(column) {
            None => CellValue::Missing,
            Some(Value::Null) => CellValue::Null,
            Some(v) => CellValue::Value(v),
        }
    }

    /// Cells of `row` in column order.
    pub fn cells<'a>(&'a self, row: &'a QueryRow) -> impl Iterator<Item = CellValue<'a>> + 'a {
        self.columns
            .iter()
            .map(move |column| Self::cell(row, column))
    }

    /// "N row(s) returned" summary line.
    pub fn summary(&self) -> String {
        let plural = if self.row_count == 1 { "" } else { "s" };
        format!("{} row{plural} returned", self.row_count)
    }
}
