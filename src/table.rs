//! Fully-buffered query results with column labels

use crate::result::{QueryDbError, Result};
use serde::Serialize;
use serde_json::Value;

/// Materialized rows of one query, paired with the column labels reported by the backend
///
/// Every row has exactly as many values as there are columns. The only way to build
/// a table is [`ResultTable::new`], which enforces that.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultTable {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl ResultTable {
    /// Build a table, rejecting any row whose width differs from the column count
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Self> {
        let expected = columns.len();
        if let Some(row) = rows.iter().find(|row| row.len() != expected) {
            return Err(QueryDbError::ColumnWidthMismatch {
                expected,
                got: row.len(),
            });
        }
        Ok(ResultTable { columns, rows })
    }

    /// Table for statements that produce no result columns (DDL, INSERT, ...)
    pub fn empty() -> Self {
        ResultTable {
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of columns
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Values of the first column with the given label, top to bottom
    pub fn column(&self, name: &str) -> Option<Vec<&Value>> {
        let idx = self.columns.iter().position(|col| col == name)?;
        Some(self.rows.iter().map(|row| &row[idx]).collect())
    }

    /// Rows as JSON objects keyed by column label.
    /// When labels repeat, the rightmost column wins.
    pub fn to_records(&self) -> Vec<Value> {
        self.rows
            .iter()
            .map(|row| {
                let obj: serde_json::Map<String, Value> = self
                    .columns
                    .iter()
                    .cloned()
                    .zip(row.iter().cloned())
                    .collect();
                Value::Object(obj)
            })
            .collect()
    }

    pub fn into_parts(self) -> (Vec<String>, Vec<Vec<Value>>) {
        (self.columns, self.rows)
    }
}

fn render_cell(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn write_line(f: &mut std::fmt::Formatter<'_>, cells: &[String], widths: &[usize]) -> std::fmt::Result {
    let line = cells
        .iter()
        .zip(widths)
        .map(|(cell, &width)| format!(" {cell:<width$} "))
        .collect::<Vec<_>>()
        .join("|");
    writeln!(f, "{}", line.trim_end())
}

impl std::fmt::Display for ResultTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if !self.columns.is_empty() {
            let body: Vec<Vec<String>> = self
                .rows
                .iter()
                .map(|row| row.iter().map(render_cell).collect())
                .collect();

            let widths: Vec<usize> = self
                .columns
                .iter()
                .enumerate()
                .map(|(idx, name)| {
                    body.iter()
                        .map(|cells| cells[idx].chars().count())
                        .chain(std::iter::once(name.chars().count()))
                        .max()
                        .unwrap_or(0)
                })
                .collect();

            write_line(f, &self.columns, &widths)?;
            let rule = widths
                .iter()
                .map(|width| "-".repeat(width + 2))
                .collect::<Vec<_>>()
                .join("+");
            writeln!(f, "{rule}")?;
            for cells in &body {
                write_line(f, cells, &widths)?;
            }
        }

        match self.rows.len() {
            1 => write!(f, "(1 row)"),
            n => write!(f, "({n} rows)"),
        }
    }
}
