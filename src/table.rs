use anyhow::{anyhow, Result};
use rust_decimal::prelude::ToPrimitive as _;
use rust_decimal::Decimal;
use std::fmt;

/// A single cell of a [`RecordSet`].
///
/// Cells are auto-typed at load time the way a spreadsheet import would type
/// them: integers first, then decimals, everything else stays text. A value
/// like `"0007"` loads as `Integer(7)`; derivations that need the padded form
/// re-pad at formatting time.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Empty,
    Integer(i64),
    Decimal(Decimal),
    Text(String),
}

impl Value {
    pub fn parse(cell: &str) -> Value {
        let trimmed = cell.trim();
        if trimmed.is_empty() {
            return Value::Empty;
        }
        if let Ok(int) = trimmed.parse::<i64>() {
            return Value::Integer(int);
        }
        if let Ok(dec) = Decimal::from_str_exact(trimmed) {
            return Value::Decimal(dec);
        }
        Value::Text(cell.to_string())
    }

    pub fn text(text: impl Into<String>) -> Value {
        Value::Text(text.into())
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Value::Empty => true,
            Value::Text(text) => text.is_empty(),
            _ => false,
        }
    }

    /// Integer view of the cell, tolerating decimal-typed cells that carry an
    /// integral value (spreadsheet exports often widen ints to floats).
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(int) => Some(*int),
            Value::Decimal(dec) if dec.is_integer() => dec.to_i64(),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Empty => Ok(()),
            Value::Integer(int) => write!(f, "{}", int),
            Value::Decimal(dec) => write!(f, "{}", dec),
            Value::Text(text) => write!(f, "{}", text),
        }
    }
}

/// In-memory tabular dataset: ordered, case-sensitive column names plus rows
/// of [`Value`] cells. The whole dataset is held in memory for the run.
#[derive(Debug, Clone)]
pub struct RecordSet {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl RecordSet {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn with_columns(columns: &[&str]) -> Self {
        Self::new(columns.iter().map(|c| c.to_string()).collect())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    pub fn require_column(&self, name: &str) -> Result<usize> {
        self.column_index(name)
            .ok_or_else(|| anyhow!("Missing required column {:?}", name))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    /// Appends a row, padding or truncating it to the column count.
    pub fn push_row(&mut self, mut row: Vec<Value>) {
        row.resize(self.columns.len(), Value::Empty);
        self.rows.push(row);
    }

    pub fn value(&self, row: usize, column: usize) -> &Value {
        &self.rows[row][column]
    }

    pub fn set_value(&mut self, row: usize, column: usize, value: Value) {
        self.rows[row][column] = value;
    }
}
