//! SQL Executor
//!
//! Runs a generated statement against the placement store and hands back the
//! rows as a small tabular value. Any failure (bad syntax, unknown column,
//! attempted write on the read-only connection) is logged and turned into an
//! empty result, so callers only ever see "rows" or "no rows".

use crate::error::Result;
use crate::store::PlacementStore;
use rusqlite::types::ValueRef;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, warn};

/// A single cell of a query result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => write!(f, "None"),
            CellValue::Integer(v) => write!(f, "{}", v),
            // whole floats keep one decimal: 7.0, not 7
            CellValue::Real(v) if v.is_finite() && v.fract() == 0.0 => write!(f, "{:.1}", v),
            CellValue::Real(v) => write!(f, "{}", v),
            CellValue::Text(v) => write!(f, "{}", v),
        }
    }
}

impl From<ValueRef<'_>> for CellValue {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => CellValue::Null,
            ValueRef::Integer(v) => CellValue::Integer(v),
            ValueRef::Real(v) => CellValue::Real(v),
            ValueRef::Text(bytes) => CellValue::Text(String::from_utf8_lossy(bytes).into_owned()),
            ValueRef::Blob(bytes) => CellValue::Text(format!("<{} bytes>", bytes.len())),
        }
    }
}

/// Ordered columns plus rows of cells, one cell per column
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TabularResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl TabularResult {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        Self { columns, rows }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// First column of the first row
    pub fn scalar(&self) -> Option<&CellValue> {
        self.rows.first().and_then(|row| row.first())
    }

    /// Row `idx` keyed by column name
    pub fn row_map(&self, idx: usize) -> Option<HashMap<&str, &CellValue>> {
        self.rows.get(idx).map(|row| {
            self.columns
                .iter()
                .map(|c| c.as_str())
                .zip(row.iter())
                .collect()
        })
    }
}

/// Executes statements against the placement store, one connection per call
#[derive(Debug, Clone)]
pub struct SqlExecutor {
    store: PlacementStore,
}

impl SqlExecutor {
    pub fn new(store: PlacementStore) -> Self {
        Self { store }
    }

    /// Run `sql`; errors degrade to an empty result.
    pub fn execute(&self, sql: &str) -> TabularResult {
        match self.try_execute(sql) {
            Ok(result) => {
                debug!("Query returned {} row(s)", result.row_count());
                result
            }
            Err(e) => {
                warn!("SQL execution failed, returning empty result: {}", e);
                TabularResult::empty()
            }
        }
    }

    fn try_execute(&self, sql: &str) -> Result<TabularResult> {
        let db = self.store.open_read_only()?;
        let mut stmt = db.prepare(sql)?;

        let columns: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();
        let width = columns.len();

        let mut rows = Vec::new();
        let mut cursor = stmt.query([])?;
        while let Some(row) = cursor.next()? {
            let mut cells = Vec::with_capacity(width);
            for idx in 0..width {
                cells.push(CellValue::from(row.get_ref(idx)?));
            }
            rows.push(cells);
        }

        Ok(TabularResult::new(columns, rows))
    }
}
