//! Placement Store
//!
//! SQLite file holding a single `students` table. The file is written once by
//! ingestion and opened read-only for every query afterwards.

use crate::error::{AssistantError, Result};
use rusqlite::{params, Connection, OpenFlags};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const TABLE_NAME: &str = "students";

/// Columns that may be asked for distinct values
pub const ENTITY_COLUMNS: [&str; 2] = ["Company", "Department"];

/// One placed student. Only placed students are stored, so `placed` is always "Yes".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentPlacementRecord {
    pub department: String,
    pub placed: String,
    pub company: String,
    pub designation: String,
    /// Package in lakhs per annum
    pub ctc_lpa: f64,
}

impl StudentPlacementRecord {
    pub fn placed(department: &str, company: &str, designation: &str, ctc_lpa: f64) -> Self {
        Self {
            department: department.to_string(),
            placed: "Yes".to_string(),
            company: company.to_string(),
            designation: designation.to_string(),
            ctc_lpa,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PlacementStore {
    path: PathBuf,
}

impl PlacementStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Open the store without write access
    pub fn open_read_only(&self) -> Result<Connection> {
        Connection::open_with_flags(
            &self.path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| AssistantError::Store(format!("Failed to open {}: {}", self.path.display(), e)))
    }

    /// Create the store file and write all records in one transaction.
    /// Any existing `students` table is replaced.
    pub fn create(&self, records: &[StudentPlacementRecord]) -> Result<usize> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut db = Connection::open(&self.path)?;
        let tx = db.transaction()?;

        tx.execute(&format!("DROP TABLE IF EXISTS {}", TABLE_NAME), [])?;
        tx.execute(
            &format!(
                r#"
                CREATE TABLE {} (
                    Department TEXT,
                    Placed TEXT,
                    Company TEXT,
                    Designation TEXT,
                    CTC_LPA REAL
                )
                "#,
                TABLE_NAME
            ),
            [],
        )?;

        {
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO {} (Department, Placed, Company, Designation, CTC_LPA) VALUES (?1, ?2, ?3, ?4, ?5)",
                TABLE_NAME
            ))?;
            for record in records {
                stmt.execute(params![
                    record.department,
                    record.placed,
                    record.company,
                    record.designation,
                    record.ctc_lpa,
                ])?;
            }
        }

        tx.commit()?;
        Ok(records.len())
    }

    /// Distinct non-null values of an entity column, in first-occurrence order
    pub fn distinct_values(&self, column: &str) -> Result<Vec<String>> {
        if !ENTITY_COLUMNS.contains(&column) {
            return Err(AssistantError::Store(format!(
                "Distinct values are only available for {:?}, not '{}'",
                ENTITY_COLUMNS, column
            )));
        }

        let db = self.open_read_only()?;
        let mut stmt = db.prepare(&format!(
            "SELECT {col} FROM {table} WHERE {col} IS NOT NULL GROUP BY {col} ORDER BY MIN(rowid)",
            col = column,
            table = TABLE_NAME
        ))?;
        let values = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(values)
    }

    pub fn row_count(&self) -> Result<usize> {
        let db = self.open_read_only()?;
        let count: i64 = db.query_row(&format!("SELECT COUNT(*) FROM {}", TABLE_NAME), [], |row| {
            row.get(0)
        })?;
        Ok(count as usize)
    }
}
