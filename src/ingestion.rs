//! Placement CSV ingestion
//!
//! The source sheet has a few title lines above the real header and one row per
//! company/designation offer, with per-department placement counts. Each count
//! is expanded into that many placed-student records.

use crate::error::{AssistantError, Result};
use crate::store::{PlacementStore, StudentPlacementRecord};
use csv::{ReaderBuilder, StringRecord};
use regex::Regex;
use std::path::Path;
use tracing::{info, warn};

lazy_static::lazy_static! {
    static ref NON_NUMERIC: Regex = Regex::new(r"[^0-9.\-]").expect("valid pattern");
}

/// Department count columns of the placement sheet
pub const DEPARTMENT_COLUMNS: [&str; 22] = [
    "CSE",
    "IT",
    "CSE (AIML)",
    "AIML",
    "AIDS",
    "CSE (IOT, CS&BCT)",
    "ECE",
    "EEE",
    "MECH",
    "CIVIL",
    "CHEM",
    "Bio- Tech",
    "MCA",
    "MTech/ CSE",
    "MTech/ AIDS",
    "M.E/ Comm",
    "ME / VLSI & ESVD",
    "M.E/ PSPE",
    "M.E/ Cad/Cam",
    "ME/ Thermal",
    "ME/ Struc",
    "MBA",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestionOutcome {
    /// Store file already existed and was left untouched
    AlreadyPresent,
    Built { rows: usize },
}

/// Build the store from the CSV unless the store file already exists.
pub fn ensure_store(csv_path: &Path, store: &PlacementStore, header_row: usize) -> Result<IngestionOutcome> {
    if store.exists() {
        info!("Placement store already present at {}", store.path().display());
        return Ok(IngestionOutcome::AlreadyPresent);
    }

    info!("Loading placement CSV from {}", csv_path.display());
    let csv_text = std::fs::read_to_string(csv_path).map_err(|e| {
        AssistantError::Ingestion(format!("Failed to read {}: {}", csv_path.display(), e))
    })?;

    let records = parse_placement_csv(&csv_text, header_row)?;
    let rows = store.create(&records)?;

    info!("Placement store ready with {} rows", rows);
    Ok(IngestionOutcome::Built { rows })
}

/// Column positions resolved from the header row
struct SheetLayout {
    company: usize,
    designation: usize,
    ctc: usize,
    departments: Vec<(&'static str, usize)>,
}

impl SheetLayout {
    fn resolve(headers: &[String]) -> Result<Self> {
        let company = find_column(headers, "Company", |h| h.contains("Organ") || h.contains("Company"))?;
        let designation = find_column(headers, "Designation", |h| h.contains("Designation"))?;
        let ctc = find_column(headers, "CTC", |h| h.contains("CTC"))?;

        let departments = DEPARTMENT_COLUMNS
            .iter()
            .filter_map(|dep| headers.iter().position(|h| h.as_str() == *dep).map(|idx| (*dep, idx)))
            .collect::<Vec<_>>();

        if departments.is_empty() {
            warn!("No department count columns found in placement sheet");
        }

        Ok(Self {
            company,
            designation,
            ctc,
            departments,
        })
    }
}

fn find_column(headers: &[String], label: &str, pred: impl Fn(&str) -> bool) -> Result<usize> {
    headers.iter().position(|h| pred(h.as_str())).ok_or_else(|| {
        AssistantError::Ingestion(format!(
            "{} column not found. Available columns: {:?}",
            label, headers
        ))
    })
}

/// Expand the aggregate sheet into one record per placed student.
///
/// `header_row` is the zero-based index of the header among the sheet's
/// non-empty lines.
pub fn parse_placement_csv(csv_text: &str, header_row: usize) -> Result<Vec<StudentPlacementRecord>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(csv_text.as_bytes());

    let mut rows = rdr.records();
    let mut header: Option<StringRecord> = None;
    for _ in 0..=header_row {
        header = rows.next().transpose()?;
    }
    let header = header.ok_or_else(|| {
        AssistantError::Ingestion(format!("CSV ends before header row {}", header_row))
    })?;

    let headers: Vec<String> = header.iter().map(clean_header).collect();
    let layout = SheetLayout::resolve(&headers)?;

    let mut records = Vec::new();
    for row in rows {
        let row = row?;
        let cell = |idx: usize| row.get(idx).unwrap_or("").trim();

        let company = cell(layout.company);
        let designation = cell(layout.designation);
        let ctc_lpa = parse_ctc(cell(layout.ctc));

        for (department, idx) in &layout.departments {
            let Some(count) = parse_count(cell(*idx)) else {
                continue;
            };
            for _ in 0..count {
                records.push(StudentPlacementRecord::placed(department, company, designation, ctc_lpa));
            }
        }
    }

    Ok(records)
}

fn clean_header(raw: &str) -> String {
    raw.trim().replace('\r', "").replace('\n', " ")
}

/// Strip everything but digits, '.', '-' and parse; anything unparsable is 0.
pub fn parse_ctc(raw: &str) -> f64 {
    NON_NUMERIC
        .replace_all(raw, "")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

/// Numeric cells are truncated toward zero; blanks and text are skipped.
pub fn parse_count(raw: &str) -> Option<usize> {
    let value = raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())?;
    if value <= 0.0 {
        return Some(0);
    }
    Some(value.trunc() as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SHEET: &str = "\
Year-wise Placements 2024-25,,,,,,
In Progress,,,,,,
,,,,,,
S.No,Name of the Organization,Designation,CTC (LPA),CSE,ECE,MBA
1,Google,SDE,32 LPA,2,1,
2,Infosys,Systems Engineer,\"3,6\",1,x,3
3,Acme Corp,Analyst,N/A,0,,1
";

    #[test]
    fn test_parse_ctc() {
        assert_eq!(parse_ctc("32 LPA"), 32.0);
        assert_eq!(parse_ctc("12.5"), 12.5);
        assert_eq!(parse_ctc("N/A"), 0.0);
        assert_eq!(parse_ctc(""), 0.0);
        assert_eq!(parse_ctc("3.6-4.2"), 0.0);
    }

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count("3"), Some(3));
        assert_eq!(parse_count("2.9"), Some(2));
        assert_eq!(parse_count("-1"), Some(0));
        assert_eq!(parse_count(""), None);
        assert_eq!(parse_count("x"), None);
    }

    #[test]
    fn test_expands_counts_into_records() {
        let records = parse_placement_csv(SHEET, 3).unwrap();

        // Google: CSE 2 + ECE 1; Infosys: CSE 1 + MBA 3; Acme: MBA 1
        assert_eq!(records.len(), 8);
        assert!(records.iter().all(|r| r.placed == "Yes"));

        let google: Vec<_> = records.iter().filter(|r| r.company == "Google").collect();
        assert_eq!(google.len(), 3);
        assert!(google.iter().all(|r| r.ctc_lpa == 32.0 && r.designation == "SDE"));

        let infosys_mba = records
            .iter()
            .filter(|r| r.company == "Infosys" && r.department == "MBA")
            .count();
        assert_eq!(infosys_mba, 3);
        // "3,6" cleans to "36"
        assert!(records.iter().filter(|r| r.company == "Infosys").all(|r| r.ctc_lpa == 36.0));

        let acme = records.iter().find(|r| r.company == "Acme Corp").unwrap();
        assert_eq!(acme.ctc_lpa, 0.0);
        assert_eq!(acme.department, "MBA");
    }

    #[test]
    fn test_missing_column_is_reported() {
        let sheet = "Name,Role,CSE\nGoogle,SDE,1\n";
        let err = parse_placement_csv(sheet, 0).unwrap_err();
        match err {
            AssistantError::Ingestion(msg) => assert!(msg.contains("Company column not found")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_header_cleanup() {
        assert_eq!(clean_header(" CTC\r\n(LPA) "), "CTC (LPA)");
    }

    #[test]
    fn test_ensure_store_builds_once() {
        let temp_dir = TempDir::new().unwrap();
        let csv_path = temp_dir.path().join("placements.csv");
        std::fs::write(&csv_path, SHEET).unwrap();
        let store = PlacementStore::new(temp_dir.path().join("students.db"));

        let first = ensure_store(&csv_path, &store, 3).unwrap();
        assert_eq!(first, IngestionOutcome::Built { rows: 8 });

        // a changed source is ignored while the store exists
        std::fs::write(&csv_path, "garbage").unwrap();
        let second = ensure_store(&csv_path, &store, 3).unwrap();
        assert_eq!(second, IngestionOutcome::AlreadyPresent);
        assert_eq!(store.row_count().unwrap(), 8);
    }
}
