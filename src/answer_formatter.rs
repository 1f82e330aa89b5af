//! Answer Formatter
//!
//! Turns a query result into the sentence (or table) shown to the user.
//! Single-column results are classified by their column name: a name
//! containing "count" is a count, one containing "ctc", "max" or "avg" is a
//! package figure, anything else is echoed raw. Count is checked first.

use crate::sql_engine::TabularResult;
use itertools::Itertools;

pub const NO_DATA_MESSAGE: &str = "No placement data found.";

/// What a single-column result represents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultKind {
    Count,
    Aggregate,
    Raw,
}

impl ResultKind {
    pub fn from_column(name: &str) -> Self {
        let name = name.to_lowercase();
        if name.contains("count") {
            ResultKind::Count
        } else if ["ctc", "max", "avg"].iter().any(|p| name.contains(*p)) {
            ResultKind::Aggregate
        } else {
            ResultKind::Raw
        }
    }
}

pub fn format_answer(
    result: &TabularResult,
    matched_company: Option<&str>,
    matched_department: Option<&str>,
) -> String {
    if result.is_empty() {
        return NO_DATA_MESSAGE.to_string();
    }

    if result.columns.len() == 1 {
        let value = result.scalar().map(|v| v.to_string()).unwrap_or_default();
        return format_single_value(
            ResultKind::from_column(&result.columns[0]),
            &value,
            matched_company,
            matched_department,
        );
    }

    render_table(result)
}

fn format_single_value(
    kind: ResultKind,
    value: &str,
    matched_company: Option<&str>,
    matched_department: Option<&str>,
) -> String {
    match (kind, matched_company, matched_department) {
        (ResultKind::Count, Some(company), _) => format!("{} students were placed in {}.", value, company),
        (ResultKind::Count, None, Some(dept)) => format!("{} students were placed from {}.", value, dept),
        (ResultKind::Count, None, None) => format!("{} students were placed.", value),
        (ResultKind::Aggregate, Some(company), _) => format!("The CTC offered by {} is {} LPA.", company, value),
        (ResultKind::Aggregate, None, Some(dept)) => format!("The CTC for {} is {} LPA.", dept, value),
        (ResultKind::Aggregate, None, None) => format!("The CTC is {} LPA.", value),
        (ResultKind::Raw, _, _) => value.to_string(),
    }
}

/// Plain-text table: header line then one line per row, columns
/// right-aligned to their widest cell, no row index.
pub fn render_table(result: &TabularResult) -> String {
    let cells: Vec<Vec<String>> = result
        .rows
        .iter()
        .map(|row| row.iter().map(|v| v.to_string()).collect())
        .collect();

    let widths: Vec<usize> = result
        .columns
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            cells
                .iter()
                .filter_map(|row| row.get(idx))
                .map(|c| c.chars().count())
                .chain(std::iter::once(name.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let header: Vec<&str> = result.columns.iter().map(|c| c.as_str()).collect();
    std::iter::once(render_line(&header, &widths))
        .chain(cells.iter().map(|row| {
            let row: Vec<&str> = row.iter().map(|c| c.as_str()).collect();
            render_line(&row, &widths)
        }))
        .join("\n")
}

fn render_line(values: &[&str], widths: &[usize]) -> String {
    values
        .iter()
        .zip(widths)
        .map(|(v, w)| format!("{:>width$}", v, width = *w))
        .join(" ")
}
