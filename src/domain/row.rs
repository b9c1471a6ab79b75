//! Raw spreadsheet rows and tolerant cell extraction.

use serde::{Deserialize, Serialize};

/// Loosely typed spreadsheet cell as produced by the workbook readers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    Empty,
    Text(String),
    Float(f64),
    Int(i64),
    Bool(bool),
    /// A cell holding a spreadsheet error such as `#N/A`.
    Error(String),
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

/// Values some exporters write into cells that are semantically empty.
const NULL_SENTINELS: [&str; 3] = ["nan", "none", "null"];

/// Reads column `column` of `cells` as trimmed text.
///
/// Never fails: missing columns, empty or error cells, non-finite numbers and
/// null-like sentinels all yield `default`. Integers rendered with a trailing
/// `.0` lose the suffix.
pub fn get(cells: &[CellValue], column: usize, default: &str) -> String {
    let Some(cell) = cells.get(column) else {
        return default.to_string();
    };

    let text = match cell {
        CellValue::Empty | CellValue::Error(_) => return default.to_string(),
        CellValue::Text(text) => text.trim().to_string(),
        CellValue::Float(number) => {
            if !number.is_finite() {
                return default.to_string();
            }
            number.to_string()
        }
        CellValue::Int(number) => number.to_string(),
        CellValue::Bool(flag) => flag.to_string(),
    };

    if text.is_empty()
        || NULL_SENTINELS
            .iter()
            .any(|sentinel| text.eq_ignore_ascii_case(sentinel))
    {
        return default.to_string();
    }

    strip_integral_suffix(&text)
}

fn strip_integral_suffix(text: &str) -> String {
    if let Some(integral) = text.strip_suffix(".0") {
        let digits = integral.strip_prefix('-').unwrap_or(integral);
        if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
            return integral.to_string();
        }
    }
    text.to_string()
}

/// One data row of an uploaded spreadsheet.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    /// 1-based row number as shown by spreadsheet applications.
    pub row_number: usize,
    pub cells: Vec<CellValue>,
}

impl RawRow {
    pub fn new(row_number: usize, cells: Vec<CellValue>) -> Self {
        Self { row_number, cells }
    }

    /// Trimmed text of a column, empty when missing.
    pub fn text(&self, column: usize) -> String {
        get(&self.cells, column, "")
    }

    pub fn is_blank(&self) -> bool {
        (0..self.cells.len()).all(|column| self.text(column).is_empty())
    }
}
