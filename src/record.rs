// 🧾 Records - raw extract rows and the enriched registration record
// Raw cells are kept verbatim; derived fields are filled by the pipeline stages.

use crate::fake_score::FakeAssessment;
use crate::status::PregnancyStatus;
use chrono::NaiveDate;
use std::collections::HashMap;

// ============================================================================
// COLUMN NAMES
// ============================================================================

pub const COL_MOBILE: &str = "Mobile";
pub const COL_FIRST_NAME: &str = "FirstName";
pub const COL_S1: &str = "S1";
pub const COL_S2: &str = "S2";
pub const COL_YEAR: &str = "Year";
pub const COL_MONTH: &str = "Month";
/// Second `Month` header of an extract, after duplicate-header suffixing
pub const COL_MONTH_NUMERIC: &str = "Month.1";
pub const COL_DAY: &str = "Day";
pub const COL_DATE: &str = "Date";
pub const COL_SOURCE_FILE: &str = "Source_File";

/// Columns the scoring rules cannot run without
pub const REQUIRED_COLUMNS: [&str; 2] = [COL_MOBILE, COL_FIRST_NAME];

/// Derived columns, in the order the stages produce them
pub const DERIVED_COLUMNS: [&str; 9] = [
    "Mobile_norm",
    "Register_Date",
    "Pregnancy_Status",
    "Predicted_Giving_Birth_Date",
    "Child_Age_Months",
    "Fake_Score",
    "Confidence_Label",
    "Sales_Ready",
    "Fake_Reasons",
];

/// Columns the pipeline writes itself; an extract's copy is discarded
pub fn is_reserved_column(name: &str) -> bool {
    name == COL_SOURCE_FILE || DERIVED_COLUMNS.contains(&name)
}

// ============================================================================
// RAW INPUT
// ============================================================================

/// One row of a source extract
///
/// Empty cells are treated as null and never stored, so `get` answers the
/// presence question directly.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRow {
    /// 1-indexed line in the source file (header is line 1)
    pub line_number: usize,
    pub cells: HashMap<String, String>,
}

impl RawRow {
    pub fn new(line_number: usize) -> Self {
        RawRow {
            line_number,
            cells: HashMap::new(),
        }
    }

    /// Builder pattern: add a cell, dropping empty values
    pub fn with_cell(mut self, column: &str, value: &str) -> Self {
        self.set(column, value);
        self
    }

    pub fn set(&mut self, column: &str, value: &str) {
        if value.is_empty() {
            self.cells.remove(column);
        } else {
            self.cells.insert(column.to_string(), value.to_string());
        }
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.cells.get(column).map(|s| s.as_str())
    }
}

/// One source extract: provenance label, header order and rows
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawBatch {
    /// File name the rows came from
    pub source_file: String,
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
}

impl RawBatch {
    pub fn new(source_file: &str, headers: Vec<String>) -> Self {
        RawBatch {
            source_file: source_file.to_string(),
            headers,
            rows: Vec::new(),
        }
    }

    /// Builder pattern: append a row
    pub fn with_row(mut self, row: RawRow) -> Self {
        self.rows.push(row);
        self
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ============================================================================
// RECORD
// ============================================================================

/// A registration entry flowing through the pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    // Provenance
    pub source_file: String,
    pub line_number: usize,

    /// Original cells, untouched after merge
    pub cells: HashMap<String, String>,

    // Derived (one owning stage each)
    pub mobile_norm: String,
    pub register_date: Option<NaiveDate>,
    pub status: PregnancyStatus,
    pub predicted_birth_date: Option<NaiveDate>,
    pub child_age_months: Option<f64>,
    pub assessment: Option<FakeAssessment>,
}

impl Record {
    /// Build an un-enriched record from a raw row
    pub fn from_raw(source_file: &str, row: RawRow) -> Self {
        let mut cells = row.cells;
        // Provenance and derived values come from the pipeline, never from
        // a stale column (re-imported master file)
        cells.retain(|column, _| !is_reserved_column(column));

        Record {
            source_file: source_file.to_string(),
            line_number: row.line_number,
            cells,
            mobile_norm: String::new(),
            register_date: None,
            status: PregnancyStatus::Unknown,
            predicted_birth_date: None,
            child_age_months: None,
            assessment: None,
        }
    }

    pub fn cell(&self, column: &str) -> Option<&str> {
        self.cells.get(column).map(|s| s.as_str())
    }

    pub fn has_cell(&self, column: &str) -> bool {
        self.cells.contains_key(column)
    }

    pub fn first_name(&self) -> Option<&str> {
        self.cell(COL_FIRST_NAME)
    }

    pub fn mobile(&self) -> Option<&str> {
        self.cell(COL_MOBILE)
    }

    /// Fake score, 0 until the record has been scored
    pub fn fake_score(&self) -> u8 {
        self.assessment.as_ref().map(|a| a.score).unwrap_or(0)
    }
}

// ============================================================================
// TESTS
// ============================================================================
