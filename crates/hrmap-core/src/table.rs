//! Core table types for representing loaded source sheets

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A named, immutable table: ordered columns plus rows
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Table {
    /// Table (sheet) name, e.g. "PA0002" or "Mapping"
    pub name: String,
    /// Column definitions
    pub columns: Vec<Column>,
    /// Row data
    pub rows: Vec<Row>,
    /// Source file path, if loaded from disk
    pub source_path: Option<PathBuf>,
}

impl Table {
    /// Create a new empty table
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            rows: Vec::new(),
            source_path: None,
        }
    }

    /// Create an empty table with the given column names
    pub fn with_columns<S: AsRef<str>>(name: impl Into<String>, columns: &[S]) -> Self {
        let mut table = Self::new(name);
        table.columns = columns
            .iter()
            .enumerate()
            .map(|(i, c)| Column::new(c.as_ref().to_string(), i))
            .collect();
        table
    }

    /// Append a row, padding or truncating it to the column count
    pub fn push_row(&mut self, mut cells: Vec<CellValue>) {
        cells.resize(self.columns.len(), CellValue::Empty);
        self.rows.push(Row::new(cells));
    }

    /// Get the number of columns
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Get the number of rows
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Find a column by exact name
    pub fn find_column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Find a column tolerating case variants of the name.
    ///
    /// Prefers the name as given, then its upper-case spelling, then its
    /// lower-case spelling, then any case-insensitive match.
    pub fn find_column_tolerant(&self, name: &str) -> Option<&Column> {
        let name = name.trim();
        self.find_column(name)
            .or_else(|| self.find_spelling(name, |b| !b.is_ascii_lowercase()))
            .or_else(|| self.find_spelling(name, |b| !b.is_ascii_uppercase()))
            .or_else(|| {
                self.columns
                    .iter()
                    .find(|c| c.name.trim().eq_ignore_ascii_case(name))
            })
    }

    fn find_spelling(&self, name: &str, spelled: impl Fn(u8) -> bool) -> Option<&Column> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name) && c.name.bytes().all(&spelled))
    }

    /// Lower-cased column names, in column order
    pub fn lowercase_column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.to_lowercase()).collect()
    }

    /// Borrow a row together with this table for name-based cell access
    pub fn row_ref(&self, index: usize) -> Option<RowRef<'_>> {
        self.rows.get(index).map(|row| RowRef { table: self, row })
    }
}

/// A column definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Column {
    /// Column name as it appears in the header
    pub name: String,
    /// Column index (0-based)
    pub index: usize,
}

impl Column {
    /// Create a new column
    pub fn new(name: String, index: usize) -> Self {
        Self { name, index }
    }
}

/// A row of data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Row {
    /// Cell values for each column
    pub cells: Vec<CellValue>,
}

impl Row {
    /// Create a new row
    pub fn new(cells: Vec<CellValue>) -> Self {
        Self { cells }
    }

    /// Get a cell value by column index
    pub fn get(&self, index: usize) -> Option<&CellValue> {
        self.cells.get(index)
    }
}

/// A row borrowed with its table, so cells can be read by column name
#[derive(Debug, Clone, Copy)]
pub struct RowRef<'a> {
    pub table: &'a Table,
    pub row: &'a Row,
}

impl<'a> RowRef<'a> {
    /// Read a cell by column name, tolerating case variants.
    ///
    /// Returns `None` when the column does not exist; a present column
    /// yields its cell even if that cell is null.
    pub fn get(&self, column: &str) -> Option<&'a CellValue> {
        let col = self.table.find_column_tolerant(column)?;
        self.row.get(col.index)
    }

    /// Read a cell by column index
    pub fn cell(&self, index: usize) -> Option<&'a CellValue> {
        self.row.get(index)
    }
}

/// A cell value with type detection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    /// Integer value
    Integer(i64),
    /// Floating-point value
    Float(f64),
    /// String value
    String(String),
    /// Empty/null cell
    Empty,
}

impl CellValue {
    /// Parse a string into a CellValue, detecting the type.
    ///
    /// Numbers are only detected when their canonical rendering matches the
    /// source text, so codes like "0010" or "+49 30 1234" stay strings.
    pub fn parse(s: &str) -> Self {
        let trimmed = s.trim();

        if trimmed.is_empty() {
            return CellValue::Empty;
        }

        if let Ok(i) = trimmed.parse::<i64>() {
            if i.to_string() == trimmed {
                return CellValue::Integer(i);
            }
            return CellValue::String(trimmed.to_string());
        }

        if let Ok(f) = trimmed.parse::<f64>() {
            if f.is_finite() && f.to_string() == trimmed {
                return CellValue::Float(f);
            }
        }

        CellValue::String(trimmed.to_string())
    }

    /// Check if the cell is empty
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Check if the cell carries no value (empty or NaN)
    pub fn is_null(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Float(f) => f.is_nan(),
            _ => false,
        }
    }

    /// Convert to a display string
    pub fn to_string_value(&self) -> String {
        match self {
            CellValue::Integer(i) => i.to_string(),
            CellValue::Float(f) => f.to_string(),
            CellValue::String(s) => s.clone(),
            CellValue::Empty => String::new(),
        }
    }

    /// Canonical key form used for entity ids and subtype codes.
    ///
    /// Text "1001", integer 1001, float 1001.0 and text "00001001" all map to
    /// "1001". Null cells have no key.
    pub fn canonical_key(&self) -> Option<String> {
        match self {
            CellValue::Empty => None,
            CellValue::Integer(i) => Some(i.to_string()),
            CellValue::Float(f) if f.is_nan() => None,
            CellValue::Float(f) => Some(float_key(*f)),
            CellValue::String(s) => canonical_key_str(s),
        }
    }
}

/// Canonical key form of a textual id or code. See [`CellValue::canonical_key`].
pub fn canonical_key_str(s: &str) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }

    if trimmed.bytes().all(|b| b.is_ascii_digit()) {
        let stripped = trimmed.trim_start_matches('0');
        return Some(if stripped.is_empty() { "0" } else { stripped }.to_string());
    }

    // "1001.0" as written by spreadsheet exports
    if let Ok(f) = trimmed.parse::<f64>() {
        if f.is_finite() && f.fract() == 0.0 && trimmed.contains('.') {
            return Some(float_key(f));
        }
    }

    Some(trimmed.to_string())
}

fn float_key(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
        (f as i64).to_string()
    } else {
        f.to_string()
    }
}

impl std::fmt::Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CellValue::Integer(i) => write!(f, "{}", i),
            CellValue::Float(fl) => write!(f, "{}", fl),
            CellValue::String(s) => write!(f, "{}", s),
            CellValue::Empty => write!(f, ""),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::parse(s)
    }
}
