use std::collections::BTreeMap;
use std::collections::btree_map;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::iati::tools::error::ToolError;

/// Leading character marking a sheet or column as documentation.
pub const COMMENT_MARKER: char = '#';

/// A single cell value. `Empty` is the only value treated as null.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    /// Spreadsheet serial date-time.
    DateTime(f64),
}

impl CellValue {
    /// Builds a text cell, mapping the empty string to [`CellValue::Empty`].
    pub fn text(value: impl Into<String>) -> Self {
        let value = value.into();
        if value.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(value)
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Renders the cell as a column name. Header matching always goes through
    /// this so that extraction, substitution and consolidation agree.
    pub fn header_name(&self) -> Option<String> {
        match self {
            CellValue::Empty => None,
            other => Some(other.to_string()),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Text(value) => write!(f, "{value}"),
            CellValue::Number(value) | CellValue::DateTime(value) => write!(f, "{value}"),
            CellValue::Bool(value) => write!(f, "{value}"),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::text(value)
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::text(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Bool(value)
    }
}

/// Spreadsheet column letters (`A`, `D`, `AA`, ...) used by positional rules.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ColumnLetter(String);

impl ColumnLetter {
    /// Zero-based column index.
    pub fn index(&self) -> usize {
        let number = self
            .0
            .bytes()
            .fold(0usize, |acc, byte| acc * 26 + usize::from(byte - b'A' + 1));
        number - 1
    }

    /// Letter for a zero-based column index.
    pub fn from_index(index: usize) -> Self {
        let mut letters = Vec::new();
        let mut remaining = index + 1;
        while remaining > 0 {
            let rem = (remaining - 1) % 26;
            letters.push(char::from(b'A' + rem as u8));
            remaining = (remaining - 1) / 26;
        }
        letters.reverse();
        Self(letters.into_iter().collect())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for ColumnLetter {
    type Err = ToolError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let letters = raw.trim().to_ascii_uppercase();
        let valid = !letters.is_empty()
            && letters.len() <= 3
            && letters.bytes().all(|byte| byte.is_ascii_uppercase());
        if valid {
            Ok(Self(letters))
        } else {
            Err(ToolError::InvalidColumnLetter(raw.to_string()))
        }
    }
}

impl TryFrom<String> for ColumnLetter {
    type Error = ToolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ColumnLetter> for String {
    fn from(letter: ColumnLetter) -> Self {
        letter.0
    }
}

impl fmt::Display for ColumnLetter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A named grid of cells. Row 0 holds the headers.
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    name: String,
    rows: Vec<Vec<CellValue>>,
}

impl Sheet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rows: Vec::new(),
        }
    }

    pub fn from_rows(name: impl Into<String>, rows: Vec<Vec<CellValue>>) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    /// Number of rows, header included.
    pub fn height(&self) -> usize {
        self.rows.len()
    }

    /// Width of the widest row.
    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Number of cells in the header row.
    pub fn header_width(&self) -> usize {
        self.rows.first().map(Vec::len).unwrap_or(0)
    }

    pub fn cell(&self, row: usize, column: usize) -> Option<&CellValue> {
        self.rows.get(row).and_then(|cells| cells.get(column))
    }

    /// Writes a cell, growing the grid as needed.
    pub fn set_cell(&mut self, row: usize, column: usize, value: CellValue) {
        if self.rows.len() <= row {
            self.rows.resize_with(row + 1, Vec::new);
        }
        let cells = &mut self.rows[row];
        if cells.len() <= column {
            cells.resize(column + 1, CellValue::Empty);
        }
        cells[column] = value;
    }

    pub fn header_row(&self) -> &[CellValue] {
        self.rows.first().map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn header_row_mut(&mut self) -> Option<&mut Vec<CellValue>> {
        self.rows.first_mut()
    }

    /// Header name of the column at `column`.
    pub fn header(&self, column: usize) -> Option<String> {
        self.cell(0, column).and_then(CellValue::header_name)
    }

    /// First column whose header equals `name`.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.column_indices(name).next()
    }

    /// Every column whose header equals `name`, left to right.
    pub fn column_indices<'a>(&'a self, name: &'a str) -> impl Iterator<Item = usize> + 'a {
        self.header_row()
            .iter()
            .enumerate()
            .filter(move |(_, cell)| cell.header_name().as_deref() == Some(name))
            .map(|(index, _)| index)
    }

    /// Header name of the column at a letter position.
    pub fn header_at(&self, letter: &ColumnLetter) -> Option<String> {
        self.header(letter.index())
    }

    /// Values of `column` from row `from_row` (zero-based) to the last row.
    /// Short rows yield [`CellValue::Empty`].
    pub fn column_values(&self, column: usize, from_row: usize) -> Vec<CellValue> {
        self.rows
            .iter()
            .skip(from_row)
            .map(|cells| cells.get(column).cloned().unwrap_or_default())
            .collect()
    }

    /// Blanks every cell of `column`, header included. The slot itself stays.
    pub fn clear_column(&mut self, column: usize) {
        for cells in &mut self.rows {
            if let Some(cell) = cells.get_mut(column) {
                *cell = CellValue::Empty;
            }
        }
    }
}

/// One respondent's submitted document.
#[derive(Debug, Clone, PartialEq)]
pub struct Workbook {
    key: String,
    sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            sheets: Vec::new(),
        }
    }

    pub fn with_sheets(key: impl Into<String>, sheets: Vec<Sheet>) -> Self {
        Self {
            key: key.into(),
            sheets,
        }
    }

    /// Source key, typically the originating file name.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn push_sheet(&mut self, sheet: Sheet) {
        self.sheets.push(sheet);
    }

    pub fn sheets(&self) -> &[Sheet] {
        &self.sheets
    }

    pub fn sheets_mut(&mut self) -> impl Iterator<Item = &mut Sheet> {
        self.sheets.iter_mut()
    }

    pub fn sheet_names(&self) -> impl Iterator<Item = &str> {
        self.sheets.iter().map(Sheet::name)
    }

    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|sheet| sheet.name == name)
    }

    pub fn sheet_mut(&mut self, name: &str) -> Option<&mut Sheet> {
        self.sheets.iter_mut().find(|sheet| sheet.name == name)
    }

    /// Removes the named sheet, returning it if it was present.
    pub fn remove_sheet(&mut self, name: &str) -> Option<Sheet> {
        let position = self.sheets.iter().position(|sheet| sheet.name == name)?;
        Some(self.sheets.remove(position))
    }
}

/// Keyed collection of workbooks. Iteration is ordered by key, which fixes
/// the workbook processing order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Corpus {
    workbooks: BTreeMap<String, Workbook>,
}

impl Corpus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a workbook under its own key, replacing any previous entry.
    pub fn insert(&mut self, workbook: Workbook) -> Option<Workbook> {
        self.workbooks.insert(workbook.key.clone(), workbook)
    }

    pub fn get(&self, key: &str) -> Option<&Workbook> {
        self.workbooks.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.workbooks.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.workbooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workbooks.is_empty()
    }

    pub fn workbooks(&self) -> btree_map::Values<'_, String, Workbook> {
        self.workbooks.values()
    }

    pub fn workbooks_mut(&mut self) -> btree_map::ValuesMut<'_, String, Workbook> {
        self.workbooks.values_mut()
    }
}

impl FromIterator<Workbook> for Corpus {
    fn from_iter<I: IntoIterator<Item = Workbook>>(iter: I) -> Self {
        let mut corpus = Corpus::new();
        for workbook in iter {
            corpus.insert(workbook);
        }
        corpus
    }
}
