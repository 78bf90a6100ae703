use tracing::{debug, info, instrument};

use crate::iati::tools::error::{Result, ToolError};
use crate::iati::tools::model::{CellValue, Corpus, Sheet};
use crate::iati::tools::template::{TemplateSchema, TemplateSheet};

/// Identifier column every consolidated row must carry.
pub const PRIMARY_IDENTIFIER: &str = "iati-identifier";
/// First data row (1-based) below the header and documentation rows.
pub const DEFAULT_DATA_STARTING_ROW: usize = 3;

/// Settings controlling how workbook sheets are merged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsolidationSettings {
    /// 1-based row where data begins; rows above it are never copied.
    pub data_starting_row: usize,
    /// Column whose emptiness drops a row.
    pub primary_identifier: String,
}

impl Default for ConsolidationSettings {
    fn default() -> Self {
        Self {
            data_starting_row: DEFAULT_DATA_STARTING_ROW,
            primary_identifier: PRIMARY_IDENTIFIER.to_string(),
        }
    }
}

/// A consolidated row together with the key of the workbook it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsolidatedRow {
    pub source: String,
    pub cells: Vec<CellValue>,
}

/// One template sheet merged across the whole corpus.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsolidatedTable {
    pub sheet_name: String,
    pub columns: Vec<String>,
    pub rows: Vec<ConsolidatedRow>,
}

impl ConsolidatedTable {
    fn empty(template: &TemplateSheet) -> Self {
        Self {
            sheet_name: template.name.clone(),
            columns: template.columns.clone(),
            rows: Vec::new(),
        }
    }

    /// Values of the named column, top to bottom.
    pub fn column(&self, name: &str) -> Option<Vec<&CellValue>> {
        let index = self.columns.iter().position(|column| column == name)?;
        Some(self.rows.iter().map(|row| &row.cells[index]).collect())
    }
}

/// Merges every template sheet across the corpus into one table each, in
/// template order.
///
/// Columns are matched by header name, never by position. Workbooks missing a
/// sheet or column contribute nothing for it. Rows with an empty identifier
/// and rows that are entirely empty are dropped.
#[instrument(level = "info", skip_all, fields(workbooks = corpus.len(), sheets = template.sheets().len()))]
pub fn consolidate(
    corpus: &Corpus,
    template: &TemplateSchema,
    settings: &ConsolidationSettings,
) -> Result<Vec<ConsolidatedTable>> {
    if settings.data_starting_row == 0 {
        return Err(ToolError::InvalidConfig(
            "data starting row is 1-based and must be at least 1".into(),
        ));
    }

    template
        .sheets()
        .iter()
        .map(|sheet| consolidate_sheet(corpus, sheet, settings))
        .collect()
}

fn consolidate_sheet(
    corpus: &Corpus,
    template: &TemplateSheet,
    settings: &ConsolidationSettings,
) -> Result<ConsolidatedTable> {
    let identifier = template
        .columns
        .iter()
        .position(|column| *column == settings.primary_identifier)
        .ok_or_else(|| ToolError::MissingIdentifierColumn {
            sheet: template.name.clone(),
            column: settings.primary_identifier.clone(),
        })?;

    let mut table = ConsolidatedTable::empty(template);
    for workbook in corpus.workbooks() {
        let Some(sheet) = workbook.sheet(&template.name) else {
            debug!(workbook = %workbook.key(), sheet = %template.name, "sheet absent, skipped");
            continue;
        };
        let rows = workbook_rows(sheet, &template.columns, settings.data_starting_row - 1);
        table.rows.extend(rows.into_iter().map(|cells| ConsolidatedRow {
            source: workbook.key().to_string(),
            cells,
        }));
    }

    let gathered = table.rows.len();
    table.rows.retain(|row| !row.cells[identifier].is_empty());
    table
        .rows
        .retain(|row| row.cells.iter().any(|cell| !cell.is_empty()));

    info!(
        sheet = %table.sheet_name,
        gathered,
        kept = table.rows.len(),
        "sheet consolidated"
    );
    Ok(table)
}

/// Projects one workbook sheet onto the template columns. The right-most
/// column wins when a header repeats.
fn workbook_rows(sheet: &Sheet, columns: &[String], first_data_row: usize) -> Vec<Vec<CellValue>> {
    let height = sheet.height().saturating_sub(first_data_row);
    let mut rows = vec![vec![CellValue::Empty; columns.len()]; height];

    for column in 0..sheet.width() {
        let Some(header) = sheet.header(column) else {
            continue;
        };
        let slots: Vec<usize> = columns
            .iter()
            .enumerate()
            .filter(|(_, name)| **name == header)
            .map(|(slot, _)| slot)
            .collect();
        if slots.is_empty() {
            continue;
        }

        for (row, value) in sheet.column_values(column, first_data_row).into_iter().enumerate() {
            for &slot in &slots {
                rows[row][slot] = value.clone();
            }
        }
    }

    rows
}
