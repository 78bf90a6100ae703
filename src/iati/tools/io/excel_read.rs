use std::fs;
use std::path::Path;

use calamine::{DataType, Range, Reader, Xlsx, open_workbook};
use tracing::{debug, info, instrument};

use crate::iati::tools::consolidate::{ConsolidatedRow, ConsolidatedTable};
use crate::iati::tools::error::{Result, ToolError};
use crate::iati::tools::model::{CellValue, Corpus, Sheet, Workbook};

/// Reads every sheet of an `.xlsx` file. The workbook key is the file name.
pub fn read_workbook(path: &Path) -> Result<Workbook> {
    let load_error = |source: calamine::XlsxError| ToolError::Load {
        path: path.to_path_buf(),
        source,
    };

    let mut source = open_workbook::<Xlsx<_>, _>(path).map_err(load_error)?;
    let mut workbook = Workbook::new(file_key(path));

    for name in source.sheet_names().to_owned() {
        let sheet = match source.worksheet_range(&name) {
            Some(range) => Sheet::from_rows(name, range_to_rows(&range.map_err(load_error)?)),
            None => Sheet::new(name),
        };
        workbook.push_sheet(sheet);
    }

    Ok(workbook)
}

/// Loads every file of `directory` into a corpus keyed by file name.
///
/// Any file that is not a readable workbook aborts the whole load.
#[instrument(level = "info", skip_all, fields(directory = %directory.display()))]
pub fn load_corpus(directory: &Path) -> Result<Corpus> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(directory)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            paths.push(entry.path());
        }
    }
    paths.sort();

    let mut corpus = Corpus::new();
    for path in paths {
        let workbook = read_workbook(&path)?;
        debug!(workbook = %workbook.key(), sheets = workbook.sheets().len(), "workbook loaded");
        corpus.insert(workbook);
    }

    info!(workbook_count = corpus.len(), "corpus loaded");
    Ok(corpus)
}

/// Reads an exported document back as tables: the first row of each sheet is
/// the column list, every further row is data.
pub fn read_tables(path: &Path) -> Result<Vec<ConsolidatedTable>> {
    let workbook = read_workbook(path)?;
    let source = workbook.key().to_string();

    let tables = workbook
        .sheets()
        .iter()
        .map(|sheet| {
            let columns: Vec<String> = sheet
                .header_row()
                .iter()
                .map(|cell| cell.header_name().unwrap_or_default())
                .collect();
            let rows = sheet
                .rows()
                .iter()
                .skip(1)
                .map(|cells| {
                    let mut cells = cells.clone();
                    cells.resize(columns.len(), CellValue::Empty);
                    ConsolidatedRow {
                        source: source.clone(),
                        cells,
                    }
                })
                .collect();
            ConsolidatedTable {
                sheet_name: sheet.name().to_string(),
                columns,
                rows,
            }
        })
        .collect();

    Ok(tables)
}

/// Materialises a range as a grid anchored at A1, so row 0 is always the
/// spreadsheet's first row even when the used range starts lower.
fn range_to_rows(range: &Range<DataType>) -> Vec<Vec<CellValue>> {
    let Some((last_row, last_col)) = range.end() else {
        return Vec::new();
    };

    (0..=last_row)
        .map(|row| {
            (0..=last_col)
                .map(|col| {
                    range
                        .get_value((row, col))
                        .map(cell_from_data)
                        .unwrap_or_default()
                })
                .collect()
        })
        .collect()
}

fn cell_from_data(cell: &DataType) -> CellValue {
    match cell {
        DataType::Empty => CellValue::Empty,
        DataType::String(value) => CellValue::text(value.clone()),
        DataType::Float(value) => CellValue::Number(*value),
        DataType::Int(value) => CellValue::Number(*value as f64),
        DataType::Bool(value) => CellValue::Bool(*value),
        DataType::DateTime(value) => CellValue::DateTime(*value),
        other => CellValue::text(other.to_string()),
    }
}

fn file_key(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
