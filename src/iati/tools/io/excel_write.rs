use std::fs;
use std::path::Path;

use rust_xlsxwriter::{Format, Workbook as XlsxWorkbook, Worksheet};
use tracing::{debug, info, instrument};

use crate::iati::tools::config::RespondentMapping;
use crate::iati::tools::consolidate::ConsolidatedTable;
use crate::iati::tools::error::{Result, ToolError};
use crate::iati::tools::model::{CellValue, Corpus, Workbook};

const DATE_FORMAT: &str = "yyyy-mm-dd hh:mm:ss";

/// Extra column naming the respondent each consolidated row came from.
#[derive(Debug, Clone, Copy)]
pub struct Provenance<'a> {
    pub column: &'a str,
    pub mapping: &'a RespondentMapping,
}

/// Fails if something already occupies `path`.
pub fn ensure_vacant(path: &Path) -> Result<()> {
    if path.exists() {
        return Err(ToolError::OutputExists(path.to_path_buf()));
    }
    Ok(())
}

/// Writes the consolidated tables into one document, one sheet per table in
/// the given order. Never overwrites an existing file.
#[instrument(level = "info", skip_all, fields(output = %path.display(), tables = tables.len()))]
pub fn write_consolidated(
    path: &Path,
    tables: &[ConsolidatedTable],
    provenance: Option<Provenance<'_>>,
) -> Result<()> {
    ensure_vacant(path)?;

    let mut writer = XlsxWorkbook::new();
    let date_format = Format::new().set_num_format(DATE_FORMAT);

    for table in tables {
        let worksheet = writer.add_worksheet();
        worksheet.set_name(&table.sheet_name)?;

        for (col_idx, header) in table.columns.iter().enumerate() {
            worksheet.write_string(0, col_idx as u16, header)?;
        }
        let provenance_col = table.columns.len() as u16;
        if let Some(provenance) = provenance {
            worksheet.write_string(0, provenance_col, provenance.column)?;
        }

        for (row_idx, row) in table.rows.iter().enumerate() {
            let excel_row = (row_idx + 1) as u32;
            for (col_idx, cell) in row.cells.iter().enumerate() {
                write_cell(worksheet, excel_row, col_idx as u16, cell, &date_format)?;
            }
            if let Some(respondent) =
                provenance.and_then(|provenance| provenance.mapping.respondent(&row.source))
            {
                worksheet.write_string(excel_row, provenance_col, respondent)?;
            }
        }

        debug!(sheet = %table.sheet_name, rows = table.rows.len(), "sheet written");
    }

    writer.save(path)?;
    info!("consolidated workbook written");
    Ok(())
}

/// Saves every workbook of the corpus into `directory` under its own key.
/// The directory is created if needed; existing files are never replaced.
#[instrument(level = "info", skip_all, fields(directory = %directory.display()))]
pub fn save_corpus(corpus: &Corpus, directory: &Path) -> Result<()> {
    fs::create_dir_all(directory)?;

    let targets: Vec<_> = corpus
        .workbooks()
        .map(|workbook| (workbook, directory.join(workbook.key())))
        .collect();
    for (_, target) in &targets {
        ensure_vacant(target)?;
    }

    for (workbook, target) in targets {
        write_workbook(&target, workbook)?;
    }

    info!(workbook_count = corpus.len(), "corpus snapshot written");
    Ok(())
}

fn write_workbook(path: &Path, workbook: &Workbook) -> Result<()> {
    let mut writer = XlsxWorkbook::new();
    let date_format = Format::new().set_num_format(DATE_FORMAT);

    for sheet in workbook.sheets() {
        let worksheet = writer.add_worksheet();
        worksheet.set_name(sheet.name())?;

        for (row_idx, cells) in sheet.rows().iter().enumerate() {
            for (col_idx, cell) in cells.iter().enumerate() {
                write_cell(worksheet, row_idx as u32, col_idx as u16, cell, &date_format)?;
            }
        }
    }

    writer.save(path)?;
    Ok(())
}

fn write_cell(
    worksheet: &mut Worksheet,
    row: u32,
    col: u16,
    cell: &CellValue,
    date_format: &Format,
) -> Result<()> {
    match cell {
        CellValue::Empty => {}
        CellValue::Text(value) => {
            worksheet.write_string(row, col, value)?;
        }
        CellValue::Number(value) => {
            worksheet.write_number(row, col, *value)?;
        }
        CellValue::Bool(value) => {
            worksheet.write_boolean(row, col, *value)?;
        }
        CellValue::DateTime(value) => {
            worksheet.write_number_with_format(row, col, *value, date_format)?;
        }
    }
    Ok(())
}
