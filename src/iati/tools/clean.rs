//! Cleaning stages applied to the corpus before consolidation.
//!
//! Each stage takes the corpus by value and hands it back, so the order
//! prune → normalise headings → resolve duplicates is explicit at the call
//! site. Mutations are irreversible; snapshotting between stages is the
//! caller's business.

use std::collections::BTreeSet;

use tracing::{debug, info, instrument};

use crate::iati::tools::config::{ColumnDeduplications, Substitutions};
use crate::iati::tools::error::{Result, ToolError};
use crate::iati::tools::model::{CellValue, Corpus};

/// Removes every sheet named in `delete` from every workbook.
#[instrument(level = "info", skip_all, fields(sheets = delete.len()))]
pub fn prune_sheets(mut corpus: Corpus, delete: &BTreeSet<String>) -> Corpus {
    for workbook in corpus.workbooks_mut() {
        for name in delete {
            if workbook.remove_sheet(name).is_some() {
                debug!(workbook = %workbook.key(), sheet = %name, "sheet removed");
            }
        }
    }
    corpus
}

/// Rewrites header cells that exactly match a substitution key.
///
/// Each cell is looked up once, so substitutions never chain within a pass.
/// Returns the corpus and the number of cells rewritten.
#[instrument(level = "info", skip_all, fields(rules = substitutions.columns.len()))]
pub fn normalize_headings(mut corpus: Corpus, substitutions: &Substitutions) -> (Corpus, usize) {
    let mut rewritten = 0;

    for workbook in corpus.workbooks_mut() {
        let key = workbook.key().to_string();
        for sheet in workbook.sheets_mut() {
            let sheet_name = sheet.name().to_string();
            let Some(header) = sheet.header_row_mut() else {
                continue;
            };
            for cell in header.iter_mut() {
                let Some(current) = cell.header_name() else {
                    continue;
                };
                if let Some(corrected) = substitutions.columns.get(&current) {
                    info!(
                        workbook = %key,
                        sheet = %sheet_name,
                        old = %current,
                        new = %corrected,
                        "heading corrected"
                    );
                    *cell = CellValue::text(corrected.clone());
                    rewritten += 1;
                }
            }
        }
    }

    (corpus, rewritten)
}

/// Blanks columns confirmed to be accidental header duplicates.
///
/// A rule only fires when the header at the declared letter still equals the
/// declared value; otherwise the column is left alone. Workbooks without the
/// declared sheet are skipped. A declared letter beyond the sheet's width is
/// an error, checked for the whole corpus before any column is blanked.
/// Returns the corpus and the number of columns blanked.
#[instrument(level = "info", skip_all, fields(sheets = rules.len()))]
pub fn resolve_duplicate_headings(
    mut corpus: Corpus,
    rules: &ColumnDeduplications,
) -> Result<(Corpus, usize)> {
    for workbook in corpus.workbooks() {
        for (sheet_name, columns) in rules {
            let Some(sheet) = workbook.sheet(sheet_name) else {
                continue;
            };
            if let Some(letter) = columns.keys().find(|letter| letter.index() >= sheet.width()) {
                return Err(ToolError::MissingSheetOrColumn {
                    workbook: workbook.key().to_string(),
                    sheet: sheet_name.clone(),
                    column: letter.to_string(),
                });
            }
        }
    }

    let mut blanked = 0;
    for workbook in corpus.workbooks_mut() {
        let key = workbook.key().to_string();
        for (sheet_name, columns) in rules {
            let Some(sheet) = workbook.sheet_mut(sheet_name) else {
                continue;
            };
            for (letter, expected) in columns {
                if sheet.header_at(letter).as_deref() != Some(expected.as_str()) {
                    continue;
                }
                info!(
                    workbook = %key,
                    sheet = %sheet_name,
                    column = %letter,
                    header = %expected,
                    "duplicate column blanked"
                );
                sheet.clear_column(letter.index());
                blanked += 1;
            }
        }
    }

    Ok((corpus, blanked))
}
