use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::debug;

use crate::iati::tools::model::{COMMENT_MARKER, CellValue, Workbook};

/// Expected columns of one template sheet, in template order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateSheet {
    pub name: String,
    pub columns: Vec<String>,
}

/// Canonical sheet → column layout every report is reconciled against.
///
/// Serialised as a JSON object whose key order follows the template's sheet
/// order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateSchema {
    sheets: Vec<TemplateSheet>,
}

impl TemplateSchema {
    pub fn new(sheets: Vec<TemplateSheet>) -> Self {
        Self { sheets }
    }

    pub fn sheets(&self) -> &[TemplateSheet] {
        &self.sheets
    }

    pub fn sheet(&self, name: &str) -> Option<&TemplateSheet> {
        self.sheets.iter().find(|sheet| sheet.name == name)
    }

    pub fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|sheet| sheet.name.clone()).collect()
    }
}

/// Derives the template schema from a reference workbook.
///
/// Sheets and header values starting with the comment marker are
/// documentation and are skipped. Repeated header values are kept in the
/// order they occur.
pub fn extract_template(workbook: &Workbook) -> TemplateSchema {
    let sheets = workbook
        .sheets()
        .iter()
        .filter(|sheet| !is_comment(sheet.name()))
        .map(|sheet| {
            let columns: Vec<String> = sheet
                .header_row()
                .iter()
                .filter_map(CellValue::header_name)
                .filter(|name| !is_comment(name))
                .collect();
            debug!(sheet = sheet.name(), column_count = columns.len(), "template sheet registered");
            TemplateSheet {
                name: sheet.name().to_string(),
                columns,
            }
        })
        .collect();

    TemplateSchema { sheets }
}

fn is_comment(name: &str) -> bool {
    name.starts_with(COMMENT_MARKER)
}

impl Serialize for TemplateSchema {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(
            self.sheets
                .iter()
                .map(|sheet| (&sheet.name, &sheet.columns)),
        )
    }
}

impl<'de> Deserialize<'de> for TemplateSchema {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(TemplateVisitor)
    }
}

struct TemplateVisitor;

impl<'de> Visitor<'de> for TemplateVisitor {
    type Value = TemplateSchema;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a map of sheet names to column name lists")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut sheets = Vec::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((name, columns)) = access.next_entry::<String, Vec<String>>()? {
            sheets.push(TemplateSheet { name, columns });
        }
        Ok(TemplateSchema { sheets })
    }
}
