//! Typed configuration documents: the respondent mapping and the alteration
//! ruleset. Both are validated when loaded so that a bad rule fails before
//! any workbook is touched.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::iati::tools::error::{Result, ToolError};
use crate::iati::tools::model::{ColumnLetter, Corpus};

/// Workbook key → respondent identifier (for example a country).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RespondentMapping(BTreeMap<String, String>);

impl RespondentMapping {
    pub fn new(entries: BTreeMap<String, String>) -> Self {
        Self(entries)
    }

    /// Accepts the mapping only if its keys are exactly the corpus keys.
    pub fn resolve(self, corpus: &Corpus) -> Result<Self> {
        let corpus_keys: BTreeSet<&str> = corpus.keys().collect();
        let mapped_keys: BTreeSet<&str> = self.0.keys().map(String::as_str).collect();

        if corpus_keys == mapped_keys {
            return Ok(self);
        }

        Err(ToolError::SchemaMismatch {
            missing: corpus_keys
                .difference(&mapped_keys)
                .map(|key| key.to_string())
                .collect(),
            unexpected: mapped_keys
                .difference(&corpus_keys)
                .map(|key| key.to_string())
                .collect(),
        })
    }

    pub fn respondent(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Header renames applied to every sheet of every workbook.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Substitutions {
    pub columns: BTreeMap<String, String>,
}

/// Sheet name → column letter → the header value that marks the column as an
/// accidental duplicate.
pub type ColumnDeduplications = BTreeMap<String, BTreeMap<ColumnLetter, String>>;

/// Declarative corrections applied before consolidation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlterationRuleset {
    pub substitutions: Substitutions,
    pub column_deduplications: ColumnDeduplications,
}

impl AlterationRuleset {
    /// Parses and validates a ruleset document.
    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        let ruleset: Self = serde_json::from_value(value)?;
        ruleset.validate()?;
        Ok(ruleset)
    }

    /// Rejects rules that can never apply. Chained substitutions are allowed
    /// but reported, since they make normalisation order sensitive.
    pub fn validate(&self) -> Result<()> {
        for (old, new) in &self.substitutions.columns {
            if old.trim().is_empty() || new.trim().is_empty() {
                return Err(ToolError::InvalidConfig(format!(
                    "substitution '{old}' -> '{new}' has an empty column name"
                )));
            }
            if self.substitutions.columns.contains_key(new) {
                warn!(from = %old, to = %new, "substitution target is itself substituted");
            }
        }

        for (sheet, columns) in &self.column_deduplications {
            for (letter, expected) in columns {
                if expected.trim().is_empty() {
                    return Err(ToolError::InvalidConfig(format!(
                        "deduplication rule for sheet '{sheet}' column {letter} has no expected header"
                    )));
                }
            }
        }

        Ok(())
    }
}
