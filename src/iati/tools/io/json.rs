use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::iati::tools::config::{AlterationRuleset, RespondentMapping};
use crate::iati::tools::error::Result;
use crate::iati::tools::template::TemplateSchema;

/// Reads and deserialises a JSON document.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

/// Persists the template schema with two-space indentation for review.
pub fn write_template(path: &Path, schema: &TemplateSchema) -> Result<()> {
    let json = serde_json::to_string_pretty(schema)?;
    fs::write(path, json)?;
    debug!(path = %path.display(), sheets = schema.sheets().len(), "template schema written");
    Ok(())
}

pub fn read_template(path: &Path) -> Result<TemplateSchema> {
    read_json(path)
}

pub fn read_respondent_mapping(path: &Path) -> Result<RespondentMapping> {
    read_json(path)
}

/// Reads and validates an alteration ruleset.
pub fn read_alterations(path: &Path) -> Result<AlterationRuleset> {
    AlterationRuleset::from_json(read_json(path)?)
}
