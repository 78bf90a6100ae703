use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use tracing::{info, instrument, warn};

use crate::iati::tools::clean;
use crate::iati::tools::consolidate::{self, ConsolidationSettings};
use crate::iati::tools::diagnostics;
use crate::iati::tools::error::Result;
use crate::iati::tools::io::excel_read;
use crate::iati::tools::io::excel_write::{self, Provenance};
use crate::iati::tools::io::json;
use crate::iati::tools::model::Corpus;
use crate::iati::tools::template::{self, TemplateSchema};

/// Everything a consolidation run needs.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Directory holding only the submitted `.xlsx` reports.
    pub raw_dir: PathBuf,
    /// Template workbook, or a previously persisted `.json` schema.
    pub template: PathBuf,
    /// Where to persist the extracted schema, if anywhere.
    pub schema_out: Option<PathBuf>,
    pub mapping: PathBuf,
    pub alterations: PathBuf,
    pub output: PathBuf,
    /// Root for per-stage corpus snapshots.
    pub snapshot_dir: Option<PathBuf>,
    pub settings: ConsolidationSettings,
    /// Header of an extra column carrying each row's respondent.
    pub provenance_column: Option<String>,
}

/// Summary of what a run changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineReport {
    pub removed_sheets: BTreeSet<String>,
    pub substitutions: usize,
    pub blanked_columns: usize,
    pub rows_per_sheet: Vec<(String, usize)>,
}

/// Result of inspecting a corpus without changing it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnosis {
    pub non_standard_sheets: BTreeSet<String>,
    pub column_counts: BTreeMap<String, Vec<usize>>,
}

/// Loads a template schema from a persisted `.json` file or extracts it from
/// a template workbook.
pub fn load_template(path: &Path) -> Result<TemplateSchema> {
    let is_json = path
        .extension()
        .is_some_and(|extension| extension.eq_ignore_ascii_case("json"));
    if is_json {
        json::read_template(path)
    } else {
        Ok(template::extract_template(&excel_read::read_workbook(path)?))
    }
}

/// Extracts the schema from a template workbook and persists it.
#[instrument(
    level = "info",
    skip_all,
    fields(input = %input.display(), output = %output.display())
)]
pub fn register_template(input: &Path, output: &Path) -> Result<TemplateSchema> {
    let schema = template::extract_template(&excel_read::read_workbook(input)?);
    json::write_template(output, &schema)?;
    info!(sheet_count = schema.sheets().len(), "template registered");
    Ok(schema)
}

/// Reports non-standard sheets and per-sheet column counts for a corpus.
/// With a template, its sheet names are the expected set.
#[instrument(level = "info", skip_all, fields(raw_dir = %raw_dir.display()))]
pub fn diagnose(raw_dir: &Path, template_path: Option<&Path>) -> Result<Diagnosis> {
    let corpus = excel_read::load_corpus(raw_dir)?;
    let reference = template_path
        .map(load_template)
        .transpose()?
        .map(|schema| schema.sheet_names());

    Ok(Diagnosis {
        non_standard_sheets: diagnostics::non_standard_sheet_names(&corpus, reference.as_deref()),
        column_counts: diagnostics::column_counts(&corpus),
    })
}

/// Runs the full load → clean → consolidate → export flow.
#[instrument(
    level = "info",
    skip_all,
    fields(raw_dir = %options.raw_dir.display(), output = %options.output.display())
)]
pub fn run(options: &RunOptions) -> Result<PipelineReport> {
    excel_write::ensure_vacant(&options.output)?;

    let schema = load_template(&options.template)?;
    if let Some(path) = &options.schema_out {
        json::write_template(path, &schema)?;
    }

    let corpus = excel_read::load_corpus(&options.raw_dir)?;
    let mapping = json::read_respondent_mapping(&options.mapping)?.resolve(&corpus)?;
    let alterations = json::read_alterations(&options.alterations)?;
    info!(
        workbook_count = corpus.len(),
        respondents = mapping.len(),
        "inputs validated"
    );

    let reference = schema.sheet_names();
    let removed_sheets =
        diagnostics::non_standard_sheet_names(&corpus, Some(reference.as_slice()));
    if !removed_sheets.is_empty() {
        warn!(sheets = ?removed_sheets, "non-standard sheets will be removed");
    }

    let corpus = clean::prune_sheets(corpus, &removed_sheets);
    snapshot(&corpus, options, "extra_sheets_removed")?;

    let (corpus, substitutions) = clean::normalize_headings(corpus, &alterations.substitutions);
    snapshot(&corpus, options, "headings_corrected")?;

    let (corpus, blanked_columns) =
        clean::resolve_duplicate_headings(corpus, &alterations.column_deduplications)?;
    snapshot(&corpus, options, "duplicates_resolved")?;

    let tables = consolidate::consolidate(&corpus, &schema, &options.settings)?;

    let provenance = options.provenance_column.as_deref().map(|column| Provenance {
        column,
        mapping: &mapping,
    });
    excel_write::write_consolidated(&options.output, &tables, provenance)?;

    Ok(PipelineReport {
        removed_sheets,
        substitutions,
        blanked_columns,
        rows_per_sheet: tables
            .iter()
            .map(|table| (table.sheet_name.clone(), table.rows.len()))
            .collect(),
    })
}

fn snapshot(corpus: &Corpus, options: &RunOptions, stage: &str) -> Result<()> {
    match &options.snapshot_dir {
        Some(root) => excel_write::save_corpus(corpus, &root.join(stage)),
        None => Ok(()),
    }
}
