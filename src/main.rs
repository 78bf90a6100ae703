use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use iati_tools::consolidate::{
    ConsolidationSettings, DEFAULT_DATA_STARTING_ROW, PRIMARY_IDENTIFIER,
};
use iati_tools::pipeline::{self, RunOptions};
use iati_tools::{Result, ToolError};
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    if let Err(error) = init_logging().and_then(|()| run(cli)) {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}

fn init_logging() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| ToolError::Logging(err.to_string()))
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Template(args) => execute_template(args),
        Command::Diagnose(args) => execute_diagnose(args),
        Command::Consolidate(args) => execute_consolidate(args),
    }
}

fn execute_template(args: TemplateArgs) -> Result<()> {
    require_exists(&args.input)?;
    let schema = pipeline::register_template(&args.input, &args.output)?;
    for sheet in schema.sheets() {
        println!("{}: {} columns", sheet.name, sheet.columns.len());
    }
    Ok(())
}

fn execute_diagnose(args: DiagnoseArgs) -> Result<()> {
    require_exists(&args.raw)?;
    if let Some(template) = &args.template {
        require_exists(template)?;
    }

    let diagnosis = pipeline::diagnose(&args.raw, args.template.as_deref())?;
    if diagnosis.non_standard_sheets.is_empty() {
        println!("all workbooks share the expected sheets");
    } else {
        println!("non-standard sheets:");
        for sheet in &diagnosis.non_standard_sheets {
            println!("  {sheet}");
        }
    }
    println!("column counts:");
    for (workbook, counts) in &diagnosis.column_counts {
        println!("  {workbook}: {counts:?}");
    }
    Ok(())
}

fn execute_consolidate(args: ConsolidateArgs) -> Result<()> {
    for path in [&args.raw, &args.template, &args.mapping, &args.alterations] {
        require_exists(path)?;
    }

    let options = RunOptions {
        raw_dir: args.raw,
        template: args.template,
        schema_out: args.schema_out,
        mapping: args.mapping,
        alterations: args.alterations,
        output: args.output,
        snapshot_dir: args.snapshot_dir,
        settings: ConsolidationSettings {
            data_starting_row: args.data_starting_row,
            primary_identifier: args.primary_identifier,
        },
        provenance_column: args.provenance_column,
    };

    let report = pipeline::run(&options)?;
    for sheet in &report.removed_sheets {
        println!("removed sheet: {sheet}");
    }
    println!("headings corrected: {}", report.substitutions);
    println!("duplicate columns blanked: {}", report.blanked_columns);
    for (sheet, rows) in &report.rows_per_sheet {
        println!("{sheet}: {rows} rows");
    }
    Ok(())
}

fn require_exists(path: &Path) -> Result<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(ToolError::MissingInput(path.to_path_buf()))
    }
}

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Reconcile report workbooks against a template and consolidate them."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Extract the sheet/column schema from a template workbook.
    Template(TemplateArgs),
    /// Report non-standard sheets and column counts across a corpus.
    Diagnose(DiagnoseArgs),
    /// Clean a corpus and merge it into one workbook.
    Consolidate(ConsolidateArgs),
}

#[derive(clap::Args)]
struct TemplateArgs {
    /// Template workbook.
    #[arg(long)]
    input: PathBuf,

    /// Destination of the JSON schema.
    #[arg(long)]
    output: PathBuf,
}

#[derive(clap::Args)]
struct DiagnoseArgs {
    /// Directory containing the submitted workbooks.
    #[arg(long)]
    raw: PathBuf,

    /// Template workbook or JSON schema providing the expected sheet names.
    #[arg(long)]
    template: Option<PathBuf>,
}

#[derive(clap::Args)]
struct ConsolidateArgs {
    /// Directory containing the submitted workbooks.
    #[arg(long)]
    raw: PathBuf,

    /// Template workbook or JSON schema.
    #[arg(long)]
    template: PathBuf,

    /// JSON mapping from workbook file name to respondent.
    #[arg(long)]
    mapping: PathBuf,

    /// JSON alteration ruleset.
    #[arg(long)]
    alterations: PathBuf,

    /// Consolidated workbook to create. Must not exist yet.
    #[arg(long)]
    output: PathBuf,

    /// Persist the template schema here as JSON.
    #[arg(long)]
    schema_out: Option<PathBuf>,

    /// Save the corpus after each cleaning stage under this directory.
    #[arg(long)]
    snapshot_dir: Option<PathBuf>,

    /// First data row, 1-based.
    #[arg(long, default_value_t = DEFAULT_DATA_STARTING_ROW)]
    data_starting_row: usize,

    /// Column that must be filled for a row to be kept.
    #[arg(long, default_value = PRIMARY_IDENTIFIER)]
    primary_identifier: String,

    /// Append a column with this header holding each row's respondent.
    #[arg(long)]
    provenance_column: Option<String>,
}
