use std::path::PathBuf;

use thiserror::Error;

/// Convenient alias for fallible results returned throughout the crate.
pub type Result<T> = std::result::Result<T, ToolError>;

/// Error type covering the different failure cases that can occur when the
/// tool loads, cleans, consolidates, or exports report workbooks.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Wrapper for IO failures such as reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Raised when JSON parsing or serialization fails.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Errors bubbled up from the Excel writer implementation.
    #[error("Excel write error: {0}")]
    ExcelWrite(#[from] rust_xlsxwriter::XlsxError),

    /// Errors bubbled up from the Excel reader implementation.
    #[error("Excel read error: {0}")]
    ExcelRead(#[from] calamine::XlsxError),

    /// Raised when a document in the raw corpus cannot be parsed as a workbook.
    #[error("failed to load workbook {}: {source}", path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: calamine::XlsxError,
    },

    /// Raised when the respondent mapping does not cover exactly the corpus.
    #[error(
        "respondent mapping does not match the corpus: unmapped workbooks {missing:?}, \
         mapped but absent workbooks {unexpected:?}"
    )]
    SchemaMismatch {
        missing: Vec<String>,
        unexpected: Vec<String>,
    },

    /// Raised when a deduplication rule points at a column a workbook does not have.
    #[error("workbook '{workbook}' sheet '{sheet}' has no column {column}")]
    MissingSheetOrColumn {
        workbook: String,
        sheet: String,
        column: String,
    },

    /// Raised when a template sheet does not declare the primary identifier column.
    #[error("template sheet '{sheet}' does not declare the identifier column '{column}'")]
    MissingIdentifierColumn { sheet: String, column: String },

    /// Raised when the output location is already occupied.
    #[error("refusing to overwrite existing file {}", .0.display())]
    OutputExists(PathBuf),

    /// Raised when a configuration document is structurally valid JSON but
    /// carries unusable values.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Raised when a deduplication rule names something that is not a column letter.
    #[error("invalid column letter '{0}'")]
    InvalidColumnLetter(String),

    /// Raised when the user provides a path that does not exist.
    #[error("input file not found: {}", .0.display())]
    MissingInput(PathBuf),

    /// Raised when the tracing subscriber fails to initialise.
    #[error("failed to initialise logging: {0}")]
    Logging(String),
}
