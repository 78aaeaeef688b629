use std::path::PathBuf;

use thiserror::Error;

/// Convenient alias for fallible results returned throughout the crate.
pub type Result<T> = std::result::Result<T, ToolError>;

/// Error type covering the failures that stop a run. Anything recoverable at
/// row or cell level is absorbed where it happens and never reaches this
/// type.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Wrapper for IO failures such as reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Raised when the JSON report cannot be serialised.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Errors bubbled up from the Excel writer implementation.
    #[error("Excel write error: {0}")]
    ExcelWrite(#[from] rust_xlsxwriter::XlsxError),

    /// Errors bubbled up from the Excel reader implementation.
    #[error("Excel read error: {0}")]
    ExcelRead(#[from] calamine::XlsxError),

    /// Raised when the workbook package cannot be opened to read fill styles.
    #[error("workbook package error: {0}")]
    Package(#[from] zip::result::ZipError),

    /// Raised when a payout CSV cannot be written or parsed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Raised when the configuration file is not valid TOML for the schema.
    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Raised when configuration values parse but make no sense together.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Raised when a sheet does not follow the expected conventions.
    #[error("invalid workbook structure: {0}")]
    InvalidWorkbook(String),

    /// Raised when a persisted payout record cannot be read back.
    #[error("{path}: line {line}: {message}")]
    InvalidRecord {
        path: PathBuf,
        line: u64,
        message: String,
    },

    /// Raised when the user provides a path that does not exist.
    #[error("input file not found: {0}")]
    MissingInput(PathBuf),

    /// Raised when the tracing subscriber fails to initialise.
    #[error("failed to initialise logging: {0}")]
    Logging(String),
}
