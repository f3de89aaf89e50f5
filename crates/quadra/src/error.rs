use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum QuadraError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Processing error: {0}")]
    Process(#[from] ProcessError),

    #[error("Archive error: {0}")]
    Archive(#[from] ArchiveError),

    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Job error: {0}")]
    Job(#[from] JobError),

    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Schema validation failed: {errors}")]
    SchemaValidation { errors: String },

    #[error("Invalid tolerance '{name}': {reason}")]
    InvalidTolerance { name: String, reason: String },
}

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("Unsupported document format: {0}")]
    UnsupportedFormat(String),

    #[error("Document '{name}' exceeds the size limit ({size} > {limit} bytes)")]
    TooLarge { name: String, size: usize, limit: usize },

    #[error("Failed to process PDF: {0}")]
    PdfProcessing(String),

    #[error("Failed to parse e-mail message: {0}")]
    EmailParsing(String),

    #[error("Failed to parse statement: {0}")]
    StatementParsing(String),

    #[error("Text extraction failed: {0}")]
    TextExtraction(String),
}

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("Archive '{name}' is corrupt: {reason}")]
    Corrupt { name: String, reason: String },

    #[error("Failed to read entry '{entry}' of archive '{name}': {source}")]
    ReadEntry {
        name: String,
        entry: String,
        #[source]
        source: std::io::Error,
    },
}

/// A document yielded text, but no persistable record could be built from it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("No amount or reference code found in '{filename}'")]
    NoAmountOrReference { filename: String },

    #[error("Document '{filename}' contains no text")]
    EmptyDocument { filename: String },
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),

    #[error("Failed to (de)serialize stored document: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Record not found: {0}")]
    RecordNotFound(String),

    #[error("Match not found: {0}")]
    MatchNotFound(String),

    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Stored data is corrupt: {0}")]
    Corrupt(String),
}

#[derive(Error, Debug)]
pub enum JobError {
    #[error("Job not found: {0}")]
    NotFound(String),

    #[error("Job {job_id} is {status} and cannot be {action}")]
    InvalidState {
        job_id: String,
        status: String,
        action: &'static str,
    },

    #[error("Job store failure: {0}")]
    Store(#[from] StoreError),
}

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("CSV write failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Invalid log filter '{directive}': {source}")]
    Filter {
        directive: String,
        #[source]
        source: tracing_subscriber::filter::ParseError,
    },

    #[error("A global tracing subscriber is already installed: {0}")]
    AlreadyInstalled(#[from] tracing::subscriber::SetGlobalDefaultError),

    #[error("Failed to bridge log records: {0}")]
    LogBridge(#[from] log::SetLoggerError),
}

pub type Result<T> = std::result::Result<T, QuadraError>;
