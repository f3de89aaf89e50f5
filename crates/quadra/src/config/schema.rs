use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::extract::AmountStyle;
use crate::reconcile::Tolerance;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    pub version: String,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub tolerances: TolerancesConfig,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            database: DatabaseConfig::default(),
            ingest: IngestConfig::default(),
            tolerances: TolerancesConfig::default(),
            export: ExportConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseConfig {
    /// Falls back to `~/.quadra/data/quadra.db` when unset.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl DatabaseConfig {
    /// `None` only when no path is configured and no home directory exists.
    pub fn resolved_path(&self) -> Option<PathBuf> {
        self.path.clone().or_else(crate::db::default_database_path)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestConfig {
    /// Persist job progress every N processed files.
    #[serde(default = "default_flush_every")]
    pub flush_every: u32,
    /// Documents larger than this are rejected before parsing.
    #[serde(default = "default_max_document_bytes")]
    pub max_document_bytes: usize,
}

fn default_flush_every() -> u32 {
    10
}

fn default_max_document_bytes() -> usize {
    25 * 1024 * 1024
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            flush_every: default_flush_every(),
            max_document_bytes: default_max_document_bytes(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TolerancesConfig {
    #[serde(default = "Tolerance::statement")]
    pub statement: Tolerance,
    #[serde(default = "Tolerance::payroll")]
    pub payroll: Tolerance,
    #[serde(default = "Tolerance::invoice")]
    pub invoice: Tolerance,
}

impl Default for TolerancesConfig {
    fn default() -> Self {
        Self {
            statement: Tolerance::statement(),
            payroll: Tolerance::payroll(),
            invoice: Tolerance::invoice(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportConfig {
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
    #[serde(default)]
    pub amount_style: AmountStyle,
}

fn default_delimiter() -> char {
    ';'
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            delimiter: default_delimiter(),
            amount_style: AmountStyle::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` overrides it.
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            json: false,
        }
    }
}
