/// Export and import handlers for extracted records
///
/// Every exporter is a pure function of (records, translations). Output
/// order follows the record order, never the map's iteration order.
pub mod csv;
pub mod json;
pub mod po;
pub mod txt;
pub mod xliff;

use crate::scanner::Record;
use crate::translation_map::TranslationMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Txt,
    Csv,
    Json,
    Po,
    Xliff,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 5] = [
        ExportFormat::Txt,
        ExportFormat::Csv,
        ExportFormat::Json,
        ExportFormat::Po,
        ExportFormat::Xliff,
    ];

    /// Detect format from file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "txt" | "asset" => Some(Self::Txt),
            "csv" => Some(Self::Csv),
            "json" => Some(Self::Json),
            "po" | "pot" => Some(Self::Po),
            "xliff" | "xlf" => Some(Self::Xliff),
            _ => None,
        }
    }

    /// Detect format from path
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Txt => "txt",
            Self::Csv => "csv",
            Self::Json => "json",
            Self::Po => "po",
            Self::Xliff => "xliff",
        }
    }
}

/// Records and translations recovered from an exported file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Imported {
    pub records: Vec<Record>,
    pub translations: TranslationMap,
}

/// Trait for format-specific handlers
pub trait FormatHandler: Send + Sync {
    /// Render records with their translations
    fn export(&self, records: &[Record], translations: &TranslationMap)
        -> Result<String, FormatError>;

    /// Read back a file produced by [`FormatHandler::export`]
    fn import(&self, content: &str) -> Result<Imported, FormatError>;

    fn format(&self) -> ExportFormat;
}

pub fn get_handler(format: ExportFormat) -> Box<dyn FormatHandler> {
    match format {
        ExportFormat::Txt => Box::new(txt::TxtHandler::new()),
        ExportFormat::Csv => Box::new(csv::CsvHandler::new()),
        ExportFormat::Json => Box::new(json::JsonHandler::new()),
        ExportFormat::Po => Box::new(po::PoHandler::new()),
        ExportFormat::Xliff => Box::new(xliff::XliffHandler::new()),
    }
}

/// Handler chosen by the extension of `path`.
pub fn handler_for_path(path: &Path) -> Result<Box<dyn FormatHandler>, FormatError> {
    ExportFormat::from_path(path)
        .map(get_handler)
        .ok_or_else(|| FormatError::UnsupportedFormat(path.display().to_string()))
}

pub fn export_records(
    format: ExportFormat,
    records: &[Record],
    translations: &TranslationMap,
) -> Result<String, FormatError> {
    get_handler(format).export(records, translations)
}

/// Translation for a record, or an empty string when there is none.
pub(crate) fn translation_or_empty<'a>(translations: &'a TranslationMap, term: &str) -> &'a str {
    translations.get(term).unwrap_or("")
}
