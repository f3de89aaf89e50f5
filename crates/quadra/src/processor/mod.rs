pub mod archive;
pub mod email;
pub mod pdf;
pub mod text;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ProcessError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Pdf,
    Text,
    Email,
    /// Bank-statement export, one record per row.
    Statement,
    Archive,
}

impl DocumentFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "pdf" => Some(DocumentFormat::Pdf),
            "txt" | "text" | "md" => Some(DocumentFormat::Text),
            "eml" => Some(DocumentFormat::Email),
            "csv" => Some(DocumentFormat::Statement),
            "zip" => Some(DocumentFormat::Archive),
            _ => None,
        }
    }

    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or("").trim().to_lowercase();
        match essence.as_str() {
            "application/pdf" => Some(DocumentFormat::Pdf),
            "text/plain" | "text/markdown" => Some(DocumentFormat::Text),
            "message/rfc822" => Some(DocumentFormat::Email),
            "text/csv" => Some(DocumentFormat::Statement),
            "application/zip" | "application/x-zip-compressed" => Some(DocumentFormat::Archive),
            _ => None,
        }
    }

    /// Extension first, then the caller's MIME hint, then a guess from the
    /// file name.
    pub fn detect(filename: &str, mime: Option<&str>) -> Option<Self> {
        let path = Path::new(filename);
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
            .or_else(|| mime.and_then(Self::from_mime))
            .or_else(|| {
                mime_guess::from_path(path)
                    .first()
                    .and_then(|m| Self::from_mime(m.essence_str()))
            })
    }

    pub fn extension(&self) -> &'static str {
        match self {
            DocumentFormat::Pdf => "pdf",
            DocumentFormat::Text => "txt",
            DocumentFormat::Email => "eml",
            DocumentFormat::Statement => "csv",
            DocumentFormat::Archive => "zip",
        }
    }
}

/// An uploaded file. Owned by the ingestion call and dropped once its text
/// has been extracted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDocument {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub mime: Option<String>,
}

impl RawDocument {
    pub fn new(filename: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
            filename: filename.into(),
            mime: None,
        }
    }

    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }

    pub fn format(&self) -> Option<DocumentFormat> {
        DocumentFormat::detect(&self.filename, self.mime.as_deref())
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedContent {
    pub text: String,
    pub format: DocumentFormat,
    pub filename: String,
}

pub trait DocumentProcessor: Send + Sync {
    fn process(&self, document: &RawDocument) -> Result<ProcessedContent, ProcessError>;
    fn supports(&self, format: DocumentFormat) -> bool;
}

/// Routes a document to the first processor that supports its format.
pub struct ProcessorRegistry {
    processors: Vec<Box<dyn DocumentProcessor>>,
    max_document_bytes: usize,
}

impl ProcessorRegistry {
    pub fn new(max_document_bytes: usize) -> Self {
        let processors: Vec<Box<dyn DocumentProcessor>> = vec![
            Box::new(text::TextProcessor::new()),
            Box::new(pdf::PdfProcessor::new()),
            Box::new(email::EmailProcessor::new()),
        ];

        Self {
            processors,
            max_document_bytes,
        }
    }

    /// Adds a processor ahead of the built-in ones.
    pub fn register(&mut self, processor: Box<dyn DocumentProcessor>) {
        self.processors.insert(0, processor);
    }

    /// Rejects documents over the configured byte limit.
    pub fn check_size(&self, document: &RawDocument) -> Result<(), ProcessError> {
        if document.size() > self.max_document_bytes {
            return Err(ProcessError::TooLarge {
                name: document.filename.clone(),
                size: document.size(),
                limit: self.max_document_bytes,
            });
        }
        Ok(())
    }

    pub fn process(&self, document: &RawDocument) -> Result<ProcessedContent, ProcessError> {
        self.check_size(document)?;

        let format = document
            .format()
            .ok_or_else(|| ProcessError::UnsupportedFormat(document.filename.clone()))?;

        for processor in &self.processors {
            if processor.supports(format) {
                return processor.process(document);
            }
        }

        Err(ProcessError::UnsupportedFormat(
            format.extension().to_string(),
        ))
    }
}

impl Default for ProcessorRegistry {
    fn default() -> Self {
        Self::new(crate::config::IngestConfig::default().max_document_bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_by_extension() {
        assert_eq!(DocumentFormat::detect("a.PDF", None), Some(DocumentFormat::Pdf));
        assert_eq!(DocumentFormat::detect("m.eml", None), Some(DocumentFormat::Email));
        assert_eq!(
            DocumentFormat::detect("estratto.csv", None),
            Some(DocumentFormat::Statement)
        );
        assert_eq!(DocumentFormat::detect("batch.zip", None), Some(DocumentFormat::Archive));
    }

    #[test]
    fn test_detect_falls_back_to_mime_hint() {
        assert_eq!(
            DocumentFormat::detect("upload", Some("application/pdf")),
            Some(DocumentFormat::Pdf)
        );
        assert_eq!(
            DocumentFormat::detect("upload", Some("text/plain; charset=utf-8")),
            Some(DocumentFormat::Text)
        );
        assert_eq!(DocumentFormat::detect("upload", None), None);
        assert_eq!(DocumentFormat::detect("photo.jpg", None), None);
    }

    #[test]
    fn test_registry_routes_text() {
        let registry = ProcessorRegistry::default();
        let doc = RawDocument::new("advice.txt", "Importo: 10,00");

        let processed = registry.process(&doc).unwrap();
        assert_eq!(processed.format, DocumentFormat::Text);
        assert!(processed.text.contains("10,00"));
    }

    #[test]
    fn test_unsupported_format_error() {
        let registry = ProcessorRegistry::default();
        let doc = RawDocument::new("photo.jpg", vec![0xff, 0xd8]);

        match registry.process(&doc) {
            Err(ProcessError::UnsupportedFormat(name)) => assert_eq!(name, "photo.jpg"),
            other => panic!("Expected UnsupportedFormat, got {:?}", other.map(|p| p.format)),
        }
    }

    #[test]
    fn test_statement_is_not_a_text_document() {
        let registry = ProcessorRegistry::default();
        let doc = RawDocument::new("estratto.csv", "data;importo");
        assert!(matches!(
            registry.process(&doc),
            Err(ProcessError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_size_limit() {
        let registry = ProcessorRegistry::new(4);
        let doc = RawDocument::new("big.txt", "0123456789");
        assert!(matches!(
            registry.process(&doc),
            Err(ProcessError::TooLarge { size: 10, limit: 4, .. })
        ));
    }
}
