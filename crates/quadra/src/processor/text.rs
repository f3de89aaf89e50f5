use crate::error::ProcessError;
use crate::processor::{DocumentFormat, DocumentProcessor, ProcessedContent, RawDocument};

pub struct TextProcessor;

impl TextProcessor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TextProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentProcessor for TextProcessor {
    fn process(&self, document: &RawDocument) -> Result<ProcessedContent, ProcessError> {
        let text = match std::str::from_utf8(&document.bytes) {
            Ok(s) => s.to_string(),
            // Older bank exports are Latin-1.
            Err(_) => document.bytes.iter().map(|&b| char::from(b)).collect(),
        };

        Ok(ProcessedContent {
            text: text.trim_start_matches('\u{feff}').to_string(),
            format: DocumentFormat::Text,
            filename: document.filename.clone(),
        })
    }

    fn supports(&self, format: DocumentFormat) -> bool {
        matches!(format, DocumentFormat::Text)
    }
}
