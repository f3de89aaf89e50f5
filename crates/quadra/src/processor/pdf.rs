use crate::error::ProcessError;
use crate::processor::{DocumentFormat, DocumentProcessor, ProcessedContent, RawDocument};

/// Text layer extraction via lopdf. Scanned PDFs without a text layer yield
/// empty text, which the record builder reports as an empty document.
pub struct PdfProcessor;

impl PdfProcessor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PdfProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentProcessor for PdfProcessor {
    fn process(&self, document: &RawDocument) -> Result<ProcessedContent, ProcessError> {
        let _span = tracing::info_span!("processor.pdf").entered();

        let text = extract_pdf_text(&document.bytes, &document.filename)?;

        Ok(ProcessedContent {
            text,
            format: DocumentFormat::Pdf,
            filename: document.filename.clone(),
        })
    }

    fn supports(&self, format: DocumentFormat) -> bool {
        matches!(format, DocumentFormat::Pdf)
    }
}

/// Concatenates the text of every page. Pages whose content cannot be
/// decoded are skipped.
pub fn extract_pdf_text(bytes: &[u8], name: &str) -> Result<String, ProcessError> {
    let doc = lopdf::Document::load_mem(bytes)
        .map_err(|e| ProcessError::PdfProcessing(format!("Failed to load '{}': {}", name, e)))?;

    let mut text = String::new();
    for (page_num, _) in doc.get_pages() {
        match doc.extract_text(&[page_num]) {
            Ok(page_text) => {
                text.push_str(&page_text);
                text.push('\n');
            }
            Err(e) => {
                tracing::debug!(page = page_num, "Skipping undecodable page: {}", e);
            }
        }
    }

    Ok(text)
}

/// Builds a one-page PDF with one text line per input line.
#[cfg(test)]
pub(crate) fn sample_pdf(text: &str) -> Vec<u8> {
    use lopdf::{dictionary, Document, Object, Stream};

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.new_object_id();
    let resources_id = doc.new_object_id();
    let content_id = doc.new_object_id();
    let page_id = doc.new_object_id();

    doc.objects.insert(
        font_id,
        Object::Dictionary(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
            "Encoding" => "WinAnsiEncoding",
        }),
    );
    doc.objects.insert(
        resources_id,
        Object::Dictionary(dictionary! {
            "Font" => dictionary! {
                "F1" => font_id,
            },
        }),
    );

    let mut content = String::from("BT\n/F1 10 Tf\n50 742 Td\n12 TL\n");
    for line in text.lines() {
        let escaped: String = line
            .chars()
            .map(|c| match c {
                '(' => "\\(".to_string(),
                ')' => "\\)".to_string(),
                '\\' => "\\\\".to_string(),
                c if c.is_ascii() && !c.is_control() => c.to_string(),
                _ => " ".to_string(),
            })
            .collect();
        content.push_str(&format!("({}) Tj T*\n", escaped));
    }
    content.push_str("ET\n");
    doc.objects.insert(
        content_id,
        Object::Stream(Stream::new(dictionary! {}, content.into_bytes())),
    );

    doc.objects.insert(
        page_id,
        Object::Dictionary(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Resources" => resources_id,
            "Contents" => content_id,
        }),
    );
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}
