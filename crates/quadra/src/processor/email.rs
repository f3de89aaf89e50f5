//! `.eml` messages: body text plus the text of PDF and plain-text
//! attachments. Fine notices usually arrive this way.

use std::fmt::Write;

use mail_parser::{Message, MessageParser, MimeHeaders};

use crate::error::ProcessError;
use crate::processor::pdf::extract_pdf_text;
use crate::processor::{DocumentFormat, DocumentProcessor, ProcessedContent, RawDocument};

pub struct EmailProcessor;

impl EmailProcessor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for EmailProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentProcessor for EmailProcessor {
    fn process(&self, document: &RawDocument) -> Result<ProcessedContent, ProcessError> {
        let _span = tracing::info_span!("processor.email").entered();

        let message = MessageParser::default()
            .parse(&document.bytes)
            .ok_or_else(|| {
                ProcessError::EmailParsing(format!("'{}' is not a MIME message", document.filename))
            })?;

        let mut text = String::new();
        if let Some(body) = message.body_text(0) {
            text.push_str(&body);
            text.push('\n');
        }

        for part in message.attachments() {
            let name = part.attachment_name().unwrap_or("attachment");
            match attachment_format(part) {
                Some(DocumentFormat::Pdf) => match extract_pdf_text(part.contents(), name) {
                    Ok(pdf_text) => {
                        text.push_str(&pdf_text);
                        text.push('\n');
                    }
                    Err(e) => tracing::warn!(attachment = name, "Skipping attachment: {}", e),
                },
                Some(DocumentFormat::Text) => {
                    text.push_str(&String::from_utf8_lossy(part.contents()));
                    text.push('\n');
                }
                _ => tracing::debug!(attachment = name, "Ignoring attachment"),
            }
        }

        // Headers go last so body fields win in document order.
        text.push_str(&header_block(&message));

        Ok(ProcessedContent {
            text,
            format: DocumentFormat::Email,
            filename: document.filename.clone(),
        })
    }

    fn supports(&self, format: DocumentFormat) -> bool {
        matches!(format, DocumentFormat::Email)
    }
}

fn attachment_format(part: &mail_parser::MessagePart) -> Option<DocumentFormat> {
    let by_type = part.content_type().and_then(|ct| {
        let mime = match ct.subtype() {
            Some(subtype) => format!("{}/{}", ct.ctype(), subtype),
            None => ct.ctype().to_string(),
        };
        DocumentFormat::from_mime(&mime)
    });
    by_type.or_else(|| {
        part.attachment_name()
            .and_then(|name| DocumentFormat::detect(name, None))
    })
}

fn header_block(message: &Message) -> String {
    let mut output = String::new();
    if let Some(subject) = message.subject() {
        let _ = writeln!(output, "Subject: {}", subject);
    }
    if let Some(from) = message.from().and_then(|a| a.first()) {
        let _ = writeln!(output, "From: {}", from.address().unwrap_or_default());
    }
    if let Some(date) = message.date() {
        let _ = writeln!(output, "Date: {}", date.to_rfc3339());
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::pdf::sample_pdf;

    fn base64(bytes: &[u8]) -> String {
        const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";
        let mut out = String::new();
        for chunk in bytes.chunks(3) {
            let b = [chunk[0], *chunk.get(1).unwrap_or(&0), *chunk.get(2).unwrap_or(&0)];
            let n = (u32::from(b[0]) << 16) | (u32::from(b[1]) << 8) | u32::from(b[2]);
            for i in 0..4 {
                if i <= chunk.len() {
                    out.push(char::from(ALPHABET[((n >> (18 - 6 * i)) & 63) as usize]));
                } else {
                    out.push('=');
                }
            }
        }
        out
    }

    #[test]
    fn test_plain_message_body() {
        let raw = "From: polizia@comune.milano.it\r\n\
                   Subject: Notifica verbale\r\n\
                   Content-Type: text/plain; charset=utf-8\r\n\
                   \r\n\
                   N. Verbale V12345678\r\nImporto da pagare: 84,00\r\n";
        let doc = RawDocument::new("verbale.eml", raw);

        let processed = EmailProcessor::new().process(&doc).unwrap();
        assert_eq!(processed.format, DocumentFormat::Email);
        assert!(processed.text.contains("V12345678"));
        assert!(processed.text.contains("Subject: Notifica verbale"));
        assert!(processed.text.find("84,00") < processed.text.find("Subject:"));
    }

    #[test]
    fn test_pdf_attachment_text_is_included() {
        let pdf = base64(&sample_pdf("Targa AB123CD"));
        let raw = format!(
            "From: pec@comune.it\r\n\
             Subject: Verbale\r\n\
             MIME-Version: 1.0\r\n\
             Content-Type: multipart/mixed; boundary=\"XX\"\r\n\
             \r\n\
             --XX\r\n\
             Content-Type: text/plain\r\n\
             \r\n\
             In allegato il verbale.\r\n\
             --XX\r\n\
             Content-Type: application/pdf; name=\"verbale.pdf\"\r\n\
             Content-Disposition: attachment; filename=\"verbale.pdf\"\r\n\
             Content-Transfer-Encoding: base64\r\n\
             \r\n\
             {}\r\n\
             --XX--\r\n",
            pdf
        );
        let doc = RawDocument::new("pec.eml", raw);

        let processed = EmailProcessor::new().process(&doc).unwrap();
        assert!(processed.text.contains("In allegato il verbale."));
        assert!(processed.text.contains("AB123CD"));
    }
}
