use crate::error::ExtractionError;
use crate::extract::{labels::collapse_whitespace, FieldExtractor, PartialFields};
use crate::record::filename::parse_filename;
use crate::record::ExtractedRecord;

/// Turns extracted fields into a persistable [`ExtractedRecord`].
pub struct RecordBuilder {
    extractor: FieldExtractor,
}

impl RecordBuilder {
    pub fn new(extractor: FieldExtractor) -> Self {
        Self { extractor }
    }

    /// Extracts fields from `text` and builds a record. A blank document is
    /// still given the filename fallback before it is rejected.
    pub fn from_text(
        &self,
        text: &str,
        filename: &str,
        job_id: Option<&str>,
    ) -> Result<ExtractedRecord, ExtractionError> {
        let blank = text.trim().is_empty();
        let fields = if blank {
            PartialFields::default()
        } else {
            self.extractor.extract(text)
        };

        Self::build(fields, filename, job_id).map_err(|e| {
            if blank {
                ExtractionError::EmptyDocument {
                    filename: filename.to_string(),
                }
            } else {
                e
            }
        })
    }

    /// When the body yielded no amount, fields parsed from the filename fill
    /// whatever the body left empty.
    pub fn build(
        mut fields: PartialFields,
        filename: &str,
        job_id: Option<&str>,
    ) -> Result<ExtractedRecord, ExtractionError> {
        if fields.amount.is_none() {
            if let Some(from_name) = parse_filename(filename) {
                tracing::debug!(filename, "Using filename metadata fallback");
                fields.fill_missing(from_name);
            }
        }

        let mut record = ExtractedRecord::new(filename, job_id);
        record.date = fields.date;
        record.amount = fields.amount;
        record.reference = fields.reference;
        record.counterpart_iban = fields.iban;
        record.counterpart_name = fields
            .name
            .map(|n| collapse_whitespace(&n))
            .filter(|n| !n.is_empty());
        record.remark = fields.remark.unwrap_or_default();
        record.plate = fields.plate;

        if !record.is_persistable() {
            return Err(ExtractionError::NoAmountOrReference {
                filename: filename.to_string(),
            });
        }
        Ok(record)
    }
}

impl Default for RecordBuilder {
    fn default() -> Self {
        Self::new(FieldExtractor::default())
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::record::Amount;

    #[test]
    fn test_body_fields_are_used() {
        let builder = RecordBuilder::default();
        let record = builder
            .from_text("Importo 10,00\nCausale: test", "a.pdf", Some("job-1"))
            .unwrap();
        assert_eq!(record.amount, Some(Amount::from_cents(1000)));
        assert_eq!(record.remark, "test");
        assert_eq!(record.currency, "EUR");
        assert_eq!(record.job_id.as_deref(), Some("job-1"));
        assert_eq!(record.source_filename, "a.pdf");
    }

    #[test]
    fn test_filename_fallback_does_not_overwrite_body() {
        let body = PartialFields {
            date: NaiveDate::from_ymd_opt(2024, 1, 1),
            remark: Some("from body".to_string()),
            ..Default::default()
        };
        let record = RecordBuilder::build(
            body,
            "IT60X0542811101000000123456_99,90_20240310_from_name.pdf",
            None,
        )
        .unwrap();

        assert_eq!(record.amount, Some(Amount::from_cents(9990)));
        assert_eq!(record.date, NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(record.remark, "from body");
        assert_eq!(
            record.counterpart_iban.as_deref(),
            Some("IT60X0542811101000000123456")
        );
    }

    #[test]
    fn test_filename_ignored_when_body_has_amount() {
        let body = PartialFields {
            amount: Some(Amount::from_cents(1)),
            ..Default::default()
        };
        let record =
            RecordBuilder::build(body, "IT60X0542811101000000123456_99,90_20240310.pdf", None).unwrap();
        assert_eq!(record.counterpart_iban, None);
        assert_eq!(record.date, None);
    }

    #[test]
    fn test_reference_alone_is_enough() {
        let body = PartialFields {
            reference: Some("A12345678901".to_string()),
            ..Default::default()
        };
        assert!(RecordBuilder::build(body, "x.pdf", None).is_ok());
    }

    #[test]
    fn test_no_amount_or_reference() {
        let err = RecordBuilder::default()
            .from_text("Gentile cliente, nulla da segnalare.", "letter.pdf", None)
            .unwrap_err();
        assert_eq!(
            err,
            ExtractionError::NoAmountOrReference {
                filename: "letter.pdf".to_string()
            }
        );
    }

    #[test]
    fn test_blank_document() {
        let err = RecordBuilder::default().from_text("  \n", "blank.pdf", None).unwrap_err();
        assert!(matches!(err, ExtractionError::EmptyDocument { .. }));

        let ok = RecordBuilder::default().from_text("", "IT60X0542811101000000123456_5,00_20240310.pdf", None);
        assert_eq!(ok.unwrap().amount, Some(Amount::from_cents(500)));
    }
}
