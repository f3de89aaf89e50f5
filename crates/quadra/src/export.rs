//! Delimited-text export of records.

use std::io::Write;

use crate::config::ExportConfig;
use crate::error::ExportError;
use crate::extract::{format_amount, AmountStyle};
use crate::record::ExtractedRecord;

pub const HEADER: [&str; 7] = [
    "date",
    "amount",
    "currency",
    "counterpart_name",
    "counterpart_identifier",
    "remark",
    "reference",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportOptions {
    pub delimiter: u8,
    /// Also decides the date format: `10/03/2024` or `2024-03-10`.
    pub amount_style: AmountStyle,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self::from(&ExportConfig::default())
    }
}

impl From<&ExportConfig> for ExportOptions {
    fn from(config: &ExportConfig) -> Self {
        // Non-ASCII delimiters cannot be written as a single byte
        let delimiter = if config.delimiter.is_ascii() {
            config.delimiter as u8
        } else {
            b';'
        };
        Self {
            delimiter,
            amount_style: config.amount_style,
        }
    }
}

/// Writes a header and one row per record, in the order given. Returns the
/// number of data rows written.
pub fn write_csv<'a, I, W>(records: I, writer: W, options: ExportOptions) -> Result<usize, ExportError>
where
    I: IntoIterator<Item = &'a ExtractedRecord>,
    W: Write,
{
    let mut writer = csv::WriterBuilder::new()
        .delimiter(options.delimiter)
        .from_writer(writer);

    writer.write_record(HEADER)?;

    let mut rows = 0;
    for record in records {
        writer.write_record(row(record, options.amount_style))?;
        rows += 1;
    }
    writer.flush()?;

    tracing::debug!(rows, "Exported records");
    Ok(rows)
}

fn row(record: &ExtractedRecord, style: AmountStyle) -> [String; 7] {
    let date_format = match style {
        AmountStyle::Italian => "%d/%m/%Y",
        AmountStyle::International => "%Y-%m-%d",
    };

    [
        record
            .date
            .map(|d| d.format(date_format).to_string())
            .unwrap_or_default(),
        record
            .amount
            .map(|a| format_amount(a, style))
            .unwrap_or_default(),
        record.currency.clone(),
        record.counterpart_name.clone().unwrap_or_default(),
        record.counterpart_iban.clone().unwrap_or_default(),
        record.remark.clone(),
        record.reference.clone().unwrap_or_default(),
    ]
}
