//! Bank-statement CSV exports. Each data row becomes one statement-line
//! record.

use crate::error::{ExtractionError, ProcessError};
use crate::extract::date::{DayFirstDate, IsoDate};
use crate::extract::labels::collapse_whitespace;
use crate::extract::{normalize_iban, parse_amount, FieldStrategy};
use crate::record::filename::parse_plain_amount;
use crate::record::{Amount, ExtractedRecord};

/// Column positions resolved from the header row.
#[derive(Debug, Default, PartialEq, Eq)]
struct Columns {
    date: Option<usize>,
    amount: Option<usize>,
    debit: Option<usize>,
    credit: Option<usize>,
    remark: Option<usize>,
    name: Option<usize>,
    iban: Option<usize>,
    reference: Option<usize>,
}

impl Columns {
    fn resolve(headers: &csv::StringRecord) -> Self {
        let mut cols = Columns::default();
        for (i, header) in headers.iter().enumerate() {
            let h = header.trim().to_lowercase();
            let slot = match h.as_str() {
                h if h.contains("valuta") || h.contains("value date") => None,
                h if h.starts_with("data") || h.contains("date") => Some(&mut cols.date),
                "importo" | "amount" | "importo eur" => Some(&mut cols.amount),
                "dare" | "addebiti" | "uscite" | "debit" => Some(&mut cols.debit),
                "avere" | "accrediti" | "entrate" | "credit" => Some(&mut cols.credit),
                h if h.contains("descrizione") || h.contains("causale") || h == "description" => {
                    Some(&mut cols.remark)
                }
                "beneficiario" | "ordinante" | "controparte" | "counterpart" => {
                    Some(&mut cols.name)
                }
                h if h.contains("iban") => Some(&mut cols.iban),
                "cro" | "trn" | "riferimento" | "reference" => Some(&mut cols.reference),
                _ => None,
            };
            // First matching column wins.
            if let Some(slot) = slot {
                slot.get_or_insert(i);
            }
        }
        cols
    }

    fn has_amount(&self) -> bool {
        self.amount.is_some() || self.debit.is_some() || self.credit.is_some()
    }
}

/// Parses a statement export. The outer error covers unreadable files; a
/// row without amount and reference yields an [`ExtractionError`] entry so
/// the caller can count it.
pub fn parse_statement(
    bytes: &[u8],
    filename: &str,
    job_id: Option<&str>,
) -> Result<Vec<Result<ExtractedRecord, ExtractionError>>, ProcessError> {
    let content = match std::str::from_utf8(bytes) {
        Ok(s) => s.trim_start_matches('\u{feff}').to_string(),
        Err(_) => bytes.iter().map(|&b| char::from(b)).collect(),
    };

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(sniff_delimiter(&content))
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| ProcessError::StatementParsing(format!("{}: {}", filename, e)))?
        .clone();
    let cols = Columns::resolve(&headers);
    if cols.date.is_none() || !cols.has_amount() {
        return Err(ProcessError::StatementParsing(format!(
            "{}: header has no date or amount column",
            filename
        )));
    }

    let mut rows = Vec::new();
    for (line, result) in reader.records().enumerate() {
        let record = result
            .map_err(|e| ProcessError::StatementParsing(format!("{}: {}", filename, e)))?;
        if record.iter().all(|cell| cell.is_empty()) {
            continue;
        }
        rows.push(
            build_row(&record, &cols, filename, job_id).inspect_err(|e| {
                tracing::debug!(row = line + 2, "Statement row rejected: {}", e);
            }),
        );
    }

    tracing::debug!(rows = rows.len(), "Statement parsed");
    Ok(rows)
}

fn build_row(
    row: &csv::StringRecord,
    cols: &Columns,
    filename: &str,
    job_id: Option<&str>,
) -> Result<ExtractedRecord, ExtractionError> {
    let cell = |idx: Option<usize>| idx.and_then(|i| row.get(i)).filter(|s| !s.is_empty());

    let mut record = ExtractedRecord::new(filename, job_id);
    record.date = cell(cols.date).and_then(|s| {
        DayFirstDate
            .apply(s)
            .date
            .or_else(|| IsoDate.apply(s).date)
    });
    record.amount = match cell(cols.amount) {
        Some(s) => parse_cell_amount(s),
        None => {
            let debit = cell(cols.debit).and_then(parse_cell_amount);
            let credit = cell(cols.credit).and_then(parse_cell_amount);
            match (debit, credit) {
                (Some(d), _) if d != Amount::ZERO => Some(Amount::from_cents(-d.abs().cents())),
                (_, Some(c)) => Some(c.abs()),
                (d, None) => d,
            }
        }
    };
    record.remark = cell(cols.remark).map(collapse_whitespace).unwrap_or_default();
    record.counterpart_name = cell(cols.name).map(collapse_whitespace);
    record.counterpart_iban = cell(cols.iban).and_then(normalize_iban);
    record.reference = cell(cols.reference).map(|s| s.to_uppercase());

    if !record.is_persistable() {
        return Err(ExtractionError::NoAmountOrReference {
            filename: filename.to_string(),
        });
    }
    Ok(record)
}

fn parse_cell_amount(s: &str) -> Option<Amount> {
    parse_amount(s).or_else(|| parse_plain_amount(s))
}

/// The candidate giving the most consistent field count over the first
/// lines wins.
fn sniff_delimiter(content: &str) -> u8 {
    let candidates: &[u8] = &[b';', b'\t', b',', b'|'];
    let sample_lines: Vec<&str> = content.lines().take(10).collect();

    let mut best = b';';
    let mut best_score = 0usize;
    for &delim in candidates {
        let counts: Vec<usize> = sample_lines
            .iter()
            .map(|line| {
                csv::ReaderBuilder::new()
                    .delimiter(delim)
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(line.as_bytes())
                    .records()
                    .next()
                    .and_then(|r| r.ok())
                    .map(|r| r.len())
                    .unwrap_or(1)
            })
            .collect();

        let target = counts.first().copied().unwrap_or(0);
        if target <= 1 {
            continue;
        }
        let score = counts.iter().filter(|&&c| c == target).count() * target;
        if score > best_score {
            best_score = score;
            best = delim;
        }
    }
    best
}
