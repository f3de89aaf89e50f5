//! Metadata embedded in structured file names:
//! `IBAN_AMOUNT_DATE_REMARK.ext`, for example
//! `IT60X0542811101000000123456_1234,56_20240310_saldo_fattura.pdf`.

use std::path::Path;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::extract::{normalize_iban, PartialFields};
use crate::record::Amount;

static RE_PLAIN_AMOUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?P<sign>[-+])?(?P<int>\d+)(?:[.,](?P<dec>\d{1,2}))?$").unwrap());

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%d-%m-%Y"];

/// Parses the file name. Returns `None` unless it has at least the
/// `IBAN_AMOUNT_DATE` segments and one of them is recognised.
pub fn parse_filename(filename: &str) -> Option<PartialFields> {
    let name = Path::new(filename).file_name()?.to_str()?;
    let stem = match name.rsplit_once('.') {
        Some((stem, _ext)) if !stem.is_empty() => stem,
        _ => name,
    };

    let parts: Vec<&str> = stem.split('_').collect();
    if parts.len() < 3 {
        return None;
    }

    let remark = parts[3..]
        .iter()
        .filter(|p| !p.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ");

    let fields = PartialFields {
        iban: normalize_iban(parts[0]),
        amount: parse_plain_amount(parts[1]),
        date: parse_date(parts[2]),
        remark: (!remark.is_empty()).then_some(remark),
        ..Default::default()
    };

    let recognised = fields.iban.is_some() || fields.amount.is_some() || fields.date.is_some();
    recognised.then_some(fields)
}

/// `1234.56`, `1234,56`, `-50`.
pub(crate) fn parse_plain_amount(s: &str) -> Option<Amount> {
    let caps = RE_PLAIN_AMOUNT.captures(s)?;
    let units: i64 = caps["int"].parse().ok()?;
    let dec = match caps.name("dec").map(|m| m.as_str()) {
        Some(d) if d.len() == 1 => d.parse::<i64>().ok()? * 10,
        Some(d) => d.parse::<i64>().ok()?,
        None => 0,
    };
    let cents = units.checked_mul(100)?.checked_add(dec)?;

    let negative = caps.name("sign").map(|m| m.as_str()) == Some("-");
    Some(Amount::from_cents(if negative { -cents } else { cents }))
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    if s.len() == 8 && s.bytes().all(|b| b.is_ascii_digit()) {
        return NaiveDate::from_ymd_opt(s[..4].parse().ok()?, s[4..6].parse().ok()?, s[6..].parse().ok()?);
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}
