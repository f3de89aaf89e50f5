use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use super::{FieldStrategy, PartialFields};

static RE_DAY_FIRST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{1,2})[/.-](\d{1,2})[/.-](\d{4})\b").unwrap());
static RE_ISO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{4})-(\d{2})-(\d{2})\b").unwrap());

/// `DD/MM/YYYY` (also with `.` or `-`). Impossible dates fall through to the
/// next occurrence.
pub struct DayFirstDate;

impl FieldStrategy for DayFirstDate {
    fn name(&self) -> &'static str {
        "day_first_date"
    }

    fn apply(&self, text: &str) -> PartialFields {
        let date = RE_DAY_FIRST
            .captures_iter(text)
            .find_map(|caps| to_date(&caps[3], &caps[2], &caps[1]));

        PartialFields {
            date,
            ..Default::default()
        }
    }
}

/// `YYYY-MM-DD`.
pub struct IsoDate;

impl FieldStrategy for IsoDate {
    fn name(&self) -> &'static str {
        "iso_date"
    }

    fn apply(&self, text: &str) -> PartialFields {
        let date = RE_ISO
            .captures_iter(text)
            .find_map(|caps| to_date(&caps[1], &caps[2], &caps[3]));

        PartialFields {
            date,
            ..Default::default()
        }
    }
}

fn to_date(year: &str, month: &str, day: &str) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, day.parse().ok()?)
}
