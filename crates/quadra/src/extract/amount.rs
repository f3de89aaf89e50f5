use std::sync::LazyLock;

use regex::{Match, Regex};
use serde::{Deserialize, Serialize};

use super::{FieldStrategy, PartialFields};
use crate::record::Amount;

/// Currency-shaped token: optional sign, optional EUR/€ marker, grouped
/// thousands and exactly two decimals.
static RE_AMOUNT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?P<sign>[-+])?\s?(?:€|EUR)?\s?(?P<sign2>[-+])?(?P<int>\d{1,3}(?:[.,']\d{3})+|\d+)[.,](?P<dec>\d{2})\b",
    )
    .unwrap()
});

static RE_AMOUNT_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:importo|totale|da\s+pagare)\b").unwrap());

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AmountStyle {
    /// `1.234,56`
    #[default]
    Italian,
    /// `1,234.56`
    International,
}

/// Parses the first valid amount token in `input`.
pub fn parse_amount(input: &str) -> Option<Amount> {
    find_amounts(input).next()
}

pub fn format_amount(amount: Amount, style: AmountStyle) -> String {
    let (group, decimal) = match style {
        AmountStyle::Italian => ('.', ','),
        AmountStyle::International => (',', '.'),
    };

    let abs = amount.cents().unsigned_abs();
    let digits = (abs / 100).to_string();
    let mut int = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            int.push(group);
        }
        int.push(c);
    }

    let sign = if amount.is_negative() { "-" } else { "" };
    format!("{}{}{}{:02}", sign, int, decimal, abs % 100)
}

/// All valid amount tokens in document order.
fn find_amounts(text: &str) -> impl Iterator<Item = Amount> + '_ {
    RE_AMOUNT.captures_iter(text).filter_map(move |caps| {
        let whole = caps.get(0)?;
        if glued_to_number(text, &whole) {
            return None;
        }

        let int: String = caps["int"].chars().filter(|c| c.is_ascii_digit()).collect();
        let units: i64 = int.parse().ok()?;
        let dec: i64 = caps["dec"].parse().ok()?;
        let cents = units.checked_mul(100)?.checked_add(dec)?;

        let negative = caps.name("sign").map(|m| m.as_str()) == Some("-")
            || caps.name("sign2").map(|m| m.as_str()) == Some("-");
        Some(Amount::from_cents(if negative { -cents } else { cents }))
    })
}

/// Rejects tokens that are a slice of a longer number, such as `10.03` inside
/// the date `10.03.2024`.
fn glued_to_number(text: &str, m: &Match<'_>) -> bool {
    let before = text[..m.start()].chars().next_back();
    if before.is_some_and(|c| c.is_ascii_digit() || c == '.' || c == ',' || c == '/') {
        return true;
    }

    let mut after = text[m.end()..].chars();
    match (after.next(), after.next()) {
        (Some('.' | ',' | '/'), Some(d)) => d.is_ascii_digit(),
        _ => false,
    }
}

/// First amount following an `importo` / `totale` / `da pagare` label on the
/// same line.
pub struct LabelledAmount;

impl FieldStrategy for LabelledAmount {
    fn name(&self) -> &'static str {
        "labelled_amount"
    }

    fn apply(&self, text: &str) -> PartialFields {
        let amount = text.lines().find_map(|line| {
            let label = RE_AMOUNT_LABEL.find(line)?;
            find_amounts(&line[label.end()..]).next()
        });

        PartialFields {
            amount,
            ..Default::default()
        }
    }
}

/// First free-standing amount anywhere in the text.
pub struct FreeAmount;

impl FieldStrategy for FreeAmount {
    fn name(&self) -> &'static str {
        "free_amount"
    }

    fn apply(&self, text: &str) -> PartialFields {
        PartialFields {
            amount: find_amounts(text).next(),
            ..Default::default()
        }
    }
}
