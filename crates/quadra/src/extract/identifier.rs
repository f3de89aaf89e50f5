use std::sync::LazyLock;

use regex::Regex;

use super::{FieldStrategy, PartialFields};

static RE_IBAN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b[a-z]{2}\d{2}(?:\s?[a-z0-9]{4}){2,7}(?:\s?[a-z0-9]{1,4})?\b").unwrap()
});
static RE_PLATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([A-Z]{2})\s?(\d{3})\s?([A-Z]{2})\b").unwrap());

const IBAN_MIN_LEN: usize = 15;
const IBAN_MAX_LEN: usize = 34;

/// Upper-cases and strips whitespace. Returns `None` when the result is not
/// IBAN-shaped.
pub fn normalize_iban(raw: &str) -> Option<String> {
    let compact: String = raw
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| c.to_ascii_uppercase())
        .collect();

    let shaped = (IBAN_MIN_LEN..=IBAN_MAX_LEN).contains(&compact.len())
        && compact.chars().all(|c| c.is_ascii_alphanumeric())
        && compact[..2].chars().all(|c| c.is_ascii_alphabetic())
        && compact[2..4].chars().all(|c| c.is_ascii_digit());
    shaped.then_some(compact)
}

pub struct Iban;

impl FieldStrategy for Iban {
    fn name(&self) -> &'static str {
        "iban"
    }

    fn apply(&self, text: &str) -> PartialFields {
        PartialFields {
            iban: RE_IBAN
                .find_iter(text)
                .find_map(|m| normalize_iban(m.as_str())),
            ..Default::default()
        }
    }
}

/// Italian plate `AA000AA`, optionally spaced.
pub struct Plate;

impl FieldStrategy for Plate {
    fn name(&self) -> &'static str {
        "plate"
    }

    fn apply(&self, text: &str) -> PartialFields {
        PartialFields {
            plate: RE_PLATE
                .captures(text)
                .map(|caps| format!("{}{}{}", &caps[1], &caps[2], &caps[3])),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iban_spaced_and_lowercase() {
        let text = "IBAN: it60 x054 2811 1010 0000 0123 456 - BIC BPMOIT22";
        assert_eq!(
            Iban.apply(text).iban.as_deref(),
            Some("IT60X0542811101000000123456")
        );
    }

    #[test]
    fn test_iban_compact() {
        assert_eq!(
            Iban.apply("accredito su DE89370400440532013000").iban.as_deref(),
            Some("DE89370400440532013000")
        );
    }

    #[test]
    fn test_short_token_is_not_iban() {
        assert_eq!(Iban.apply("ab12 test").iban, None);
    }

    #[test]
    fn test_normalize_iban() {
        assert_eq!(normalize_iban("gb82 west 1234 5698 7654 32").as_deref(), Some("GB82WEST12345698765432"));
        assert_eq!(normalize_iban("1234"), None);
    }

    #[test]
    fn test_plate() {
        assert_eq!(Plate.apply("veicolo targato AB 123 CD").plate.as_deref(), Some("AB123CD"));
        assert_eq!(Plate.apply("targa FG456HI").plate.as_deref(), Some("FG456HI"));
        assert_eq!(Plate.apply("nessuna targa").plate, None);
    }
}
